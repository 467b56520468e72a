//! Per-query snapshot of the live type graph

use super::TypeRegistry;
use crate::core::types::TypeHandle;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    ancestor: Option<TypeHandle>,
    instance_size: usize,
}

/// Immutable view of the registry taken once per query
///
/// Lookups are plain hash map reads: no locks, no calls back into the
/// registry. That is what makes it safe to consult while a heap block is
/// pinned.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    entries: HashMap<TypeHandle, TypeEntry>,
    order: Vec<TypeHandle>,
}

impl TypeGraph {
    /// Capture the registry's live types
    pub fn snapshot(registry: &dyn TypeRegistry) -> Self {
        let live = registry.live_types();
        let mut entries = HashMap::with_capacity(live.len());
        let mut order = Vec::with_capacity(live.len());

        for ty in live {
            if entries.contains_key(&ty) {
                continue;
            }
            // Unloaded between live_types() and name_of()
            let Some(name) = registry.name_of(ty) else {
                continue;
            };
            entries.insert(
                ty,
                TypeEntry {
                    name,
                    ancestor: registry.ancestor(ty),
                    instance_size: registry.instance_size(ty).unwrap_or(0),
                },
            );
            order.push(ty);
        }

        TypeGraph { entries, order }
    }

    /// Resolve a raw header word to a live type
    pub fn lookup(&self, word: usize) -> Option<TypeHandle> {
        let ty = TypeHandle::from_word(word);
        self.entries.contains_key(&ty).then_some(ty)
    }

    /// Whether `ty` was live when the snapshot was taken
    pub fn contains(&self, ty: TypeHandle) -> bool {
        self.entries.contains_key(&ty)
    }

    /// Direct ancestor of `ty`
    pub fn ancestor(&self, ty: TypeHandle) -> Option<TypeHandle> {
        self.entries.get(&ty).and_then(|entry| entry.ancestor)
    }

    /// Ancestor chain of `ty`, nearest first, `ty` itself excluded
    pub fn ancestors(&self, ty: TypeHandle) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.ancestor(ty),
            remaining: self.order.len(),
        }
    }

    /// Name of `ty`
    pub fn name(&self, ty: TypeHandle) -> Option<&str> {
        self.entries.get(&ty).map(|entry| entry.name.as_str())
    }

    /// Minimum instance size of `ty`, 0 when unknown
    pub fn instance_size(&self, ty: TypeHandle) -> usize {
        self.entries
            .get(&ty)
            .map(|entry| entry.instance_size)
            .unwrap_or(0)
    }

    /// Live types in registry order
    pub fn types(&self) -> impl Iterator<Item = TypeHandle> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Iterator over an ancestor chain
///
/// Yields at most as many steps as there are live types, so it terminates
/// even if a broken registry reports a cycle.
pub struct Ancestors<'g> {
    graph: &'g TypeGraph,
    next: Option<TypeHandle>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = TypeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.graph.ancestor(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeTable;

    /// Registry that reports a two-type cycle
    struct CyclicRegistry;

    const A: TypeHandle = TypeHandle::from_word(0x1000);
    const B: TypeHandle = TypeHandle::from_word(0x2000);

    impl TypeRegistry for CyclicRegistry {
        fn resolve(&self, _name: &str) -> Option<TypeHandle> {
            None
        }

        fn live_types(&self) -> Vec<TypeHandle> {
            vec![A, B, A]
        }

        fn ancestor(&self, ty: TypeHandle) -> Option<TypeHandle> {
            Some(if ty == A { B } else { A })
        }

        fn name_of(&self, ty: TypeHandle) -> Option<String> {
            Some(if ty == A { "A" } else { "B" }.to_string())
        }
    }

    #[test]
    fn test_snapshot_captures_table() {
        let table = TypeTable::new();
        let animal = table.register("Animal", None, 16).unwrap();
        let dog = table.register("Dog", Some(animal), 24).unwrap();

        let graph = TypeGraph::snapshot(&table);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.name(dog), Some("Dog"));
        assert_eq!(graph.ancestor(dog), Some(animal));
        assert_eq!(graph.ancestor(animal), None);
        assert_eq!(graph.instance_size(dog), 24);
        assert_eq!(graph.types().collect::<Vec<_>>(), vec![animal, dog]);
    }

    #[test]
    fn test_lookup_only_accepts_live_words() {
        let table = TypeTable::new();
        let animal = table.register("Animal", None, 16).unwrap();
        let graph = TypeGraph::snapshot(&table);

        assert_eq!(graph.lookup(animal.as_word()), Some(animal));
        assert_eq!(graph.lookup(animal.as_word() + 8), None);
        assert_eq!(graph.lookup(0), None);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let table = TypeTable::new();
        let a = table.register("A", None, 16).unwrap();
        let b = table.register("B", Some(a), 16).unwrap();
        let c = table.register("C", Some(b), 16).unwrap();

        let graph = TypeGraph::snapshot(&table);
        assert_eq!(graph.ancestors(c).collect::<Vec<_>>(), vec![b, a]);
        assert!(graph.ancestors(a).next().is_none());
    }

    #[test]
    fn test_ancestors_terminate_on_cycle() {
        let graph = TypeGraph::snapshot(&CyclicRegistry);
        // Duplicate handles are collapsed
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.ancestors(A).count(), 2);
    }
}
