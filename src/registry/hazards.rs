//! Types whose instances may be identified but not safely inspected

use super::TypeRegistry;
use crate::core::types::TypeHandle;
use tracing::debug;

/// Fixed set of hazardous placeholder or singleton types
///
/// Built once at startup and handed to the validator, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HazardSet {
    types: Box<[TypeHandle]>,
}

impl HazardSet {
    pub fn new(types: impl IntoIterator<Item = TypeHandle>) -> Self {
        let mut types: Vec<TypeHandle> = types.into_iter().collect();
        types.sort_unstable();
        types.dedup();
        HazardSet {
            types: types.into_boxed_slice(),
        }
    }

    /// Empty hazard set
    pub fn none() -> Self {
        HazardSet::default()
    }

    /// Resolve hazard type names through the registry
    ///
    /// Names that are not registered are skipped.
    pub fn from_names<S: AsRef<str>>(registry: &dyn TypeRegistry, names: &[S]) -> Self {
        let resolved = names.iter().filter_map(|name| {
            let name = name.as_ref();
            let handle = registry.resolve(name);
            if handle.is_none() {
                debug!(type_name = name, "hazard type not registered, skipping");
            }
            handle
        });
        HazardSet::new(resolved)
    }

    pub fn contains(&self, ty: TypeHandle) -> bool {
        self.types.binary_search(&ty).is_ok()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
