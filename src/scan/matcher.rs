//! Class membership tests over a type graph snapshot

use crate::core::types::{FindOptions, TypeHandle};
use crate::registry::TypeGraph;

/// How a candidate's type must relate to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Same type only
    Exact,
    /// The target or any of its descendants
    Inclusive,
}

/// Target type plus match mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassQuery {
    pub target: TypeHandle,
    pub mode: MatchMode,
}

impl ClassQuery {
    pub fn exact(target: TypeHandle) -> Self {
        ClassQuery {
            target,
            mode: MatchMode::Exact,
        }
    }

    pub fn inclusive(target: TypeHandle) -> Self {
        ClassQuery {
            target,
            mode: MatchMode::Inclusive,
        }
    }

    /// Query implied by a set of find options
    pub fn from_options(target: TypeHandle, options: FindOptions) -> Self {
        if options.contains(FindOptions::EXCLUDE_SUBCLASSES) {
            ClassQuery::exact(target)
        } else {
            ClassQuery::inclusive(target)
        }
    }
}

/// Ancestor-chain matcher bound to one snapshot
pub struct ClassMatcher<'g> {
    graph: &'g TypeGraph,
}

impl<'g> ClassMatcher<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        ClassMatcher { graph }
    }

    /// Does `ty` satisfy `query`?
    pub fn matches(&self, ty: TypeHandle, query: &ClassQuery) -> bool {
        match query.mode {
            MatchMode::Exact => ty == query.target,
            MatchMode::Inclusive => ty == query.target || self.is_descendant(ty, query.target),
        }
    }

    /// `ancestor` appears somewhere in the ancestor chain of `ty`
    pub fn is_descendant(&self, ty: TypeHandle, ancestor: TypeHandle) -> bool {
        self.graph.ancestors(ty).any(|step| step == ancestor)
    }

    /// Every live type descending from `target`, in registry order
    pub fn subclasses(&self, target: TypeHandle) -> Vec<TypeHandle> {
        self.graph
            .types()
            .filter(|&ty| ty != target && self.is_descendant(ty, target))
            .collect()
    }
}
