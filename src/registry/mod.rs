//! Runtime type information consumed by the scanner
//!
//! The scanner never owns type metadata. It is handed a [`TypeRegistry`]
//! by whatever embeds it, takes a [`TypeGraph`] snapshot at the start of
//! each query and only consults that snapshot while walking the heap.
//! [`TypeTable`] is a manually maintained registry for runtimes without
//! built-in reflection, paired with the [`Tagged`] object layout.

pub mod graph;
pub mod hazards;
pub mod object;
pub mod table;

pub use graph::{Ancestors, TypeGraph};
pub use hazards::HazardSet;
pub use object::{seal_for, ObjectHeader, Tagged, TaggedBox, HEADER_SEAL};
pub use table::{TypeDescriptor, TypeTable};

use crate::core::types::TypeHandle;

/// Introspection capability supplied by the host runtime
pub trait TypeRegistry: Send + Sync {
    /// Resolve a live type by its unique name
    fn resolve(&self, name: &str) -> Option<TypeHandle>;

    /// Every currently registered type, in a stable registry order
    fn live_types(&self) -> Vec<TypeHandle>;

    /// Direct ancestor of `ty`, `None` for root types
    fn ancestor(&self, ty: TypeHandle) -> Option<TypeHandle>;

    /// Name of `ty`, `None` when it is not registered
    fn name_of(&self, ty: TypeHandle) -> Option<String>;

    /// Minimum size in bytes of one instance of `ty`, when known
    fn instance_size(&self, _ty: TypeHandle) -> Option<usize> {
        None
    }

    /// Whether `ty` is currently registered
    fn is_live(&self, ty: TypeHandle) -> bool {
        self.name_of(ty).is_some()
    }
}
