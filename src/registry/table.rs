//! Manually maintained type table
//!
//! For runtimes without built-in reflection: types are registered
//! explicitly and each gets a boxed [`TypeDescriptor`] whose address
//! becomes its [`TypeHandle`]. Objects laid out as [`Tagged`] carry that
//! handle in their header.
//!
//! [`Tagged`]: super::Tagged

use super::object::Tagged;
use super::TypeRegistry;
use crate::core::types::{Address, BeagleError, BeagleResult, TypeHandle};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Descriptor of one registered type
#[derive(Debug)]
pub struct TypeDescriptor {
    name: Box<str>,
    ancestor: Option<TypeHandle>,
    instance_size: usize,
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ancestor(&self) -> Option<TypeHandle> {
        self.ancestor
    }

    pub fn instance_size(&self) -> usize {
        self.instance_size
    }
}

#[derive(Default)]
struct TableInner {
    descriptors: IndexMap<TypeHandle, Box<TypeDescriptor>>,
    names: HashMap<Box<str>, TypeHandle>,
    // Unregistered descriptors stay allocated so their address is never
    // handed to a new type while stale objects may still claim it.
    retired: Vec<Box<TypeDescriptor>>,
}

/// Registry backed by an explicit table of descriptors
#[derive(Default)]
pub struct TypeTable {
    inner: RwLock<TableInner>,
}

impl TypeTable {
    /// Create an empty table
    pub fn new() -> Self {
        TypeTable::default()
    }

    /// Register a type under a unique name
    pub fn register(
        &self,
        name: &str,
        ancestor: Option<TypeHandle>,
        instance_size: usize,
    ) -> BeagleResult<TypeHandle> {
        let mut inner = self.inner.write();

        if inner.names.contains_key(name) {
            return Err(BeagleError::DuplicateType(name.to_string()));
        }
        if let Some(parent) = ancestor {
            if !inner.descriptors.contains_key(&parent) {
                return Err(BeagleError::UnknownType(parent.to_string()));
            }
        }

        let descriptor = Box::new(TypeDescriptor {
            name: name.into(),
            ancestor,
            instance_size,
        });
        let handle = TypeHandle::from_address(Address::from(
            &*descriptor as *const TypeDescriptor,
        ));

        inner.names.insert(name.into(), handle);
        inner.descriptors.insert(handle, descriptor);
        debug!(type_name = name, %handle, instance_size, "registered type");
        Ok(handle)
    }

    /// Register a type whose instances are `Tagged<T>`
    pub fn register_for<T>(
        &self,
        name: &str,
        ancestor: Option<TypeHandle>,
    ) -> BeagleResult<TypeHandle> {
        self.register(name, ancestor, std::mem::size_of::<Tagged<T>>())
    }

    /// Unload a type; returns whether it was registered
    ///
    /// Descendants keep their ancestor link, which now ends the chain.
    pub fn unregister(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(handle) = inner.names.remove(name) else {
            return false;
        };
        if let Some(descriptor) = inner.descriptors.shift_remove(&handle) {
            inner.retired.push(descriptor);
        }
        debug!(type_name = name, %handle, "unregistered type");
        true
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.inner.read().descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TypeRegistry for TypeTable {
    fn resolve(&self, name: &str) -> Option<TypeHandle> {
        self.inner.read().names.get(name).copied()
    }

    fn live_types(&self) -> Vec<TypeHandle> {
        self.inner.read().descriptors.keys().copied().collect()
    }

    fn ancestor(&self, ty: TypeHandle) -> Option<TypeHandle> {
        self.inner
            .read()
            .descriptors
            .get(&ty)
            .and_then(|descriptor| descriptor.ancestor)
    }

    fn name_of(&self, ty: TypeHandle) -> Option<String> {
        self.inner
            .read()
            .descriptors
            .get(&ty)
            .map(|descriptor| descriptor.name.to_string())
    }

    fn instance_size(&self, ty: TypeHandle) -> Option<usize> {
        self.inner
            .read()
            .descriptors
            .get(&ty)
            .map(|descriptor| descriptor.instance_size)
    }

    fn is_live(&self, ty: TypeHandle) -> bool {
        self.inner.read().descriptors.contains_key(&ty)
    }
}
