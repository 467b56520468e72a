//! Handles returned by queries

use super::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one dynamic type: the address of its descriptor
///
/// Object headers store this same value, which is what lets the validator
/// resolve a candidate's type by plain lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeHandle(Address);

impl TypeHandle {
    /// Creates a handle from a descriptor address
    pub const fn from_address(address: Address) -> Self {
        TypeHandle(address)
    }

    /// Creates a handle from a raw header word
    pub const fn from_word(word: usize) -> Self {
        TypeHandle(Address::new(word))
    }

    /// Descriptor address
    pub const fn address(&self) -> Address {
        self.0
    }

    /// Raw word as it appears in an object header
    pub const fn as_word(&self) -> usize {
        self.0.as_usize()
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type@{}", self.0)
    }
}

/// A live object found on the heap
///
/// Plain data: holding a handle does not keep the object alive. The object
/// may be destroyed right after the scan if nothing else owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle {
    /// Start of the object's allocation
    pub address: Address,
    /// Dynamic type confirmed at capture time
    pub type_handle: TypeHandle,
    /// The type belongs to the hazard set
    pub hazardous: bool,
}

impl ObjectHandle {
    /// Creates a new object handle
    pub const fn new(address: Address, type_handle: TypeHandle, hazardous: bool) -> Self {
        ObjectHandle {
            address,
            type_handle,
            hazardous,
        }
    }

    /// Returns the object address as a typed pointer
    ///
    /// Dereferencing is only sound while the object is still alive and
    /// really has layout `T`.
    pub const fn as_ptr<T>(&self) -> *const T {
        self.address.as_ptr()
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.type_handle, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_handle_word_roundtrip() {
        let handle = TypeHandle::from_word(0x7f00_1000);
        assert_eq!(handle.as_word(), 0x7f00_1000);
        assert_eq!(handle.address(), Address::new(0x7f00_1000));
        assert_eq!(TypeHandle::from_address(Address::new(0x7f00_1000)), handle);
    }

    #[test]
    fn test_object_handle_display() {
        let object = ObjectHandle::new(
            Address::new(0x2000),
            TypeHandle::from_word(0x1000),
            false,
        );
        assert_eq!(
            object.to_string(),
            "<type@0x0000000000001000: 0x0000000000002000>"
        );
        assert_eq!(object.as_ptr::<u8>() as usize, 0x2000);
    }
}
