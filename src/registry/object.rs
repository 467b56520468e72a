//! Object header layout for runtimes built on [`TypeTable`]
//!
//! Every object starts with a two-word header: the type handle, then a seal
//! derived from it. The seal lets the validator tell a real header apart
//! from an arbitrary buffer that happens to hold a type handle as its first
//! word (a `Vec<TypeHandle>`, for instance).
//!
//! [`TypeTable`]: super::TypeTable

use crate::core::types::TypeHandle;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr;

/// Constant mixed into every header seal
pub const HEADER_SEAL: usize = 0x6265_6167;

/// Seal word expected after a given type word
pub const fn seal_for(type_word: usize) -> usize {
    type_word ^ HEADER_SEAL
}

/// Two-word object header
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    type_word: usize,
    seal: usize,
}

impl ObjectHeader {
    /// Header left behind by a dropped object; never validates
    pub const CLEARED: ObjectHeader = ObjectHeader {
        type_word: 0,
        seal: 0,
    };

    pub const fn new(ty: TypeHandle) -> Self {
        ObjectHeader {
            type_word: ty.as_word(),
            seal: seal_for(ty.as_word()),
        }
    }

    /// Dynamic type recorded in the header
    pub const fn type_handle(&self) -> TypeHandle {
        TypeHandle::from_word(self.type_word)
    }

    pub const fn is_sealed(&self) -> bool {
        self.seal == seal_for(self.type_word)
    }
}

/// A value prefixed with an [`ObjectHeader`]
///
/// Only reachable through [`TaggedBox`]: a tagged value always lives on the
/// heap and can never be moved out of its allocation with a valid header
/// still in place.
#[repr(C)]
pub struct Tagged<T> {
    header: ObjectHeader,
    value: T,
}

impl<T> Tagged<T> {
    const fn new(ty: TypeHandle, value: T) -> Self {
        Tagged {
            header: ObjectHeader::new(ty),
            value,
        }
    }

    /// Allocate a tagged value on the heap, where scans can find it
    pub fn boxed(ty: TypeHandle, value: T) -> TaggedBox<T> {
        TaggedBox(Box::new(Tagged::new(ty, value)))
    }

    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.header.type_handle()
    }

    fn clear_header(&mut self) {
        // Volatile: the store must survive even though the memory is
        // about to be freed
        unsafe { ptr::write_volatile(&mut self.header, ObjectHeader::CLEARED) }
    }
}

impl<T> Drop for Tagged<T> {
    fn drop(&mut self) {
        self.clear_header();
    }
}

impl<T> Deref for Tagged<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Tagged<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Tagged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tagged")
            .field("type", &self.header.type_handle())
            .field("value", &self.value)
            .finish()
    }
}

/// Owning handle to a heap-allocated [`Tagged`] value
///
/// Dereferencing borrows the object in place; it cannot be moved out.
/// Dropping the handle or calling [`TaggedBox::into_inner`] clears the
/// header before the allocation is released, so a freed and reused block
/// never keeps looking like a live object.
///
/// ```compile_fail
/// use heap_beagle::{Tagged, TypeHandle};
///
/// let boxed = Tagged::boxed(TypeHandle::from_word(0x1000), 7u32);
/// let moved = *boxed;
/// ```
pub struct TaggedBox<T>(Box<Tagged<T>>);

impl<T> TaggedBox<T> {
    /// Take the value back, clearing the header first
    pub fn into_inner(self) -> T {
        let mut object = self.0;
        object.clear_header();
        let this = ManuallyDrop::new(*object);
        // SAFETY: `this` is never dropped, so `value` is moved out once
        unsafe { ptr::read(&this.value) }
    }
}

impl<T> Deref for TaggedBox<T> {
    type Target = Tagged<T>;

    fn deref(&self) -> &Tagged<T> {
        &self.0
    }
}

impl<T> DerefMut for TaggedBox<T> {
    fn deref_mut(&mut self) -> &mut Tagged<T> {
        &mut self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for TaggedBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
