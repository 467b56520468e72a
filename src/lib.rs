//! heap-beagle: find live heap instances by dynamic type
//!
//! Objects carry a type word in their header. Given a type, the scanner
//! walks every live allocation, keeps the blocks whose header names a
//! registered type, and returns those matching the query:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOCATOR: TrackingAllocator = TrackingAllocator::new();
//!
//! let table = TypeTable::new();
//! let animal = table.register_for::<Pet>("Animal", None)?;
//! let dog = table.register_for::<Pet>("Dog", Some(animal))?;
//! let rex = Tagged::boxed(dog, Pet::default());
//!
//! let beagle = Beagle::new(&table, &ALLOCATOR);
//! assert_eq!(beagle.instances_of(animal)?.len(), 1);
//! ```

pub mod config;
pub mod core;
pub mod logging;
pub mod memory;
pub mod registry;
pub mod scan;

// Re-export main types from core module
pub use crate::core::types::{
    Address, BeagleError, BeagleResult, CompareOptions, FindOptions, ObjectHandle, TypeHandle,
};

pub use memory::{AllocationSource, HeaderLayout, TrackingAllocator};
pub use registry::{HazardSet, Tagged, TaggedBox, TypeRegistry, TypeTable};
pub use scan::Beagle;

pub use crate::core::{AUTHORS, VERSION, WORD_SIZE};

// Unit tests scan the test binary's own heap
#[cfg(test)]
#[global_allocator]
pub(crate) static TEST_ALLOCATOR: TrackingAllocator = TrackingAllocator::new();
