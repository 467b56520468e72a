//! Core type definitions for heap-beagle
//!
//! Address wrappers, query handles, option sets and the error type shared by
//! every layer of the scanner.

mod address;
mod error;
mod handles;
mod options;

// Re-export all public types
pub use address::Address;
pub use error::{BeagleError, BeagleResult};
pub use handles::{ObjectHandle, TypeHandle};
pub use options::{CompareOptions, FindOptions};

/// Size of one machine word, the unit of object headers
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();
