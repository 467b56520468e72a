//! Core module containing the fundamental types of heap-beagle
//!
//! This module provides the building blocks used throughout the scanner:
//! addresses, type and object handles, option sets and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, BeagleError, BeagleResult, CompareOptions, FindOptions, ObjectHandle, TypeHandle,
    WORD_SIZE,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
