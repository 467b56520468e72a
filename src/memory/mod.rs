//! Raw heap access
//!
//! This is the only part of the crate that reads memory it does not own:
//! - Allocation zones report live blocks and keep them readable per visit
//! - The object validator turns blocks into typed candidates
//! - The scan guard keeps the scanner's own allocations out of its results

pub mod guard;
pub mod validator;
pub mod zones;

pub use guard::{is_scanning, ScanGuard};
pub use validator::{HeaderLayout, ObjectCandidate, ObjectValidator};
pub use zones::{
    AllocationEnumerator, AllocationSource, BlockVisitor, EnumerationStats, HeapBlock, LiveBlock,
    TrackingAllocator, TrackingStats, Zone,
};
#[cfg(windows)]
pub use zones::ProcessHeaps;
