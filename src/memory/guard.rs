//! Per-thread scan guard
//!
//! While a thread holds a [`ScanGuard`], every block it allocates through
//! [`TrackingAllocator`] is tagged as scanner-owned and skipped by zone
//! walks. Result vectors and snapshots built during a scan can therefore
//! never be matched against the query that produced them.
//!
//! [`TrackingAllocator`]: crate::memory::zones::TrackingAllocator

use crate::core::types::{BeagleError, BeagleResult};
use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    // Const-initialised and drop-free: reading it from inside the global
    // allocator never allocates.
    static SCANNING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a heap scan
pub fn is_scanning() -> bool {
    SCANNING.try_with(Cell::get).unwrap_or(false)
}

/// Proof that the current thread is running a scan
#[derive(Debug)]
pub struct ScanGuard {
    // Bound to the thread whose flag it set
    _not_send: PhantomData<*const ()>,
}

impl ScanGuard {
    /// Mark the current thread as scanning
    ///
    /// Fails if a scan is already running on this thread.
    pub fn enter() -> BeagleResult<Self> {
        if SCANNING.with(|flag| flag.replace(true)) {
            return Err(BeagleError::ReentrantScan);
        }
        Ok(ScanGuard {
            _not_send: PhantomData,
        })
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        SCANNING.with(|flag| flag.set(false));
    }
}
