//! Allocation zones and the live blocks they report
//!
//! A zone is one allocator table (a tracked shard, a native process heap)
//! that can report which blocks are currently allocated. Zones hand blocks
//! to a visitor one at a time as [`LiveBlock`]s, which stay valid only for
//! the duration of that visit.

pub mod enumerator;
#[cfg(windows)]
pub mod process_heaps;
pub mod tracking;

pub use enumerator::{AllocationEnumerator, EnumerationStats};
#[cfg(windows)]
pub use process_heaps::ProcessHeaps;
pub use tracking::{TrackingAllocator, TrackingStats, SLOTS_PER_ZONE, ZONE_COUNT};

use crate::core::types::{Address, BeagleResult, WORD_SIZE};
use std::marker::PhantomData;
use std::ops::ControlFlow;

/// One allocator-reported block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapBlock {
    pub address: Address,
    pub size: usize,
}

impl HeapBlock {
    pub const fn new(address: Address, size: usize) -> Self {
        HeapBlock { address, size }
    }

    /// End address (exclusive)
    pub fn end_address(&self) -> Address {
        Address::new(self.address.as_usize().saturating_add(self.size))
    }

    /// Check if an address is within this block
    pub fn contains(&self, address: Address) -> bool {
        address >= self.address && address < self.end_address()
    }
}

/// A block that is guaranteed allocated and readable for `'a`
///
/// Only zones create these, and only for the duration of one visitor call.
/// [`LiveBlock::read_word`] is the single raw read the scanner performs.
#[derive(Debug)]
pub struct LiveBlock<'a> {
    block: HeapBlock,
    _pinned: PhantomData<&'a ()>,
}

impl<'a> LiveBlock<'a> {
    /// Wrap a block for one visit
    ///
    /// # Safety
    /// The whole `block` range must stay allocated and readable for `'a`.
    pub unsafe fn new(block: HeapBlock) -> Self {
        LiveBlock {
            block,
            _pinned: PhantomData,
        }
    }

    pub fn block(&self) -> HeapBlock {
        self.block
    }

    pub fn address(&self) -> Address {
        self.block.address
    }

    pub fn size(&self) -> usize {
        self.block.size
    }

    /// Read one aligned machine word at `offset` bytes into the block
    ///
    /// Returns `None` when the word would fall outside the block or is not
    /// word aligned. The bytes are treated as an opaque integer; nothing is
    /// dereferenced through them.
    pub fn read_word(&self, offset: usize) -> Option<usize> {
        let end = offset.checked_add(WORD_SIZE)?;
        if end > self.block.size {
            return None;
        }
        let address = self.block.address.checked_add(offset)?;
        if !address.is_aligned(std::mem::align_of::<usize>()) {
            return None;
        }
        // SAFETY: the range lies inside a block the zone keeps readable for
        // 'a, and the address is aligned for usize.
        Some(unsafe { std::ptr::read_volatile(address.as_ptr::<usize>()) })
    }
}

/// Visitor handed to [`Zone::walk`]
pub type BlockVisitor<'v> = dyn for<'b> FnMut(LiveBlock<'b>) -> ControlFlow<()> + 'v;

/// One allocator table that can enumerate its live blocks
pub trait Zone {
    /// Human-readable zone name for diagnostics
    fn name(&self) -> String;

    /// Visit every live block in allocator order
    ///
    /// Returns `Err` when the zone cannot be walked at all (locked,
    /// corrupted); callers skip such zones. A `Break` from the visitor stops
    /// the walk and is passed back.
    fn walk(&self, visitor: &mut BlockVisitor<'_>) -> BeagleResult<ControlFlow<()>>;
}

/// Everything that exposes allocation zones
pub trait AllocationSource: Send + Sync {
    fn zones(&self) -> Vec<Box<dyn Zone + '_>>;

    /// Live blocks the source knows of but cannot enumerate
    ///
    /// Non-zero means a scan over this source may be incomplete.
    fn untracked_blocks(&self) -> usize {
        0
    }
}
