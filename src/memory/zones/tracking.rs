//! Tracking global allocator
//!
//! [`TrackingAllocator`] wraps another [`GlobalAlloc`] (the system
//! allocator by default) and records every live block in a fixed set of
//! zones. Each zone starts as a zero-initialised, open-addressed table of
//! atomic slots, so recording a block never takes a lock. When a block finds
//! no free slot in its probe window, the zone grows by chaining an overflow
//! shard allocated straight from the inner allocator.
//!
//! A scanner pins a slot for exactly one inspection step. `dealloc` pins the
//! slot before releasing the block, so memory a scanner is reading can
//! never be returned to the inner allocator underneath it.

use super::{AllocationSource, BlockVisitor, HeapBlock, LiveBlock, Zone};
use crate::core::types::{Address, BeagleResult};
use crate::memory::guard::is_scanning;
use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::spin_loop;
use std::ops::ControlFlow;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, AtomicUsize, Ordering};

/// Number of zones a tracking allocator spreads blocks over
pub const ZONE_COUNT: usize = 1 << ZONE_BITS;
/// Slot capacity of one shard; a zone chains as many shards as it needs
pub const SLOTS_PER_ZONE: usize = 1 << SLOT_BITS;

const ZONE_BITS: u32 = 3;
const SLOT_BITS: u32 = 14;
const SLOT_MASK: usize = SLOTS_PER_ZONE - 1;
const MAX_PROBE: usize = 64;

// Pin backoff: spin briefly, then yield so a descheduled holder can finish.
const PIN_SPINS: u32 = 64;
const PIN_ATTEMPTS: u32 = 4096;

const EMPTY: usize = 0;
const TOMBSTONE: usize = usize::MAX;

const PINNED: u8 = 1 << 0;
const SCANNER_OWNED: u8 = 1 << 1;

struct Slot {
    address: AtomicUsize,
    size: AtomicUsize,
    state: AtomicU8,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: Slot = Slot {
    address: AtomicUsize::new(EMPTY),
    size: AtomicUsize::new(0),
    state: AtomicU8::new(0),
};

impl Slot {
    fn try_pin(&self) -> bool {
        let state = self.state.load(Ordering::Relaxed);
        state & PINNED == 0
            && self
                .state
                .compare_exchange_weak(state, state | PINNED, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    /// Pin with bounded retries; `None` means the slot stayed busy
    fn pin_bounded(&self) -> Option<SlotPin<'_>> {
        for attempt in 0..PIN_ATTEMPTS {
            if self.try_pin() {
                return Some(SlotPin { slot: self });
            }
            backoff(attempt);
        }
        None
    }

    /// Pin, waiting as long as a scanner holds the slot
    fn pin_blocking(&self) -> SlotPin<'_> {
        let mut attempt = 0u32;
        while !self.try_pin() {
            backoff(attempt);
            attempt = attempt.saturating_add(1);
        }
        SlotPin { slot: self }
    }
}

fn backoff(attempt: u32) {
    if attempt < PIN_SPINS {
        spin_loop();
    } else {
        std::thread::yield_now();
    }
}

struct SlotPin<'a> {
    slot: &'a Slot,
}

impl Drop for SlotPin<'_> {
    fn drop(&mut self) {
        self.slot.state.fetch_and(!PINNED, Ordering::Release);
    }
}

// All-zero is a valid empty shard; overflow shards rely on it.
struct ZoneShard {
    slots: [Slot; SLOTS_PER_ZONE],
    live: AtomicUsize,
    overflow: AtomicPtr<ZoneShard>,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SHARD: ZoneShard = ZoneShard {
    slots: [EMPTY_SLOT; SLOTS_PER_ZONE],
    live: AtomicUsize::new(0),
    overflow: AtomicPtr::new(ptr::null_mut()),
};

impl ZoneShard {
    fn next(&self) -> Option<&ZoneShard> {
        // SAFETY: overflow shards are published once and never released
        unsafe { self.overflow.load(Ordering::Acquire).as_ref() }
    }

    /// This shard followed by its overflow chain
    fn chain(&self) -> impl Iterator<Item = &ZoneShard> {
        std::iter::successors(Some(self), |shard| shard.next())
    }

    fn insert(&self, start: usize, address: usize, size: usize, owned: bool) -> bool {
        for probe in 0..MAX_PROBE {
            let slot = &self.slots[(start + probe) & SLOT_MASK];
            let current = slot.address.load(Ordering::Relaxed);
            if current != EMPTY && current != TOMBSTONE {
                continue;
            }
            if slot
                .address
                .compare_exchange(current, address, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                continue;
            }
            // The owned bit must be visible before a non-zero size is.
            if owned {
                slot.state.fetch_or(SCANNER_OWNED, Ordering::Release);
            }
            slot.size.store(size, Ordering::Release);
            self.live.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn remove(&self, start: usize, address: usize) -> bool {
        for probe in 0..MAX_PROBE {
            let slot = &self.slots[(start + probe) & SLOT_MASK];
            let current = slot.address.load(Ordering::Acquire);
            if current == EMPTY {
                return false;
            }
            if current != address {
                continue;
            }
            let _pin = slot.pin_blocking();
            slot.state.fetch_and(!SCANNER_OWNED, Ordering::Relaxed);
            slot.size.store(0, Ordering::Release);
            slot.address.store(TOMBSTONE, Ordering::Release);
            self.live.fetch_sub(1, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn contains(&self, start: usize, address: usize) -> bool {
        for probe in 0..MAX_PROBE {
            let slot = &self.slots[(start + probe) & SLOT_MASK];
            match slot.address.load(Ordering::Acquire) {
                EMPTY => return false,
                current if current == address => {
                    return slot.size.load(Ordering::Acquire) != 0;
                }
                _ => {}
            }
        }
        false
    }

    fn walk(&self, visitor: &mut BlockVisitor<'_>) -> ControlFlow<()> {
        for slot in self.slots.iter() {
            let address = slot.address.load(Ordering::Acquire);
            if address == EMPTY || address == TOMBSTONE {
                continue;
            }
            if slot.state.load(Ordering::Relaxed) & SCANNER_OWNED != 0 {
                continue;
            }
            let Some(_pin) = slot.pin_bounded() else {
                continue;
            };

            // Re-read under the pin: the slot may have been recycled
            let address = slot.address.load(Ordering::Acquire);
            if address == EMPTY || address == TOMBSTONE {
                continue;
            }
            let size = slot.size.load(Ordering::Acquire);
            if size == 0 || slot.state.load(Ordering::Acquire) & SCANNER_OWNED != 0 {
                continue;
            }

            // SAFETY: while pinned, dealloc of this block waits for us, so
            // the allocation stays live until `_pin` drops after the visit.
            let block = unsafe { LiveBlock::new(HeapBlock::new(Address::new(address), size)) };
            if visitor(block).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

/// Zone and starting slot for an address
fn locate(address: usize) -> (usize, usize) {
    let hash = (address >> 3).wrapping_mul(0x9E37_79B9_7F4A_7C15_u64 as usize);
    let top = hash >> (usize::BITS - ZONE_BITS - SLOT_BITS);
    (top >> SLOT_BITS, top & SLOT_MASK)
}

/// Block counts across all zones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingStats {
    /// Blocks currently recorded
    pub live_blocks: usize,
    /// Blocks the allocator could not record; invisible to scans
    pub untracked_blocks: usize,
    /// Shards added beyond the static tables
    pub overflow_shards: usize,
}

/// Global allocator wrapper that keeps enumerable live-block tables
///
/// Install it once per binary and pass it to the scanner as its
/// [`AllocationSource`]:
///
/// ```ignore
/// #[global_allocator]
/// static ALLOCATOR: TrackingAllocator = TrackingAllocator::new();
/// ```
///
/// The first shard of every zone lives inline and overflow shards are never
/// released, so only ever place this in a `static`.
pub struct TrackingAllocator<A = System> {
    inner: A,
    zones: [ZoneShard; ZONE_COUNT],
    overflow_shards: AtomicUsize,
    untracked: AtomicUsize,
}

impl TrackingAllocator<System> {
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        TrackingAllocator::with_allocator(System)
    }
}

impl<A> TrackingAllocator<A> {
    /// Track blocks handed out by `inner`
    pub const fn with_allocator(inner: A) -> Self {
        TrackingAllocator {
            inner,
            zones: [EMPTY_SHARD; ZONE_COUNT],
            overflow_shards: AtomicUsize::new(0),
            untracked: AtomicUsize::new(0),
        }
    }

    fn forget(&self, ptr: *mut u8) {
        let address = ptr as usize;
        let (zone, start) = locate(address);
        for shard in self.zones[zone].chain() {
            if shard.remove(start, address) {
                return;
            }
        }
    }

    /// Whether `address` is the start of a block currently recorded
    pub fn is_tracked(&self, address: Address) -> bool {
        let (zone, start) = locate(address.as_usize());
        self.zones[zone]
            .chain()
            .any(|shard| shard.contains(start, address.as_usize()))
    }

    pub fn stats(&self) -> TrackingStats {
        let live_blocks = self
            .zones
            .iter()
            .flat_map(|zone| zone.chain())
            .map(|shard| shard.live.load(Ordering::Relaxed))
            .sum();
        TrackingStats {
            live_blocks,
            untracked_blocks: self.untracked.load(Ordering::Relaxed),
            overflow_shards: self.overflow_shards.load(Ordering::Relaxed),
        }
    }
}

impl<A: GlobalAlloc> TrackingAllocator<A> {
    fn record(&self, ptr: *mut u8, size: usize) {
        if ptr.is_null() {
            return;
        }
        let address = ptr as usize;
        let owned = is_scanning();
        let (zone, start) = locate(address);

        let mut shard = &self.zones[zone];
        loop {
            if shard.insert(start, address, size, owned) {
                return;
            }
            match self.grow(shard) {
                Some(next) => shard = next,
                None => {
                    self.untracked.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            }
        }
    }

    /// The shard chained after `shard`, allocating it on first use
    ///
    /// `None` only when the inner allocator is out of memory.
    fn grow<'s>(&'s self, shard: &'s ZoneShard) -> Option<&'s ZoneShard> {
        if let Some(next) = shard.next() {
            return Some(next);
        }

        let layout = Layout::new::<ZoneShard>();
        // SAFETY: ZoneShard has a non-zero size, and all-zero is an empty shard.
        let fresh = unsafe { self.inner.alloc_zeroed(layout) } as *mut ZoneShard;
        if fresh.is_null() {
            return None;
        }

        match shard.overflow.compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.overflow_shards.fetch_add(1, Ordering::Relaxed);
                // SAFETY: just published, never released
                unsafe { fresh.as_ref() }
            }
            Err(winner) => {
                // Another thread grew the zone first
                unsafe {
                    self.inner.dealloc(fresh as *mut u8, layout);
                    winner.as_ref()
                }
            }
        }
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        self.record(ptr, layout.size());
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        self.record(ptr, layout.size());
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.forget(ptr);
        self.inner.dealloc(ptr, layout);
    }
}

/// One zone of a tracking allocator
struct TrackedZone<'a> {
    index: usize,
    shard: &'a ZoneShard,
}

impl Zone for TrackedZone<'_> {
    fn name(&self) -> String {
        format!("tracking-{}", self.index)
    }

    fn walk(&self, visitor: &mut BlockVisitor<'_>) -> BeagleResult<ControlFlow<()>> {
        for shard in self.shard.chain() {
            if shard.walk(visitor).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

impl<A: Send + Sync> AllocationSource for TrackingAllocator<A> {
    fn zones(&self) -> Vec<Box<dyn Zone + '_>> {
        self.zones
            .iter()
            .enumerate()
            .map(|(index, shard)| Box::new(TrackedZone { index, shard }) as Box<dyn Zone + '_>)
            .collect()
    }

    fn untracked_blocks(&self) -> usize {
        self.untracked.load(Ordering::Relaxed)
    }
}
