//! Native process heaps on Windows
//!
//! Each heap returned by `GetProcessHeaps` is one zone. A zone walk runs in
//! two phases:
//!
//! 1. Under the heap lock, `HeapWalk` copies the busy entries into a buffer
//!    reserved before the lock was taken. Nothing is read from the blocks and
//!    nothing is allocated while the walk cursor is live.
//! 2. Each recorded block is then inspected under its own short lock:
//!    `HeapValidate` confirms it is still allocated, `HeapSize` refreshes its
//!    size and `VirtualQuery` confirms the range is readable before the
//!    visitor sees it.
//!
//! Blocks the scanner allocates during phase 2 were never recorded, so they
//! are never visited. Heaps that refuse the lock are reported as unavailable
//! and skipped by the enumerator.

use super::{AllocationSource, BlockVisitor, HeapBlock, LiveBlock, Zone};
use crate::core::types::{Address, BeagleError, BeagleResult};
use std::ops::ControlFlow;
use tracing::debug;
use winapi::um::heapapi::{
    GetProcessHeaps, HeapLock, HeapSize, HeapUnlock, HeapValidate, HeapWalk,
};
use winapi::um::memoryapi::VirtualQuery;
use winapi::um::minwinbase::{PROCESS_HEAP_ENTRY, PROCESS_HEAP_ENTRY_BUSY};
use winapi::um::winnt::{HANDLE, MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_GUARD, PAGE_NOACCESS};

// Entry buffer sizing for phase 1
const INITIAL_ENTRIES: usize = 1024;
const COLLECT_ATTEMPTS: usize = 4;

/// Every heap of the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessHeaps;

impl ProcessHeaps {
    pub fn new() -> Self {
        ProcessHeaps
    }

    fn handles() -> Vec<usize> {
        unsafe {
            let count = GetProcessHeaps(0, std::ptr::null_mut());
            if count == 0 {
                return Vec::new();
            }
            let mut raw: Vec<HANDLE> = vec![std::ptr::null_mut(); count as usize];
            let filled = GetProcessHeaps(count, raw.as_mut_ptr());
            raw.truncate(filled.min(count) as usize);
            raw.into_iter().map(|handle| handle as usize).collect()
        }
    }
}

impl AllocationSource for ProcessHeaps {
    fn zones(&self) -> Vec<Box<dyn Zone + '_>> {
        Self::handles()
            .into_iter()
            .enumerate()
            .map(|(index, handle)| Box::new(NativeHeapZone { index, handle }) as Box<dyn Zone + '_>)
            .collect()
    }
}

struct NativeHeapZone {
    index: usize,
    // Stored as an integer so the zone stays Send
    handle: usize,
}

/// Releases the heap lock on drop
struct HeapLockGuard(HANDLE);

impl Drop for HeapLockGuard {
    fn drop(&mut self) {
        unsafe {
            HeapUnlock(self.0);
        }
    }
}

fn is_busy(entry: &PROCESS_HEAP_ENTRY) -> bool {
    entry.wFlags & PROCESS_HEAP_ENTRY_BUSY != 0 && !entry.lpData.is_null()
}

/// Check that a block's range is committed and readable
fn is_readable(address: Address, size: usize) -> bool {
    unsafe {
        let mut mbi: MEMORY_BASIC_INFORMATION = std::mem::zeroed();
        let written = VirtualQuery(
            address.as_ptr::<u8>() as *const _,
            &mut mbi,
            std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
        );
        if written == 0 || mbi.State != MEM_COMMIT {
            return false;
        }
        if mbi.Protect & PAGE_NOACCESS != 0 || mbi.Protect & PAGE_GUARD != 0 {
            return false;
        }
        let region_end = (mbi.BaseAddress as usize).saturating_add(mbi.RegionSize);
        address.as_usize().saturating_add(size) <= region_end
    }
}

impl NativeHeapZone {
    fn heap(&self) -> HANDLE {
        self.handle as HANDLE
    }

    fn lock(&self) -> BeagleResult<HeapLockGuard> {
        let heap = self.heap();
        if unsafe { HeapLock(heap) } == 0 {
            return Err(BeagleError::zone_unavailable(
                self.name(),
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(HeapLockGuard(heap))
    }

    /// One locked `HeapWalk` pass into a buffer of `capacity` entries
    ///
    /// Returns the entries that fit and the number of busy entries seen.
    fn record_entries(&self, capacity: usize) -> BeagleResult<(Vec<HeapBlock>, usize)> {
        let heap = self.heap();
        // Reserved before locking: nothing may allocate while the cursor is live
        let mut entries = Vec::with_capacity(capacity);
        let mut total = 0usize;

        let _lock = self.lock()?;
        let mut entry: PROCESS_HEAP_ENTRY = unsafe { std::mem::zeroed() };
        while unsafe { HeapWalk(heap, &mut entry) } != 0 {
            if !is_busy(&entry) {
                continue;
            }
            total += 1;
            if entries.len() < entries.capacity() {
                entries.push(HeapBlock::new(
                    Address::from(entry.lpData),
                    entry.cbData as usize,
                ));
            }
        }
        Ok((entries, total))
    }

    /// Phase 1: record busy entries without reading or allocating
    ///
    /// If the heap holds more busy entries than the buffer fits, the pass is
    /// retried with a larger buffer. After the last attempt the entries that
    /// fit are returned.
    fn busy_entries(&self) -> BeagleResult<Vec<HeapBlock>> {
        let mut capacity = INITIAL_ENTRIES;
        for attempt in 1..=COLLECT_ATTEMPTS {
            let (entries, total) = self.record_entries(capacity)?;
            if total <= entries.len() {
                return Ok(entries);
            }
            if attempt == COLLECT_ATTEMPTS {
                debug!(
                    zone = %self.name(),
                    recorded = entries.len(),
                    total,
                    "heap kept growing; walking the entries recorded"
                );
                return Ok(entries);
            }
            capacity = total + total / 4 + 64;
        }
        Ok(Vec::new())
    }

    /// Phase 2 check, called with the heap locked: fresh size of a block
    /// that is still allocated and readable
    fn live_size(&self, block: HeapBlock) -> Option<usize> {
        let heap = self.heap();
        let ptr = block.address.as_ptr::<u8>() as *const _;
        unsafe {
            if HeapValidate(heap, 0, ptr) == 0 {
                return None;
            }
            let size = HeapSize(heap, 0, ptr);
            if size == usize::MAX {
                return None;
            }
            is_readable(block.address, size).then_some(size)
        }
    }
}

impl Zone for NativeHeapZone {
    fn name(&self) -> String {
        format!("process-heap-{}", self.index)
    }

    fn walk(&self, visitor: &mut BlockVisitor<'_>) -> BeagleResult<ControlFlow<()>> {
        for block in self.busy_entries()? {
            let _lock = self.lock()?;
            let Some(size) = self.live_size(block) else {
                continue;
            };
            // SAFETY: the heap is locked and the block validated as allocated,
            // so no other thread can free it until `_lock` drops.
            let live = unsafe { LiveBlock::new(HeapBlock::new(block.address, size)) };
            if visitor(live).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Tagged, TypeTable};
    use crate::scan::Beagle;
    use winapi::um::heapapi::{GetProcessHeap, HeapAlloc, HeapCreate, HeapDestroy, HeapFree};

    /// Private growable heap, destroyed on drop
    struct ScratchHeap(HANDLE);

    impl ScratchHeap {
        fn new() -> Self {
            let heap = unsafe { HeapCreate(0, 0, 0) };
            assert!(!heap.is_null());
            ScratchHeap(heap)
        }

        fn zone(&self) -> NativeHeapZone {
            NativeHeapZone {
                index: 0,
                handle: self.0 as usize,
            }
        }

        fn alloc(&self, size: usize) -> usize {
            let ptr = unsafe { HeapAlloc(self.0, 0, size) };
            assert!(!ptr.is_null());
            ptr as usize
        }

        fn free(&self, address: usize) {
            unsafe {
                assert_ne!(HeapFree(self.0, 0, address as *mut _), 0);
            }
        }
    }

    impl Drop for ScratchHeap {
        fn drop(&mut self) {
            unsafe {
                HeapDestroy(self.0);
            }
        }
    }

    fn visited(zone: &NativeHeapZone) -> Vec<HeapBlock> {
        let mut blocks = Vec::new();
        let flow = zone
            .walk(&mut |block: LiveBlock<'_>| {
                blocks.push(block.block());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert!(flow.is_continue());
        blocks
    }

    #[test]
    fn test_process_heaps_listed() {
        let zones = ProcessHeaps::new().zones();
        assert!(!zones.is_empty());
        assert_eq!(zones[0].name(), "process-heap-0");

        let default_heap = unsafe { GetProcessHeap() } as usize;
        assert!(ProcessHeaps::handles().contains(&default_heap));
    }

    #[test]
    fn test_walk_visits_only_busy_entries() {
        let heap = ScratchHeap::new();
        let kept = heap.alloc(48);
        let freed = heap.alloc(48);
        heap.free(freed);

        let blocks = visited(&heap.zone());
        let kept_block = blocks
            .iter()
            .find(|block| block.address.as_usize() == kept)
            .expect("live entry should be visited");
        assert!(kept_block.size >= 48);
        assert!(blocks.iter().all(|block| block.address.as_usize() != freed));
    }

    #[test]
    fn test_walk_records_more_entries_than_initial_buffer() {
        let heap = ScratchHeap::new();
        let addresses: Vec<usize> = (0..INITIAL_ENTRIES + 100).map(|_| heap.alloc(16)).collect();

        let blocks = visited(&heap.zone());
        assert!(blocks.len() >= addresses.len());
        let seen: std::collections::HashSet<usize> =
            blocks.iter().map(|block| block.address.as_usize()).collect();
        assert!(addresses.iter().all(|address| seen.contains(address)));
    }

    #[test]
    fn test_allocations_made_by_visitor_are_not_visited() {
        let heap = ScratchHeap::new();
        let original: Vec<usize> = (0..8).map(|_| heap.alloc(32)).collect();

        let mut made = Vec::new();
        let mut seen = Vec::new();
        heap.zone()
            .walk(&mut |block: LiveBlock<'_>| {
                seen.push(block.address().as_usize());
                made.push(heap.alloc(32));
                ControlFlow::Continue(())
            })
            .unwrap();

        assert!(original.iter().all(|address| seen.contains(address)));
        assert!(made.iter().all(|address| !seen.contains(address)));
    }

    #[test]
    fn test_readability_check() {
        let value = Box::new([1u64; 4]);
        assert!(is_readable(Address::from(value.as_ptr()), 32));
        assert!(!is_readable(Address::null(), 8));
    }

    #[test]
    fn test_stop_on_break() {
        let heap = ScratchHeap::new();
        heap.alloc(16);
        heap.alloc(16);

        let mut calls = 0;
        let flow = heap
            .zone()
            .walk(&mut |_block: LiveBlock<'_>| {
                calls += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert!(flow.is_break());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_finds_tagged_object_on_process_heap() {
        let table = TypeTable::new();
        let widget = table.register_for::<[u64; 4]>("Widget", None).unwrap();
        let object = Tagged::boxed(widget, [9u64; 4]);
        let address = Address::from(&*object as *const Tagged<[u64; 4]>);

        let heaps = ProcessHeaps::new();
        let found = Beagle::new(&table, &heaps).instances_of(widget).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, address);
    }
}
