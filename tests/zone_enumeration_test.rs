//! Zone enumeration: failing zones, early rejection and reentrancy

use heap_beagle::core::types::{Address, BeagleError, BeagleResult, FindOptions};
use heap_beagle::memory::{
    AllocationEnumerator, AllocationSource, BlockVisitor, ScanGuard, Zone,
};
use heap_beagle::{Beagle, Tagged, TrackingAllocator, TypeTable};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};

#[global_allocator]
static ALLOCATOR: TrackingAllocator = TrackingAllocator::new();

/// Zone that is always locked by someone else
struct LockedZone;

impl Zone for LockedZone {
    fn name(&self) -> String {
        "locked".to_string()
    }

    fn walk(&self, _visitor: &mut BlockVisitor<'_>) -> BeagleResult<ControlFlow<()>> {
        Err(BeagleError::zone_unavailable("locked", "held by another thread"))
    }
}

/// The tracking zones with a locked zone in front, counting `zones()` calls
struct FlakySource {
    calls: AtomicUsize,
}

impl FlakySource {
    fn new() -> Self {
        FlakySource {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AllocationSource for FlakySource {
    fn zones(&self) -> Vec<Box<dyn Zone + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut zones: Vec<Box<dyn Zone + '_>> = vec![Box::new(LockedZone)];
        zones.extend(ALLOCATOR.zones().into_iter().map(|zone| zone as Box<dyn Zone + '_>));
        zones
    }
}

#[test]
#[cfg_attr(miri, ignore = "walks the live heap")]
fn test_locked_zone_is_skipped() {
    let table = TypeTable::new();
    let widget = table.register_for::<[u8; 8]>("Widget", None).unwrap();
    let _widgets: Vec<_> = (0..3u8).map(|i| Tagged::boxed(widget, [i; 8])).collect();

    let source = FlakySource::new();
    let beagle = Beagle::new(&table, &source);
    assert_eq!(beagle.instances_of(widget).unwrap().len(), 3);

    let guard = ScanGuard::enter().unwrap();
    let stats = AllocationEnumerator::new(&source).walk(&guard, |_| ControlFlow::Continue(()));
    assert_eq!(stats.zones_skipped, 1);
    assert_eq!(stats.zones_walked, heap_beagle::memory::zones::ZONE_COUNT);
    assert!(stats.blocks_visited > 0);
}

#[test]
fn test_conflicting_options_rejected_before_walk() {
    let table = TypeTable::new();
    let widget = table.register_for::<u32>("Widget", None).unwrap();
    let source = FlakySource::new();
    let beagle = Beagle::new(&table, &source);

    let conflict = FindOptions::FIRST_MATCH | FindOptions::LAST_MATCH;
    assert!(matches!(
        beagle.find_instances(widget, conflict),
        Err(BeagleError::ConflictingOptions(_))
    ));
    assert!(matches!(
        beagle.find_instances_named("Widget", conflict | FindOptions::EXCLUDE_SUBCLASSES),
        Err(BeagleError::ConflictingOptions(_))
    ));
    assert_eq!(source.calls(), 0);

    beagle.find_instances(widget, FindOptions::LAST_MATCH).unwrap();
    assert_eq!(source.calls(), 1);
}

#[test]
#[cfg_attr(miri, ignore = "walks the live heap")]
fn test_scan_from_inside_a_visit_is_rejected() {
    let table = TypeTable::new();
    let widget = table.register_for::<u32>("Widget", None).unwrap();
    let _widget = Tagged::boxed(widget, 1u32);
    let beagle = Beagle::new(&table, &ALLOCATOR);

    let guard = ScanGuard::enter().unwrap();
    let mut nested = None;
    AllocationEnumerator::new(&ALLOCATOR).walk(&guard, |_| {
        nested = Some(matches!(
            beagle.instances_of(widget),
            Err(BeagleError::ReentrantScan)
        ));
        ControlFlow::Break(())
    });
    drop(guard);

    assert_eq!(nested, Some(true));
    assert_eq!(beagle.instances_of(widget).unwrap().len(), 1);
}

#[test]
#[cfg_attr(miri, ignore = "walks the live heap")]
fn test_scanner_allocations_are_not_scanned() {
    let table = TypeTable::new();
    let widget = table.register_for::<u32>("Widget", None).unwrap();
    let _widgets: Vec<_> = (0..200u32).map(|i| Tagged::boxed(widget, i)).collect();
    let beagle = Beagle::new(&table, &ALLOCATOR);

    // Growing the result vector allocates repeatedly during the walk
    let found = beagle.instances_of(widget).unwrap();
    assert_eq!(found.len(), 200);

    let result_buffer = Address::from(found.as_ptr());
    let blocks = AllocationEnumerator::new(&ALLOCATOR).snapshot().unwrap();
    assert!(blocks.iter().all(|block| block.address != result_buffer));
    assert!(ALLOCATOR.is_tracked(result_buffer));
}

#[test]
#[cfg_attr(miri, ignore = "walks the live heap")]
fn test_snapshot_lists_live_boxes() {
    let payload = Box::new([0xABu8; 96]);
    let address = Address::from(payload.as_ptr());

    let blocks = AllocationEnumerator::new(&ALLOCATOR).snapshot().unwrap();
    let block = blocks
        .iter()
        .find(|block| block.address == address)
        .expect("live box should be enumerated");
    assert_eq!(block.size, 96);
    assert!(ALLOCATOR.stats().live_blocks > 0);
}
