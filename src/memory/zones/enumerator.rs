//! Zone-by-zone enumeration of live allocations

use super::{AllocationSource, HeapBlock, LiveBlock};
use crate::core::types::BeagleResult;
use crate::memory::guard::ScanGuard;
use std::ops::ControlFlow;
use tracing::debug;

/// Counters from one enumeration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    pub zones_walked: usize,
    /// Zones that reported an error and were passed over
    pub zones_skipped: usize,
    pub blocks_visited: usize,
    /// The visitor asked to stop before every zone was walked
    pub stopped_early: bool,
    /// Live blocks the source could not enumerate
    pub untracked_blocks: usize,
}

/// Walks every zone of an allocation source
pub struct AllocationEnumerator<'s> {
    source: &'s dyn AllocationSource,
}

impl<'s> AllocationEnumerator<'s> {
    pub fn new(source: &'s dyn AllocationSource) -> Self {
        AllocationEnumerator { source }
    }

    /// Visit live blocks across all zones
    ///
    /// A zone that cannot be walked is skipped and the pass continues with
    /// the next one. The visitor must not free memory that was allocated
    /// before the scan started; blocks it allocates itself are never
    /// visited.
    pub fn walk<F>(&self, _guard: &ScanGuard, mut visit: F) -> EnumerationStats
    where
        F: FnMut(LiveBlock<'_>) -> ControlFlow<()>,
    {
        let mut stats = EnumerationStats::default();

        for zone in self.source.zones() {
            let mut counted = |block: LiveBlock<'_>| {
                stats.blocks_visited += 1;
                visit(block)
            };

            match zone.walk(&mut counted) {
                Ok(flow) => {
                    stats.zones_walked += 1;
                    if flow.is_break() {
                        stats.stopped_early = true;
                        break;
                    }
                }
                Err(e) => {
                    stats.zones_skipped += 1;
                    debug!(zone = %zone.name(), error = %e, "Skipping zone");
                }
            }
        }

        stats.untracked_blocks = self.source.untracked_blocks();
        stats
    }

    /// Copy out every live block
    ///
    /// The addresses are only a record: the blocks may be freed as soon as
    /// this returns.
    pub fn snapshot(&self) -> BeagleResult<Vec<HeapBlock>> {
        let guard = ScanGuard::enter()?;
        let mut blocks = Vec::new();
        self.walk(&guard, |block| {
            blocks.push(block.block());
            ControlFlow::Continue(())
        });
        Ok(blocks)
    }
}
