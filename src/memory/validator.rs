//! Object validation for raw heap blocks
//!
//! Decides whether a live block is plausibly an object header. Everything
//! here is a pure value check against a [`TypeGraph`] snapshot: the type
//! word is compared against known handles, never followed.

use crate::core::types::{Address, TypeHandle, WORD_SIZE};
use crate::memory::zones::LiveBlock;
use crate::registry::{seal_for, HazardSet, TypeGraph};
use serde::{Deserialize, Serialize};

/// Where the type word sits inside an object and whether a seal follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLayout {
    /// Byte offset of the type word; must be a multiple of the word size
    pub type_word_offset: usize,
    /// A seal word follows the type word
    pub sealed: bool,
}

impl HeaderLayout {
    /// Layout written by [`Tagged`](crate::registry::Tagged)
    pub const TAGGED: HeaderLayout = HeaderLayout {
        type_word_offset: 0,
        sealed: true,
    };

    pub const fn new(type_word_offset: usize, sealed: bool) -> Self {
        HeaderLayout {
            type_word_offset,
            sealed,
        }
    }

    /// Smallest block that can hold the header
    pub const fn min_size(&self) -> usize {
        let words = if self.sealed { 2 } else { 1 };
        self.type_word_offset.saturating_add(words * WORD_SIZE)
    }
}

impl Default for HeaderLayout {
    fn default() -> Self {
        HeaderLayout::TAGGED
    }
}

/// A block accepted as a live, type-bearing object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectCandidate {
    pub address: Address,
    pub type_handle: TypeHandle,
    /// The resolved type is in the hazard set
    pub hazardous: bool,
}

/// Filters live blocks down to plausible objects
pub struct ObjectValidator<'q> {
    graph: &'q TypeGraph,
    hazards: &'q HazardSet,
    layout: HeaderLayout,
}

impl<'q> ObjectValidator<'q> {
    pub fn new(graph: &'q TypeGraph, hazards: &'q HazardSet, layout: HeaderLayout) -> Self {
        ObjectValidator {
            graph,
            hazards,
            layout,
        }
    }

    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    /// Accept or silently reject one block
    pub fn inspect(&self, block: &LiveBlock<'_>) -> Option<ObjectCandidate> {
        if block.size() < self.layout.min_size() {
            return None;
        }
        if !block.address().is_aligned(std::mem::align_of::<usize>()) {
            return None;
        }

        let type_word = block.read_word(self.layout.type_word_offset)?;
        let type_handle = self.graph.lookup(type_word)?;

        if block.size() < self.graph.instance_size(type_handle) {
            return None;
        }
        if self.layout.sealed {
            let seal_offset = self.layout.type_word_offset.checked_add(WORD_SIZE)?;
            let seal = block.read_word(seal_offset)?;
            if seal != seal_for(type_word) {
                return None;
            }
        }

        Some(ObjectCandidate {
            address: block.address(),
            type_handle,
            hazardous: self.hazards.contains(type_handle),
        })
    }
}
