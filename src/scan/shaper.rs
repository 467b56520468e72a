//! Result policy: hazard filtering, exact re-filtering, first/last selection

use crate::core::types::{BeagleResult, FindOptions, ObjectHandle, TypeHandle};
use crate::memory::ObjectCandidate;
use std::ops::ControlFlow;

/// Streaming application of [`FindOptions`] to matched candidates
///
/// Candidates are offered in scan order. The shaper never frees anything
/// it has already collected, so it is safe to drive from inside a heap walk.
#[derive(Debug)]
pub struct ResultShaper {
    target: TypeHandle,
    options: FindOptions,
    kept: Vec<ObjectHandle>,
}

impl ResultShaper {
    /// Fails if `options` asks for both the first and the last match
    pub fn new(target: TypeHandle, options: FindOptions) -> BeagleResult<Self> {
        Ok(ResultShaper {
            target,
            options: options.validate()?,
            kept: Vec::new(),
        })
    }

    /// Offer the next matched candidate
    ///
    /// Returns `Break` once no later candidate can change the result.
    pub fn offer(&mut self, candidate: ObjectCandidate) -> ControlFlow<()> {
        if candidate.hazardous && !self.options.contains(FindOptions::INCLUDE_HAZARDOUS) {
            return ControlFlow::Continue(());
        }
        if self.options.contains(FindOptions::EXCLUDE_SUBCLASSES)
            && candidate.type_handle != self.target
        {
            return ControlFlow::Continue(());
        }

        let handle = ObjectHandle::new(
            candidate.address,
            candidate.type_handle,
            candidate.hazardous,
        );

        if self.options.contains(FindOptions::FIRST_MATCH) {
            self.kept.push(handle);
            return ControlFlow::Break(());
        }
        if self.options.contains(FindOptions::LAST_MATCH) {
            // clear keeps the capacity, so nothing is freed mid-walk
            self.kept.clear();
        }
        self.kept.push(handle);
        ControlFlow::Continue(())
    }

    /// Number of handles currently kept
    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    pub fn finish(self) -> Vec<ObjectHandle> {
        self.kept
    }
}

/// Shape an already collected candidate sequence
pub fn shape(
    target: TypeHandle,
    options: FindOptions,
    candidates: impl IntoIterator<Item = ObjectCandidate>,
) -> BeagleResult<Vec<ObjectHandle>> {
    let mut shaper = ResultShaper::new(target, options)?;
    for candidate in candidates {
        if shaper.offer(candidate).is_break() {
            break;
        }
    }
    Ok(shaper.finish())
}
