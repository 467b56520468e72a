//! Option sets for instance search and class-name lookup

use super::error::{BeagleError, BeagleResult};
use bitflags::bitflags;

bitflags! {
    /// Result-shaping policy for instance search
    ///
    /// The empty set is the default policy: every match, subclasses
    /// included, hazardous objects excluded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FindOptions: u32 {
        /// Keep only the first match in scan order
        const FIRST_MATCH = 1 << 0;
        /// Keep only the last match in scan order
        const LAST_MATCH = 1 << 1;
        /// Match the exact type only
        const EXCLUDE_SUBCLASSES = 1 << 2;
        /// Keep instances of hazard-set types
        const INCLUDE_HAZARDOUS = 1 << 3;
    }
}

impl FindOptions {
    /// Default policy
    pub const DEFAULT: FindOptions = FindOptions::empty();

    /// Rejects option combinations that cannot be honoured
    pub fn validate(self) -> BeagleResult<Self> {
        if self.contains(FindOptions::FIRST_MATCH | FindOptions::LAST_MATCH) {
            return Err(BeagleError::conflicting_options(
                "FIRST_MATCH and LAST_MATCH are mutually exclusive",
            ));
        }
        Ok(self)
    }
}

impl Default for FindOptions {
    fn default() -> Self {
        FindOptions::DEFAULT
    }
}

bitflags! {
    /// How a partial name is compared against type names
    ///
    /// With no flags set the partial name may appear anywhere in the
    /// type name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompareOptions: u32 {
        /// Ignore ASCII case
        const CASE_INSENSITIVE = 1 << 0;
        /// Anchor the match: prefix, or suffix together with BACKWARDS
        const ANCHORED = 1 << 1;
        /// Search from the end of the name
        const BACKWARDS = 1 << 2;
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions::empty()
    }
}
