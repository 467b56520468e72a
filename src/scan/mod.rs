//! Instance search over the live heap
//!
//! Everything here works on validated candidates and type snapshots; raw
//! memory stays behind [`crate::memory`].

pub mod beagle;
pub mod matcher;
pub mod names;
pub mod shaper;

pub use beagle::Beagle;
pub use matcher::{ClassMatcher, ClassQuery, MatchMode};
pub use names::{classes_matching, name_matches};
pub use shaper::{shape, ResultShaper};
