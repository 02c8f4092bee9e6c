//! Small helpers used alongside the throttles
//!
//! None of these keep timing state beyond what their signature shows.

pub mod delay_map;
pub mod group;
pub mod ids;
pub mod latch;
pub mod shuffle;
pub mod split;

pub use delay_map::{DelayMap, delay_map};
pub use group::group;
pub use ids::{IdGenerator, PrefixIdGenerator};
pub use latch::Latch;
pub use shuffle::{randomize, randomize_with, safe_randomize};
pub use split::split;
