//! Port allocation: candidate lists, fallback search and availability
//! checks.

pub mod finder;
pub mod probe;

pub use finder::PortFinder;
pub use probe::{NetworkProbe, OfflineProbe, PortProbe};
