//! Role placement and startup program generation.

pub mod agency;
pub mod allocator;
pub mod models;
pub mod planner;
pub mod sequencer;

pub use agency::{AgencyBuilder, AgencyLayout, Launcher};
pub use allocator::RoleAllocator;
pub use models::{AssignedPorts, Assignment, Allocation, Role, Shortfall};
pub use planner::Planner;
