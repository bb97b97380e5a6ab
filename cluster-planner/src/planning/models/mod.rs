pub mod assignment;
pub mod role;

pub use assignment::{AssignedPorts, Assignment, Allocation, Shortfall};
pub use role::Role;
