//! Cluster topology planner.
//!
//! Given a [`PlannerConfig`] naming how many agents, coordinators and DB
//! servers to run and which dispatchers may host them, the [`Planner`]
//! assigns every process a dispatcher and a free port, builds the agency
//! bootstrap tree and emits the ordered command list an external launcher
//! executes:
//!
//! ```text
//! startAgent*  ->  sendConfiguration  ->  startServers*  ->  bootstrapServers
//! ```
//!
//! Planning is synchronous and single-threaded; the only I/O is the port
//! availability check behind [`PortProbe`].

pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod plan;
pub mod planning;
pub mod ports;

pub use config::PlannerConfig;
pub use dispatcher::{Dispatcher, Port};
pub use endpoint::Endpoint;
pub use error::{PlannerError, Result};
pub use plan::Plan;
pub use planning::{Planner, Role, Shortfall};
pub use ports::{NetworkProbe, OfflineProbe, PortFinder, PortProbe};
