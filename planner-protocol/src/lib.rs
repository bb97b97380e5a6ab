//! Wire format of a cluster startup plan.
//!
//! These types are what an external launcher consumes; renaming a field here
//! breaks that consumer.

pub mod error;
pub mod messages;
pub mod model;

pub use error::ProtocolError;
pub use messages::{BootstrapServers, PlanCommand, SendConfiguration, StartAgent, StartServers};
pub use model::{AgencyInfo, AgencyNode, Diagnostics};
