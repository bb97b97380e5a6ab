use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of cluster processes the planner places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Agent,
    Coordinator,
    #[serde(rename = "DBserver")]
    DbServer,
}

impl Role {
    /// Agents need an external client port and an internal peer port.
    pub fn ports_per_instance(&self) -> usize {
        match self {
            Role::Agent => 2,
            Role::Coordinator | Role::DbServer => 1,
        }
    }

    /// Name given to the `index`-th instance when the configuration does not
    /// provide one.
    pub fn synthesize_id(&self, index: usize) -> String {
        match self {
            Role::Agent => format!("Agent{}", index),
            Role::Coordinator => format!("Coordinator{}", index),
            Role::DbServer => format!("Primary{}", index),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Agent => "agent",
            Role::Coordinator => "coordinator",
            Role::DbServer => "DB server",
        };
        f.write_str(name)
    }
}
