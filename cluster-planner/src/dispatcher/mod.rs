pub mod collision;

pub use collision::detect_ip_collisions;

use crate::endpoint::Endpoint;
use crate::error::{PlannerError, Result};
use crate::planning::models::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type Port = u16;

const LOCAL_ENDPOINTS: [&str; 2] = ["tcp://localhost:", "tcp://127.0.0.1:"];

/// A host that can launch cluster processes on the planner's behalf.
///
/// Built from configuration once per planning run. The planner only mutates
/// it to claim ports and to record the overlap index of co-located
/// dispatchers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dispatcher {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    avoid_ports: BTreeSet<Port>,
    #[serde(default = "default_allow")]
    pub allow_agents: bool,
    #[serde(default = "default_allow")]
    pub allow_coordinators: bool,
    #[serde(default = "default_allow", rename = "allowDBservers")]
    pub allow_db_servers: bool,
    #[serde(default)]
    pub arangod_extra_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub passwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port_overlap_index: Option<usize>,
}

fn default_allow() -> bool {
    true
}

impl Dispatcher {
    pub fn new(id: &str, endpoint: &str) -> Self {
        Self {
            id: id.to_string(),
            endpoint: endpoint.to_string(),
            avoid_ports: BTreeSet::new(),
            allow_agents: true,
            allow_coordinators: true,
            allow_db_servers: true,
            arangod_extra_args: Vec::new(),
            username: None,
            passwd: None,
            port_overlap_index: None,
        }
    }

    pub fn with_roles(mut self, agents: bool, coordinators: bool, db_servers: bool) -> Self {
        self.allow_agents = agents;
        self.allow_coordinators = coordinators;
        self.allow_db_servers = db_servers;
        self
    }

    pub fn with_credentials(mut self, username: &str, passwd: &str) -> Self {
        self.username = Some(username.to_string());
        self.passwd = Some(passwd.to_string());
        self
    }

    /// Checks that the descriptor can be used for port allocation.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(PlannerError::config("dispatchers", "dispatcher without id"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(PlannerError::config(
                format!("dispatchers.{}.endpoint", self.id),
                "missing endpoint",
            ));
        }
        self.parsed_endpoint().map(|_| ())
    }

    pub fn parsed_endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.endpoint)
    }

    /// Host part of the endpoint, without scheme or port.
    pub fn host(&self) -> Result<String> {
        Ok(self.parsed_endpoint()?.host().to_string())
    }

    /// True when the dispatcher is the machine running the planner, so ports
    /// can be tested with a local bind instead of asking over HTTP.
    ///
    /// Only the portless `tcp://localhost:` and `tcp://127.0.0.1:` count. A
    /// loopback endpoint with a port is a dispatcher of its own and is asked
    /// over HTTP.
    pub fn is_local(&self) -> bool {
        LOCAL_ENDPOINTS.contains(&self.endpoint.trim())
    }

    pub fn allows(&self, role: Role) -> bool {
        match role {
            Role::Agent => self.allow_agents,
            Role::Coordinator => self.allow_coordinators,
            Role::DbServer => self.allow_db_servers,
        }
    }

    pub fn is_avoided(&self, port: Port) -> bool {
        self.avoid_ports.contains(&port)
    }

    /// Marks `port` as taken for the rest of the run. Returns false if it was
    /// already taken.
    pub fn claim(&mut self, port: Port) -> bool {
        self.avoid_ports.insert(port)
    }

    pub fn avoid_ports(&self) -> &BTreeSet<Port> {
        &self.avoid_ports
    }

    pub fn port_overlap_index(&self) -> Option<usize> {
        self.port_overlap_index
    }

    pub(crate) fn set_port_overlap_index(&mut self, index: usize) {
        self.port_overlap_index = Some(index);
    }
}
