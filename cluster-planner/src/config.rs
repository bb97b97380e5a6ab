use crate::dispatcher::{Dispatcher, Port};
use crate::error::{PlannerError, Result};
use crate::planning::models::Role;
use indexmap::IndexMap;
use planner_protocol::Diagnostics;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Declarative description of the cluster to plan.
///
/// Every field has a default; a configuration document only needs to name
/// what differs. Keys the planner does not know are ignored.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    pub agency_prefix: String,
    pub number_of_agents: usize,
    #[serde(rename = "numberOfDBservers")]
    pub number_of_db_servers: usize,
    pub number_of_coordinators: usize,
    /// Accepted for compatibility, secondaries are not planned.
    pub start_secondaries: bool,

    // Preferred server names, extended with generated ones when too short.
    #[serde(rename = "DBserverIDs")]
    pub db_server_ids: Vec<String>,
    #[serde(rename = "coordinatorIDs")]
    pub coordinator_ids: Vec<String>,

    // Empty means "use the dispatcher's default".
    pub data_path: String,
    pub log_path: String,
    pub arangod_path: String,
    pub agent_path: String,

    // Candidate ports, tried in order before the random fallback search.
    pub agent_ext_ports: Vec<Port>,
    pub agent_int_ports: Vec<Port>,
    #[serde(rename = "DBserverPorts")]
    pub db_server_ports: Vec<Port>,
    pub coordinator_ports: Vec<Port>,

    pub dispatchers: IndexMap<String, Dispatcher>,

    #[serde(rename = "useSSLonDBservers")]
    pub use_ssl_on_db_servers: bool,
    #[serde(rename = "useSSLonCoordinators")]
    pub use_ssl_on_coordinators: bool,
    pub only_localhost: bool,

    pub valgrind: String,
    pub valgrindopts: Vec<String>,
    pub valgrind_xml_file_base: String,
    pub valgrind_testname: String,
    pub valgrind_hosts: String,
    pub extreme_verbosity: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let mut dispatchers = IndexMap::new();
        dispatchers.insert("me".to_string(), Dispatcher::new("me", "tcp://localhost:"));

        Self {
            agency_prefix: "arango".to_string(),
            number_of_agents: 1,
            number_of_db_servers: 2,
            number_of_coordinators: 1,
            start_secondaries: false,

            db_server_ids: ["Pavel", "Perry", "Pancho", "Paul", "Pierre", "Pit", "Pia", "Pablo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            coordinator_ids: ["Claus", "Chantalle", "Claire", "Claudia", "Claas", "Clemens", "Chris"]
                .iter()
                .map(|s| s.to_string())
                .collect(),

            data_path: String::new(),
            log_path: String::new(),
            arangod_path: String::new(),
            agent_path: String::new(),

            agent_ext_ports: vec![4001],
            agent_int_ports: vec![7001],
            db_server_ports: vec![8629],
            coordinator_ports: vec![8530],

            dispatchers,

            use_ssl_on_db_servers: false,
            use_ssl_on_coordinators: false,
            only_localhost: false,

            valgrind: String::new(),
            valgrindopts: Vec::new(),
            valgrind_xml_file_base: String::new(),
            valgrind_testname: String::new(),
            valgrind_hosts: String::new(),
            extreme_verbosity: false,
        }
    }
}

impl PlannerConfig {
    /// Builds a configuration from a JSON document, filling absent fields from
    /// the defaults. Dispatchers without an `id` take their map key.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(fields) = &value else {
            return Err(PlannerError::config(
                "<root>",
                "configuration must be a JSON object",
            ));
        };

        let mut config: PlannerConfig = match serde_json::from_value(value.clone()) {
            Ok(config) => config,
            Err(e) => return Err(Self::locate_error(fields, e)),
        };

        for (key, dispatcher) in config.dispatchers.iter_mut() {
            if dispatcher.id.is_empty() {
                dispatcher.id = key.clone();
            }
        }

        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Finds the top-level key whose value does not deserialize, so the error
    /// names the field to fix.
    fn locate_error(fields: &serde_json::Map<String, Value>, error: serde_json::Error) -> PlannerError {
        for (key, value) in fields {
            let mut single = serde_json::Map::new();
            single.insert(key.clone(), value.clone());
            if let Err(e) = serde_json::from_value::<PlannerConfig>(Value::Object(single)) {
                return PlannerError::config(key.as_str(), e.to_string());
            }
        }
        PlannerError::config("<root>", error.to_string())
    }

    /// Shape checks that must pass before any port is probed.
    pub fn validate(&self) -> Result<()> {
        let wants_processes =
            self.number_of_agents + self.number_of_coordinators + self.number_of_db_servers > 0;
        if wants_processes && self.dispatchers.is_empty() {
            return Err(PlannerError::config(
                "dispatchers",
                "at least one dispatcher is required",
            ));
        }

        for (key, dispatcher) in &self.dispatchers {
            if dispatcher.id.is_empty() {
                return Err(PlannerError::config(
                    format!("dispatchers.{}.id", key),
                    "dispatcher id must not be empty",
                ));
            }
            dispatcher.validate()?;
        }

        let port_lists = [
            ("agentExtPorts", &self.agent_ext_ports),
            ("agentIntPorts", &self.agent_int_ports),
            ("DBserverPorts", &self.db_server_ports),
            ("coordinatorPorts", &self.coordinator_ports),
        ];
        for (field, ports) in port_lists {
            if ports.contains(&0) {
                return Err(PlannerError::config(field, "port 0 is not a valid candidate"));
            }
        }

        self.validate_server_ids()?;

        if self.agency_prefix.is_empty() || self.agency_prefix.contains('/') {
            return Err(PlannerError::config(
                "agencyPrefix",
                "must be a single non-empty key segment",
            ));
        }

        Ok(())
    }

    /// Server ids become agency keys, so the ones that will be used must be
    /// single non-empty path segments and unique across both roles.
    fn validate_server_ids(&self) -> Result<()> {
        let lists = [
            (
                "coordinatorIDs",
                Role::Coordinator,
                &self.coordinator_ids,
                self.number_of_coordinators,
            ),
            (
                "DBserverIDs",
                Role::DbServer,
                &self.db_server_ids,
                self.number_of_db_servers,
            ),
        ];

        let mut seen = HashSet::new();
        for (field, role, ids, count) in lists {
            for index in 0..count {
                let id = ids
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| role.synthesize_id(index));
                if id.is_empty() || id.contains('/') {
                    return Err(PlannerError::config(
                        field,
                        format!("server id '{}' is not a valid agency key", id),
                    ));
                }
                if !seen.insert(id.clone()) {
                    return Err(PlannerError::config(
                        field,
                        format!("server id '{}' is used more than once", id),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Diagnostic options forwarded to every started process.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            valgrind: self.valgrind.clone(),
            valgrindopts: self.valgrindopts.clone(),
            valgrind_xml_file_base: self.valgrind_xml_file_base.clone(),
            valgrind_testname: self.valgrind_testname.clone(),
            valgrind_hosts: self.valgrind_hosts.clone(),
            extreme_verbosity: self.extreme_verbosity,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
