use super::models::{AssignedPorts, Allocation, Assignment};
use crate::config::PlannerConfig;
use crate::dispatcher::Dispatcher;
use crate::endpoint::Endpoint;
use crate::error::{PlannerError, Result};
use indexmap::IndexMap;
use planner_protocol::{AgencyInfo, AgencyNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const UNLOCKED: &str = "\"UNLOCKED\"";
const VERSION_ONE: &str = "\"1\"";
const NO_SECONDARY: &str = "\"none\"";
const HEARTBEAT_INTERVAL_MS: &str = "1000";

/// Servers one dispatcher has to start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Launcher {
    #[serde(rename = "DBservers")]
    pub db_servers: Vec<String>,
    #[serde(rename = "Coordinators")]
    pub coordinators: Vec<String>,
}

/// Everything derived from the allocations that the command list needs.
#[derive(Debug, Clone)]
pub struct AgencyLayout {
    /// Agency prefix and the external endpoint of each agent.
    pub info: AgencyInfo,
    /// For agent `k`, the internal `host:port` of agents `0..k`.
    pub peers: Vec<Vec<String>>,
    pub launchers: IndexMap<String, Launcher>,
    /// Server id to its SSL-adjusted endpoint.
    pub endpoints: BTreeMap<String, String>,
    pub coordinator_urls: Vec<String>,
    pub db_server_urls: Vec<String>,
    pub tree: AgencyNode,
}

impl AgencyLayout {
    /// Checks that every server a launcher starts has an endpoint.
    pub fn check_complete(&self) -> Result<()> {
        for (dispatcher, launcher) in &self.launchers {
            for id in launcher.db_servers.iter().chain(&launcher.coordinators) {
                if !self.endpoints.contains_key(id) {
                    return Err(PlannerError::Internal(format!(
                        "server '{}' on '{}' has no endpoint",
                        id, dispatcher
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Turns allocations into endpoints, launcher lists and the agency tree.
pub struct AgencyBuilder<'a> {
    config: &'a PlannerConfig,
    dispatchers: &'a IndexMap<String, Dispatcher>,
}

impl<'a> AgencyBuilder<'a> {
    pub fn new(config: &'a PlannerConfig, dispatchers: &'a IndexMap<String, Dispatcher>) -> Self {
        Self {
            config,
            dispatchers,
        }
    }

    pub fn build(
        &self,
        agents: &Allocation,
        coordinators: &Allocation,
        db_servers: &Allocation,
    ) -> Result<AgencyLayout> {
        let (agency_endpoints, peers) = self.agent_endpoints(agents)?;

        let mut launchers: IndexMap<String, Launcher> = self
            .dispatchers
            .keys()
            .map(|id| (id.clone(), Launcher::default()))
            .collect();
        let mut endpoints = BTreeMap::new();
        let mut coordinator_urls = Vec::new();
        let mut db_server_urls = Vec::new();

        for server in db_servers.assignments() {
            let endpoint = self.server_endpoint(server, self.config.use_ssl_on_db_servers)?;
            self.launcher(&mut launchers, server)?
                .db_servers
                .push(server.id().to_string());
            db_server_urls.push(endpoint.to_url());
            endpoints.insert(server.id().to_string(), endpoint.to_string());
        }

        for server in coordinators.assignments() {
            let endpoint = self.server_endpoint(server, self.config.use_ssl_on_coordinators)?;
            self.launcher(&mut launchers, server)?
                .coordinators
                .push(server.id().to_string());
            coordinator_urls.push(endpoint.to_url());
            endpoints.insert(server.id().to_string(), endpoint.to_string());
        }

        let tree = self.tree(&launchers, &endpoints, coordinators, db_servers)?;

        Ok(AgencyLayout {
            info: AgencyInfo {
                agency_prefix: self.config.agency_prefix.clone(),
                endpoints: agency_endpoints,
            },
            peers,
            launchers,
            endpoints,
            coordinator_urls,
            db_server_urls,
            tree,
        })
    }

    fn dispatcher_endpoint(&self, assignment: &Assignment) -> Result<Endpoint> {
        self.dispatchers
            .get(assignment.dispatcher())
            .ok_or_else(|| {
                PlannerError::Internal(format!(
                    "{} '{}' placed on unknown dispatcher '{}'",
                    assignment.role(),
                    assignment.id(),
                    assignment.dispatcher()
                ))
            })?
            .parsed_endpoint()
    }

    /// External endpoints of the agents and, for each agent, the internal
    /// addresses of the agents before it.
    fn agent_endpoints(&self, agents: &Allocation) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let mut external = Vec::with_capacity(agents.len());
        let mut peers = Vec::with_capacity(agents.len());
        let mut internal: Vec<String> = Vec::with_capacity(agents.len());

        for agent in agents.assignments() {
            let AssignedPorts::Agent { ext_port, int_port } = agent.ports() else {
                return Err(PlannerError::Internal(format!(
                    "'{}' is in the agent list but has server ports",
                    agent.id()
                )));
            };
            let base = self.dispatcher_endpoint(agent)?;

            peers.push(internal.clone());
            internal.push(base.clone().with_port(int_port).addr_port());
            external.push(base.with_port(ext_port).to_string());
        }

        Ok((external, peers))
    }

    fn server_endpoint(&self, server: &Assignment, use_ssl: bool) -> Result<Endpoint> {
        Ok(self
            .dispatcher_endpoint(server)?
            .with_ssl(use_ssl)
            .with_port(server.port()))
    }

    fn launcher<'l>(
        &self,
        launchers: &'l mut IndexMap<String, Launcher>,
        server: &Assignment,
    ) -> Result<&'l mut Launcher> {
        launchers.get_mut(server.dispatcher()).ok_or_else(|| {
            PlannerError::Internal(format!("no launcher for '{}'", server.dispatcher()))
        })
    }

    fn tree(
        &self,
        launchers: &IndexMap<String, Launcher>,
        endpoints: &BTreeMap<String, String>,
        coordinators: &Allocation,
        db_servers: &Allocation,
    ) -> Result<AgencyNode> {
        let prefix = &self.config.agency_prefix;
        let mut root = AgencyNode::dir();
        let mut put = |path: String, node: AgencyNode| root.insert_path(&path, node);

        for (id, launcher) in launchers {
            put(
                format!("{}/Dispatcher/Launchers/{}", prefix, id),
                AgencyNode::leaf(serde_json::to_string(launcher)?),
            )?;
        }
        put(format!("{}/Dispatcher/Endpoints", prefix), AgencyNode::dir())?;
        for (id, endpoint) in endpoints {
            put(
                format!("{}/Dispatcher/Endpoints/{}", prefix, id),
                AgencyNode::leaf(endpoint.clone()),
            )?;
        }

        for section in ["Target", "Plan"] {
            put(format!("{}/{}/Lock", prefix, section), AgencyNode::leaf(UNLOCKED))?;
            put(format!("{}/{}/Version", prefix, section), AgencyNode::leaf(VERSION_ONE))?;
            for (dir, allocation) in [("DBServers", db_servers), ("Coordinators", coordinators)] {
                put(format!("{}/{}/{}", prefix, section, dir), AgencyNode::dir())?;
                for id in allocation.ids() {
                    put(
                        format!("{}/{}/{}/{}", prefix, section, dir, id),
                        AgencyNode::leaf(NO_SECONDARY),
                    )?;
                }
            }
        }
        put(format!("{}/Target/MapIDToEndpoint", prefix), AgencyNode::dir())?;
        for (id, endpoint) in endpoints {
            put(
                format!("{}/Target/MapIDToEndpoint/{}", prefix, id),
                AgencyNode::leaf(serde_json::to_string(endpoint)?),
            )?;
        }

        put(format!("{}/Current/Lock", prefix), AgencyNode::leaf(UNLOCKED))?;
        put(format!("{}/Current/Version", prefix), AgencyNode::leaf(VERSION_ONE))?;
        put(format!("{}/Current/DBServers", prefix), AgencyNode::dir())?;
        put(format!("{}/Current/Coordinators", prefix), AgencyNode::dir())?;
        put(
            format!("{}/Current/ServersRegistered/Version", prefix),
            AgencyNode::leaf(VERSION_ONE),
        )?;

        put(format!("{}/Sync/LatestID", prefix), AgencyNode::leaf(VERSION_ONE))?;
        put(format!("{}/Sync/Problems", prefix), AgencyNode::dir())?;
        put(format!("{}/Sync/UserVersion", prefix), AgencyNode::leaf(VERSION_ONE))?;
        put(format!("{}/Sync/ServerStates", prefix), AgencyNode::dir())?;
        put(
            format!("{}/Sync/HeartbeatIntervalMs", prefix),
            AgencyNode::leaf(HEARTBEAT_INTERVAL_MS),
        )?;
        put(format!("{}/Sync/Commands", prefix), AgencyNode::dir())?;

        Ok(root)
    }
}
