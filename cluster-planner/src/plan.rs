use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::planning::Shortfall;
use indexmap::IndexMap;
use planner_protocol::{BootstrapServers, PlanCommand, SendConfiguration, StartAgent, StartServers};
use serde::{Deserialize, Serialize};

/// Output of a planning run: the dispatchers as the planner left them and the
/// startup program for the launcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    dispatchers: IndexMap<String, Dispatcher>,
    commands: Vec<PlanCommand>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    shortfalls: Vec<Shortfall>,
}

impl Plan {
    pub fn new(
        dispatchers: IndexMap<String, Dispatcher>,
        commands: Vec<PlanCommand>,
        shortfalls: Vec<Shortfall>,
    ) -> Self {
        Self {
            dispatchers,
            commands,
            shortfalls,
        }
    }

    pub fn dispatchers(&self) -> &IndexMap<String, Dispatcher> {
        &self.dispatchers
    }

    pub fn commands(&self) -> &[PlanCommand] {
        &self.commands
    }

    /// Roles that were placed fewer times than configured.
    pub fn shortfalls(&self) -> &[Shortfall] {
        &self.shortfalls
    }

    pub fn is_complete(&self) -> bool {
        self.shortfalls.is_empty()
    }

    pub fn agents(&self) -> impl Iterator<Item = &StartAgent> {
        self.commands.iter().filter_map(|cmd| match cmd {
            PlanCommand::StartAgent(agent) => Some(agent),
            _ => None,
        })
    }

    pub fn server_launches(&self) -> impl Iterator<Item = &StartServers> {
        self.commands.iter().filter_map(|cmd| match cmd {
            PlanCommand::StartServers(servers) => Some(servers),
            _ => None,
        })
    }

    /// The `startServers` command of one dispatcher.
    pub fn servers_on(&self, dispatcher: &str) -> Option<&StartServers> {
        self.server_launches().find(|s| s.dispatcher == dispatcher)
    }

    pub fn configuration(&self) -> Option<&SendConfiguration> {
        self.commands.iter().find_map(|cmd| match cmd {
            PlanCommand::SendConfiguration(config) => Some(config),
            _ => None,
        })
    }

    pub fn bootstrap(&self) -> Option<&BootstrapServers> {
        match self.commands.last() {
            Some(PlanCommand::BootstrapServers(bootstrap)) => Some(bootstrap),
            _ => None,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
