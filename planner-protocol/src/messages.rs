use crate::model::{AgencyInfo, AgencyNode, Diagnostics};
use serde::{Deserialize, Serialize};

/// One step of a cluster startup program.
///
/// Serialized as a flat JSON object tagged by `action`. The field names are
/// what the external launcher reads, so they are renamed explicitly where
/// they do not follow camelCase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action")]
pub enum PlanCommand {
    #[serde(rename = "startAgent")]
    StartAgent(StartAgent),
    #[serde(rename = "sendConfiguration")]
    SendConfiguration(SendConfiguration),
    #[serde(rename = "startServers")]
    StartServers(StartServers),
    #[serde(rename = "bootstrapServers")]
    BootstrapServers(BootstrapServers),
}

impl PlanCommand {
    /// The wire tag of this command.
    pub fn action(&self) -> &'static str {
        match self {
            PlanCommand::StartAgent(_) => "startAgent",
            PlanCommand::SendConfiguration(_) => "sendConfiguration",
            PlanCommand::StartServers(_) => "startServers",
            PlanCommand::BootstrapServers(_) => "bootstrapServers",
        }
    }

    /// Dispatcher that has to execute this command, if it is bound to one.
    pub fn dispatcher(&self) -> Option<&str> {
        match self {
            PlanCommand::StartAgent(cmd) => Some(&cmd.dispatcher),
            PlanCommand::StartServers(cmd) => Some(&cmd.dispatcher),
            PlanCommand::SendConfiguration(_) | PlanCommand::BootstrapServers(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartAgent {
    pub dispatcher: String,
    pub ext_port: u16,
    pub int_port: u16,
    /// `host:intPort` of every agent started before this one.
    pub peers: Vec<String>,
    pub agency_prefix: String,
    pub data_path: String,
    pub log_path: String,
    pub agent_path: String,
    pub only_localhost: bool,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SendConfiguration {
    pub agency: AgencyInfo,
    pub data: AgencyNode,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartServers {
    pub dispatcher: String,
    #[serde(rename = "DBservers")]
    pub db_servers: Vec<String>,
    #[serde(rename = "Coordinators")]
    pub coordinators: Vec<String>,
    pub name: String,
    pub data_path: String,
    pub log_path: String,
    pub arangod_path: String,
    pub only_localhost: bool,
    pub agency: AgencyInfo,
    #[serde(rename = "useSSLonDBservers")]
    pub use_ssl_on_db_servers: bool,
    #[serde(rename = "useSSLonCoordinators")]
    pub use_ssl_on_coordinators: bool,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl StartServers {
    pub fn is_empty(&self) -> bool {
        self.db_servers.is_empty() && self.coordinators.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapServers {
    /// URLs (`http://` or `https://`) of every DB server.
    pub db_servers: Vec<String>,
    /// URLs (`http://` or `https://`) of every coordinator.
    pub coordinators: Vec<String>,
}
