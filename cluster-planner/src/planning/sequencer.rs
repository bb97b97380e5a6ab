use super::agency::AgencyLayout;
use super::models::{AssignedPorts, Allocation};
use crate::config::PlannerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{PlannerError, Result};
use indexmap::IndexMap;
use planner_protocol::{
    BootstrapServers, PlanCommand, SendConfiguration, StartAgent, StartServers,
};

/// Emits the startup program:
///
/// 1. `startAgent` for every agent, in allocation order
/// 2. one `sendConfiguration`
/// 3. `startServers` for every dispatcher, in configuration order
/// 4. one `bootstrapServers`
pub fn sequence(
    config: &PlannerConfig,
    dispatchers: &IndexMap<String, Dispatcher>,
    agents: &Allocation,
    layout: &AgencyLayout,
) -> Result<Vec<PlanCommand>> {
    let diagnostics = config.diagnostics();
    let mut commands = Vec::with_capacity(agents.len() + dispatchers.len() + 2);

    for (index, agent) in agents.assignments().iter().enumerate() {
        let AssignedPorts::Agent { ext_port, int_port } = agent.ports() else {
            return Err(PlannerError::Internal(format!(
                "agent '{}' has no agent ports",
                agent.id()
            )));
        };
        let peers = layout.peers.get(index).cloned().ok_or_else(|| {
            PlannerError::Internal(format!("no peer list for agent '{}'", agent.id()))
        })?;

        commands.push(PlanCommand::StartAgent(StartAgent {
            dispatcher: agent.dispatcher().to_string(),
            ext_port,
            int_port,
            peers,
            agency_prefix: config.agency_prefix.clone(),
            data_path: config.data_path.clone(),
            log_path: config.log_path.clone(),
            agent_path: config.agent_path.clone(),
            only_localhost: config.only_localhost,
            diagnostics: diagnostics.clone(),
        }));
    }

    commands.push(PlanCommand::SendConfiguration(SendConfiguration {
        agency: layout.info.clone(),
        data: layout.tree.clone(),
    }));

    for id in dispatchers.keys() {
        let launcher = layout.launchers.get(id).ok_or_else(|| {
            PlannerError::Internal(format!("dispatcher '{}' has no launcher entry", id))
        })?;

        commands.push(PlanCommand::StartServers(StartServers {
            dispatcher: id.clone(),
            db_servers: launcher.db_servers.clone(),
            coordinators: launcher.coordinators.clone(),
            name: id.clone(),
            data_path: config.data_path.clone(),
            log_path: config.log_path.clone(),
            arangod_path: config.arangod_path.clone(),
            only_localhost: config.only_localhost,
            agency: layout.info.clone(),
            use_ssl_on_db_servers: config.use_ssl_on_db_servers,
            use_ssl_on_coordinators: config.use_ssl_on_coordinators,
            diagnostics: diagnostics.clone(),
        }));
    }

    commands.push(PlanCommand::BootstrapServers(BootstrapServers {
        db_servers: layout.db_server_urls.clone(),
        coordinators: layout.coordinator_urls.clone(),
    }));

    Ok(commands)
}
