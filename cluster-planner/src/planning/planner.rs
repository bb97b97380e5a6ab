use super::agency::AgencyBuilder;
use super::allocator::RoleAllocator;
use super::models::{Allocation, Role};
use super::sequencer;
use crate::config::PlannerConfig;
use crate::dispatcher::detect_ip_collisions;
use crate::error::Result;
use crate::plan::Plan;
use crate::ports::{NetworkProbe, PortProbe};
use log::{info, log, warn, Level};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Single-shot cluster planner.
///
/// Runs synchronously to completion: validation, collision pre-pass, role
/// placement, agency construction and command sequencing. Ports are claimed
/// strictly one after another, which is what keeps them unique per
/// dispatcher.
pub struct Planner<P = NetworkProbe> {
    config: PlannerConfig,
    probe: P,
    rng: StdRng,
}

impl Planner<NetworkProbe> {
    /// Planner that checks ports on the real dispatchers.
    pub fn new(config: PlannerConfig) -> Result<Self> {
        Self::with_probe(config, NetworkProbe::new()?)
    }
}

impl<P: PortProbe> Planner<P> {
    /// Fails on configuration errors before any port is probed.
    pub fn with_probe(config: PlannerConfig, probe: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            probe,
            rng: StdRng::from_entropy(),
        })
    }

    /// Makes the random fallback port search reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn plan(self) -> Result<Plan> {
        let Planner {
            mut config,
            probe,
            mut rng,
        } = self;
        let level = if config.extreme_verbosity {
            Level::Info
        } else {
            Level::Debug
        };

        let mut dispatchers = std::mem::take(&mut config.dispatchers);
        let shared_hosts = detect_ip_collisions(&mut dispatchers)?;
        log!(level, "{} host(s) shared by several dispatchers", shared_hosts);

        info!(
            "Planning {} agent(s), {} coordinator(s), {} DB server(s) on {} dispatcher(s)",
            config.number_of_agents,
            config.number_of_coordinators,
            config.number_of_db_servers,
            dispatchers.len()
        );

        let mut allocator = RoleAllocator::new(&mut dispatchers, &probe, &mut rng);
        let agents = allocator.allocate(
            Role::Agent,
            config.number_of_agents,
            &[
                config.agent_ext_ports.as_slice(),
                config.agent_int_ports.as_slice(),
            ],
            &mut Vec::new(),
        )?;
        let coordinators = allocator.allocate(
            Role::Coordinator,
            config.number_of_coordinators,
            &[config.coordinator_ports.as_slice()],
            &mut config.coordinator_ids,
        )?;
        let db_servers = allocator.allocate(
            Role::DbServer,
            config.number_of_db_servers,
            &[config.db_server_ports.as_slice()],
            &mut config.db_server_ids,
        )?;

        for allocation in [&agents, &coordinators, &db_servers] {
            log_placement(level, allocation);
        }

        let layout = AgencyBuilder::new(&config, &dispatchers).build(
            &agents,
            &coordinators,
            &db_servers,
        )?;
        layout.check_complete()?;

        let commands = sequencer::sequence(&config, &dispatchers, &agents, &layout)?;

        let shortfalls: Vec<_> = [&agents, &coordinators, &db_servers]
            .into_iter()
            .filter_map(Allocation::shortfall)
            .collect();
        for shortfall in &shortfalls {
            warn!(
                "Only {} of {} {}(s) could be placed",
                shortfall.allocated, shortfall.requested, shortfall.role
            );
        }

        info!("Plan ready with {} command(s)", commands.len());
        Ok(Plan::new(dispatchers, commands, shortfalls))
    }
}

fn log_placement(level: Level, allocation: &Allocation) {
    for assignment in allocation.assignments() {
        log!(
            level,
            "{} '{}' on '{}' ports {:?}",
            assignment.role(),
            assignment.id(),
            assignment.dispatcher(),
            assignment.all_ports()
        );
    }
}
