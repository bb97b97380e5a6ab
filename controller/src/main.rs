use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cluster_planner::{
    Dispatcher, NetworkProbe, OfflineProbe, Plan, Planner, PlannerConfig, PortProbe,
};
use log::{info, warn};
use planner_protocol::AgencyNode;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cluster-controller")]
#[command(about = "Plans the startup of an agency/coordinator/DB server cluster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a cluster and write the command list as JSON
    Plan {
        /// Path to the cluster configuration JSON file
        #[arg(short, long)]
        config: PathBuf,
        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Seed for the random port search
        #[arg(long)]
        seed: Option<u64>,
        /// Do not probe ports, assume every port is free
        #[arg(long)]
        offline: bool,
        /// Fail if a role could not be placed as often as requested
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        pretty: bool,
    },
    /// Print the default configuration
    Defaults,
    /// Ask a dispatcher whether a port is free
    CheckPort {
        /// Dispatcher endpoint, e.g. tcp://10.0.0.5:8529
        #[arg(short, long)]
        endpoint: String,
        #[arg(short, long)]
        port: u16,
        #[arg(long, requires = "password")]
        username: Option<String>,
        #[arg(long, requires = "username")]
        password: Option<String>,
    },
    /// Plan a cluster and print where each process lands
    Summary {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        offline: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            config,
            output,
            seed,
            offline,
            strict,
            pretty,
        } => {
            let plan = run_planner(&config, offline, seed)?;
            if strict && !plan.is_complete() {
                for shortfall in plan.shortfalls() {
                    eprintln!(
                        "ERROR: placed {} of {} {}(s)",
                        shortfall.allocated, shortfall.requested, shortfall.role
                    );
                }
                bail!("plan is incomplete");
            }

            let json = if pretty {
                plan.to_json_pretty()?
            } else {
                serde_json::to_string(&plan).context("Failed to serialize plan")?
            };
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Plan written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Defaults => {
            println!("{}", PlannerConfig::default().to_json_pretty()?);
        }
        Commands::CheckPort {
            endpoint,
            port,
            username,
            password,
        } => {
            let mut dispatcher = Dispatcher::new("check-port", &endpoint);
            if let (Some(username), Some(password)) = (&username, &password) {
                dispatcher = dispatcher.with_credentials(username, password);
            }
            dispatcher.validate().context("Invalid endpoint")?;

            let probe = NetworkProbe::new()?;
            let free = probe
                .is_port_free(&dispatcher, port)
                .with_context(|| format!("Port check against {} failed", endpoint))?;
            println!(
                "Port {} on {} is {}",
                port,
                endpoint,
                if free { "FREE" } else { "BUSY" }
            );
        }
        Commands::Summary {
            config,
            offline,
            seed,
        } => {
            let plan = run_planner(&config, offline, seed)?;
            print_summary(&plan);
        }
    }

    Ok(())
}

fn run_planner(path: &Path, offline: bool, seed: Option<u64>) -> Result<Plan> {
    let config = PlannerConfig::load(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;

    let probe: Box<dyn PortProbe> = if offline {
        warn!("Offline mode, ports are not checked");
        Box::new(OfflineProbe)
    } else {
        Box::new(NetworkProbe::new()?)
    };

    let mut planner = Planner::with_probe(config, probe).context("Invalid configuration")?;
    if let Some(seed) = seed {
        planner = planner.with_seed(seed);
    }
    planner.plan().context("Planning failed")
}

fn print_summary(plan: &Plan) {
    let (agents, endpoints) = match plan.configuration() {
        Some(cfg) => {
            let path = format!("{}/Dispatcher/Endpoints", cfg.agency.agency_prefix);
            let endpoints = cfg
                .data
                .get_path(&path)
                .and_then(AgencyNode::children)
                .cloned()
                .unwrap_or_default();
            (cfg.agency.endpoints.clone(), endpoints)
        }
        None => (Vec::new(), Default::default()),
    };

    println!(
        "{:<12} | {:<16} | {:<16} | {:<28}",
        "ROLE", "ID", "DISPATCHER", "ENDPOINT"
    );
    println!("{:-<12}-+-{:-<16}-+-{:-<16}-+-{:-<28}", "", "", "", "");

    for (index, agent) in plan.agents().enumerate() {
        let endpoint = agents.get(index).map(String::as_str).unwrap_or("?");
        println!(
            "{:<12} | {:<16} | {:<16} | {:<28}",
            "agent",
            format!("#{} (int {})", index, agent.int_port),
            agent.dispatcher,
            endpoint
        );
    }

    for launch in plan.server_launches() {
        let roles = launch
            .coordinators
            .iter()
            .map(|id| ("coordinator", id))
            .chain(launch.db_servers.iter().map(|id| ("DB server", id)));
        for (role, id) in roles {
            let endpoint = endpoints.get(id).and_then(AgencyNode::as_leaf).unwrap_or("?");
            println!(
                "{:<12} | {:<16} | {:<16} | {:<28}",
                role, id, launch.dispatcher, endpoint
            );
        }
    }

    for shortfall in plan.shortfalls() {
        println!(
            "WARNING: placed {} of {} {}(s)",
            shortfall.allocated, shortfall.requested, shortfall.role
        );
    }
}
