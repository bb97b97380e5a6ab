use cluster_planner::{
    Dispatcher, OfflineProbe, Plan, Planner, PlannerConfig, PlannerError, Port, PortProbe, Role,
};
use planner_protocol::{AgencyNode, PlanCommand};
use serde_json::json;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Probe that treats a fixed set of (dispatcher, port) pairs as busy and
/// counts how often it is asked.
#[derive(Default)]
struct MockProbe {
    busy: HashSet<(String, Port)>,
    calls: RefCell<usize>,
}

impl MockProbe {
    fn busy(pairs: &[(&str, Port)]) -> Self {
        Self {
            busy: pairs.iter().map(|(d, p)| (d.to_string(), *p)).collect(),
            calls: RefCell::new(0),
        }
    }
}

impl PortProbe for MockProbe {
    fn is_port_free(&self, dispatcher: &Dispatcher, port: Port) -> cluster_planner::Result<bool> {
        *self.calls.borrow_mut() += 1;
        Ok(!self.busy.contains(&(dispatcher.id.clone(), port)))
    }
}

/// Behaves like a dispatcher whose port check answers 500.
struct BrokenDispatcher;

impl PortProbe for BrokenDispatcher {
    fn is_port_free(&self, dispatcher: &Dispatcher, port: Port) -> cluster_planner::Result<bool> {
        Err(PlannerError::RemoteProbe {
            dispatcher: dispatcher.id.clone(),
            port,
            status: 500,
        })
    }
}

fn plan_with<P: PortProbe>(config: serde_json::Value, probe: P) -> Plan {
    init_logger();
    let config = PlannerConfig::from_value(config).unwrap();
    Planner::with_probe(config, probe)
        .unwrap()
        .with_seed(42)
        .plan()
        .unwrap()
}

/// (dispatcher, port) of every port the plan hands out.
fn claimed_ports(plan: &Plan) -> Vec<(String, Port)> {
    let mut claimed = Vec::new();
    for agent in plan.agents() {
        claimed.push((agent.dispatcher.clone(), agent.ext_port));
        claimed.push((agent.dispatcher.clone(), agent.int_port));
    }
    let endpoints = plan
        .configuration()
        .and_then(|c| c.data.get_path("arango/Dispatcher/Endpoints"))
        .and_then(AgencyNode::children)
        .cloned()
        .unwrap_or_default();
    for launch in plan.server_launches() {
        for id in launch.db_servers.iter().chain(&launch.coordinators) {
            let endpoint = endpoints[id].as_leaf().unwrap();
            let port: Port = endpoint.rsplit(':').next().unwrap().parse().unwrap();
            claimed.push((launch.dispatcher.clone(), port));
        }
    }
    claimed
}

#[test]
fn test_scenario_single_local_dispatcher() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 1,
            "numberOfCoordinators": 1,
            "numberOfDBservers": 2,
            "dispatchers": { "me": { "endpoint": "tcp://localhost:", "id": "me" } }
        }),
        OfflineProbe,
    );

    let actions: Vec<&str> = plan.commands().iter().map(PlanCommand::action).collect();
    assert_eq!(
        actions,
        vec!["startAgent", "sendConfiguration", "startServers", "bootstrapServers"]
    );

    let agent = plan.agents().next().unwrap();
    assert!(agent.peers.is_empty());
    assert_eq!(agent.ext_port, 4001);
    assert_eq!(agent.int_port, 7001);

    let servers = plan.servers_on("me").unwrap();
    assert_eq!(servers.db_servers, vec!["Pavel", "Perry"]);
    assert_eq!(servers.coordinators, vec!["Claus"]);
    assert_eq!(servers.agency.endpoints, vec!["tcp://localhost:4001"]);

    let bootstrap = plan.bootstrap().unwrap();
    assert_eq!(bootstrap.coordinators, vec!["http://localhost:8530"]);
    assert_eq!(
        bootstrap.db_servers,
        vec!["http://localhost:8629", "http://localhost:8630"]
    );
    assert!(plan.is_complete());
}

#[test]
fn test_scenario_colocated_dispatchers_shift_ports() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 2,
            "numberOfCoordinators": 0,
            "numberOfDBservers": 0,
            "agentExtPorts": [4001],
            "dispatchers": {
                "first": { "endpoint": "tcp://10.0.0.5:8529" },
                "second": { "endpoint": "tcp://10.0.0.5:8530" }
            }
        }),
        OfflineProbe,
    );

    assert_eq!(plan.dispatchers()["first"].port_overlap_index(), Some(0));
    assert_eq!(plan.dispatchers()["second"].port_overlap_index(), Some(1));

    let agents: Vec<_> = plan.agents().collect();
    assert_eq!(agents[0].dispatcher, "first");
    assert_eq!(agents[0].ext_port, 4001);
    assert_eq!(agents[1].dispatcher, "second");
    assert_eq!(agents[1].ext_port, 4021);
    assert_eq!(agents[1].int_port, 7021);
}

#[test]
fn test_scenario_disallowed_dispatcher_gets_no_coordinators() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 1,
            "numberOfCoordinators": 3,
            "numberOfDBservers": 0,
            "dispatchers": {
                "closed": { "endpoint": "tcp://10.0.0.1:8529", "allowCoordinators": false },
                "open": { "endpoint": "tcp://10.0.0.2:8529" }
            }
        }),
        OfflineProbe,
    );

    assert!(plan.servers_on("closed").unwrap().coordinators.is_empty());
    assert_eq!(
        plan.servers_on("open").unwrap().coordinators,
        vec!["Claus", "Chantalle", "Claire"]
    );
    assert_eq!(plan.bootstrap().unwrap().coordinators.len(), 3);
}

#[test]
fn test_scenario_ssl_coordinator_url() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 1,
            "numberOfCoordinators": 1,
            "numberOfDBservers": 1,
            "useSSLonCoordinators": true,
            "dispatchers": { "d": { "endpoint": "tcp://host:8529" } }
        }),
        OfflineProbe,
    );

    let bootstrap = plan.bootstrap().unwrap();
    assert_eq!(bootstrap.coordinators, vec!["https://host:8530"]);
    assert_eq!(bootstrap.db_servers, vec!["http://host:8629"]);

    let data = &plan.configuration().unwrap().data;
    assert_eq!(
        data.get_path("arango/Dispatcher/Endpoints/Claus")
            .and_then(AgencyNode::as_leaf),
        Some("ssl://host:8530")
    );
}

#[test]
fn test_no_port_is_reused_on_a_dispatcher() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 3,
            "numberOfCoordinators": 4,
            "numberOfDBservers": 5,
            // Overlapping candidate lists force the avoid set to do its job.
            "agentExtPorts": [5000, 5001],
            "agentIntPorts": [5000, 5001, 5002],
            "coordinatorPorts": [5001, 5002, 5003],
            "DBserverPorts": [5002],
            "dispatchers": {
                "a": { "endpoint": "tcp://10.0.0.1:8529" },
                "b": { "endpoint": "tcp://10.0.0.2:8529" }
            }
        }),
        MockProbe::busy(&[("a", 5003), ("b", 5004)]),
    );

    let claimed = claimed_ports(&plan);
    assert_eq!(claimed.len(), 3 * 2 + 4 + 5);
    let unique: HashSet<_> = claimed.iter().cloned().collect();
    assert_eq!(unique.len(), claimed.len(), "duplicate port in {:?}", claimed);
    assert!(!unique.contains(&("a".to_string(), 5003)));
    assert!(!unique.contains(&("b".to_string(), 5004)));

    for (dispatcher, port) in &claimed {
        assert!(plan.dispatchers()[dispatcher.as_str()]
            .avoid_ports()
            .contains(port));
    }
}

#[test]
fn test_round_robin_visits_every_dispatcher_first() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 0,
            "numberOfCoordinators": 0,
            "numberOfDBservers": 3,
            "dispatchers": {
                "a": { "endpoint": "tcp://10.0.0.1:8529" },
                "b": { "endpoint": "tcp://10.0.0.2:8529" },
                "c": { "endpoint": "tcp://10.0.0.3:8529" }
            }
        }),
        OfflineProbe,
    );

    let mut per_dispatcher = HashMap::new();
    for launch in plan.server_launches() {
        per_dispatcher.insert(launch.dispatcher.clone(), launch.db_servers.len());
    }
    assert!(per_dispatcher.values().all(|&n| n == 1), "{:?}", per_dispatcher);
}

#[test]
fn test_agency_lists_an_endpoint_for_every_launched_server() {
    let plan = plan_with(
        json!({
            "numberOfCoordinators": 2,
            "numberOfDBservers": 3,
            "dispatchers": {
                "a": { "endpoint": "tcp://10.0.0.1:8529" },
                "b": { "endpoint": "tcp://10.0.0.2:8529", "allowDBservers": false }
            }
        }),
        OfflineProbe,
    );

    let data = &plan.configuration().unwrap().data;
    let launchers = data
        .get_path("arango/Dispatcher/Launchers")
        .and_then(AgencyNode::children)
        .unwrap();
    let endpoints = data
        .get_path("arango/Dispatcher/Endpoints")
        .and_then(AgencyNode::children)
        .unwrap();

    assert_eq!(launchers.len(), 2);
    for launcher in launchers.values() {
        let entry: serde_json::Value = serde_json::from_str(launcher.as_leaf().unwrap()).unwrap();
        for key in ["DBservers", "Coordinators"] {
            for id in entry[key].as_array().unwrap() {
                assert!(endpoints.contains_key(id.as_str().unwrap()), "{} missing", id);
            }
        }
    }
    assert_eq!(endpoints.len(), 5);
}

#[test]
fn test_command_order_holds_for_larger_clusters() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 3,
            "numberOfCoordinators": 2,
            "numberOfDBservers": 2,
            "dispatchers": {
                "a": { "endpoint": "tcp://10.0.0.1:8529" },
                "b": { "endpoint": "tcp://10.0.0.2:8529" },
                "c": { "endpoint": "tcp://10.0.0.3:8529" }
            }
        }),
        OfflineProbe,
    );

    let rank = |cmd: &PlanCommand| match cmd {
        PlanCommand::StartAgent(_) => 0,
        PlanCommand::SendConfiguration(_) => 1,
        PlanCommand::StartServers(_) => 2,
        PlanCommand::BootstrapServers(_) => 3,
    };
    let ranks: Vec<u8> = plan.commands().iter().map(rank).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "{:?}", ranks);
    assert_eq!(ranks.iter().filter(|&&r| r == 1).count(), 1);
    assert_eq!(ranks.iter().filter(|&&r| r == 3).count(), 1);
    assert_eq!(ranks.last(), Some(&3));
    assert_eq!(ranks.iter().filter(|&&r| r == 2).count(), 3);
}

#[test]
fn test_agent_peers_reference_earlier_agents() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 4,
            "numberOfCoordinators": 0,
            "numberOfDBservers": 0,
            "dispatchers": {
                "a": { "endpoint": "tcp://10.0.0.1:8529" },
                "b": { "endpoint": "tcp://10.0.0.2:8529" }
            }
        }),
        OfflineProbe,
    );

    let agents: Vec<_> = plan.agents().collect();
    let internal: Vec<String> = agents
        .iter()
        .map(|a| {
            let host = match a.dispatcher.as_str() {
                "a" => "10.0.0.1",
                _ => "10.0.0.2",
            };
            format!("{}:{}", host, a.int_port)
        })
        .collect();

    for (k, agent) in agents.iter().enumerate() {
        assert_eq!(agent.peers.len(), k);
        assert_eq!(agent.peers, internal[..k].to_vec());
    }

    let agency = &plan.configuration().unwrap().agency;
    assert_eq!(agency.endpoints.len(), 4);
    assert_eq!(agency.endpoints[0], "tcp://10.0.0.1:4001");
    assert_eq!(agency.endpoints[1], "tcp://10.0.0.2:4001");
    assert_eq!(agency.endpoints[2], "tcp://10.0.0.1:4002");
}

#[test]
fn test_shortfall_is_reported_when_no_dispatcher_accepts_a_role() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 2,
            "dispatchers": {
                "a": { "endpoint": "tcp://10.0.0.1:8529", "allowAgents": false }
            }
        }),
        OfflineProbe,
    );

    assert!(!plan.is_complete());
    assert_eq!(plan.shortfalls().len(), 1);
    assert_eq!(plan.shortfalls()[0].role, Role::Agent);
    assert_eq!(plan.shortfalls()[0].requested, 2);
    assert_eq!(plan.shortfalls()[0].allocated, 0);
    assert_eq!(plan.agents().count(), 0);

    let json: serde_json::Value = serde_json::from_str(&plan.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["shortfalls"][0]["allocated"], 0);
}

#[test]
fn test_complete_plan_serializes_without_shortfalls() {
    let plan = plan_with(json!({}), OfflineProbe);
    let json: serde_json::Value = serde_json::to_value(&plan).unwrap();

    assert!(json.get("shortfalls").is_none());
    assert_eq!(json["commands"][0]["action"], "startAgent");
    assert_eq!(json["dispatchers"]["me"]["id"], "me");
    assert_eq!(json["dispatchers"]["me"]["avoidPorts"], json!([4001, 7001, 8530, 8629, 8630]));
}

#[test]
fn test_busy_ports_are_skipped() {
    let probe = MockProbe::busy(&[("me", 8530), ("me", 8531)]);
    let plan = plan_with(
        json!({
            "numberOfAgents": 0,
            "numberOfCoordinators": 1,
            "numberOfDBservers": 0,
            "dispatchers": { "me": { "endpoint": "tcp://localhost:" } }
        }),
        probe,
    );
    assert_eq!(
        plan.bootstrap().unwrap().coordinators,
        vec!["http://localhost:8532"]
    );
}

#[test]
fn test_remote_probe_failure_aborts_planning() {
    init_logger();
    let config = PlannerConfig::from_value(json!({
        "dispatchers": { "far": { "endpoint": "tcp://10.9.9.9:8529" } }
    }))
    .unwrap();

    let err = Planner::with_probe(config, BrokenDispatcher)
        .unwrap()
        .plan()
        .unwrap_err();
    assert!(matches!(err, PlannerError::RemoteProbe { status: 500, .. }));
}

#[test]
fn test_invalid_dispatcher_fails_before_probing() {
    let config = PlannerConfig::from_value(json!({
        "dispatchers": { "broken": { "allowAgents": true } }
    }))
    .unwrap();

    let probe = MockProbe::default();
    let result = Planner::with_probe(config, &probe);
    assert!(matches!(result, Err(PlannerError::Config { .. })));
    assert_eq!(*probe.calls.borrow(), 0);
}

#[test]
fn test_generated_ids_extend_configured_ones() {
    let plan = plan_with(
        json!({
            "numberOfAgents": 0,
            "numberOfCoordinators": 2,
            "numberOfDBservers": 2,
            "coordinatorIDs": ["Only"],
            "DBserverIDs": []
        }),
        OfflineProbe,
    );

    let servers = plan.servers_on("me").unwrap();
    assert_eq!(servers.coordinators, vec!["Only", "Coordinator1"]);
    assert_eq!(servers.db_servers, vec!["Primary0", "Primary1"]);
}

#[test]
fn test_same_seed_gives_same_plan() {
    let config = json!({
        "numberOfAgents": 2,
        "agentExtPorts": [],
        "agentIntPorts": [],
        "dispatchers": { "d": { "endpoint": "tcp://10.0.0.1:8529" } }
    });
    let first = plan_with(config.clone(), OfflineProbe);
    let second = plan_with(config, OfflineProbe);
    assert_eq!(first, second);
    assert!(first.agents().all(|a| a.ext_port >= 1024 && a.int_port >= 1024));
}

fn rejected_field(config: serde_json::Value) -> (String, usize) {
    let config = PlannerConfig::from_value(config).unwrap();
    let probe = MockProbe::default();
    let field = match Planner::with_probe(config, &probe) {
        Err(PlannerError::Config { field, .. }) => field,
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("configuration was accepted"),
    };
    let calls = *probe.calls.borrow();
    (field, calls)
}

#[test]
fn test_empty_server_id_is_rejected() {
    let (field, calls) = rejected_field(json!({
        "numberOfCoordinators": 1,
        "coordinatorIDs": [""]
    }));
    assert_eq!(field, "coordinatorIDs");
    assert_eq!(calls, 0);
}

#[test]
fn test_server_id_with_slash_is_rejected_before_probing() {
    let (field, calls) = rejected_field(json!({
        "numberOfCoordinators": 2,
        "coordinatorIDs": ["a/b", "a"]
    }));
    assert_eq!(field, "coordinatorIDs");
    assert_eq!(calls, 0);
}

#[test]
fn test_server_id_shared_by_both_roles_is_rejected() {
    let (field, calls) = rejected_field(json!({
        "numberOfCoordinators": 1,
        "numberOfDBservers": 1,
        "coordinatorIDs": ["Twin"],
        "DBserverIDs": ["Twin"]
    }));
    assert_eq!(field, "DBserverIDs");
    assert_eq!(calls, 0);
}

#[test]
fn test_unused_server_ids_are_not_checked() {
    let plan = plan_with(
        json!({
            "numberOfCoordinators": 1,
            "coordinatorIDs": ["Claus", "", "x/y"]
        }),
        OfflineProbe,
    );
    assert_eq!(plan.servers_on("me").unwrap().coordinators, vec!["Claus"]);

    let endpoints = plan
        .configuration()
        .and_then(|c| c.data.get_path("arango/Dispatcher/Endpoints"))
        .and_then(AgencyNode::children)
        .unwrap();
    assert_eq!(endpoints.len(), 3);
}
