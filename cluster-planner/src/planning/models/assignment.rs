use super::role::Role;
use crate::dispatcher::Port;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignedPorts {
    Agent { ext_port: Port, int_port: Port },
    Server { port: Port },
}

/// One placed process: which dispatcher runs it and on which port(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    role: Role,
    id: String,
    dispatcher: String,
    ports: AssignedPorts,
}

impl Assignment {
    pub fn new(role: Role, id: String, dispatcher: String, ports: AssignedPorts) -> Self {
        Self {
            role,
            id,
            dispatcher,
            ports,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dispatcher(&self) -> &str {
        &self.dispatcher
    }

    pub fn ports(&self) -> AssignedPorts {
        self.ports
    }

    /// Client-facing port: the external port for agents, the only port for
    /// servers.
    pub fn port(&self) -> Port {
        match self.ports {
            AssignedPorts::Agent { ext_port, .. } => ext_port,
            AssignedPorts::Server { port } => port,
        }
    }

    /// Every port this assignment holds on its dispatcher.
    pub fn all_ports(&self) -> Vec<Port> {
        match self.ports {
            AssignedPorts::Agent { ext_port, int_port } => vec![ext_port, int_port],
            AssignedPorts::Server { port } => vec![port],
        }
    }
}

/// Result of placing one role. May hold fewer assignments than requested
/// when no dispatcher accepts the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    role: Role,
    requested: usize,
    assignments: Vec<Assignment>,
}

impl Allocation {
    pub fn new(role: Role, requested: usize) -> Self {
        Self {
            role,
            requested,
            assignments: Vec::with_capacity(requested),
        }
    }

    pub fn push(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.assignments.len() >= self.requested
    }

    pub fn ids(&self) -> Vec<String> {
        self.assignments.iter().map(|a| a.id.clone()).collect()
    }

    pub fn on_dispatcher<'a>(&'a self, dispatcher: &'a str) -> impl Iterator<Item = &'a Assignment> {
        self.assignments
            .iter()
            .filter(move |a| a.dispatcher == dispatcher)
    }

    pub fn shortfall(&self) -> Option<Shortfall> {
        (!self.is_complete()).then(|| Shortfall {
            role: self.role,
            requested: self.requested,
            allocated: self.assignments.len(),
        })
    }
}

/// A role that could not be placed as often as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub role: Role,
    pub requested: usize,
    pub allocated: usize,
}
