use thiserror::Error;

/// Everything that can stop a planning run.
///
/// There is no partial success: any of these aborts the run before a plan is
/// produced.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// The configuration has the wrong shape or an unusable value.
    #[error("Configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    /// An endpoint string could not be parsed.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// A dispatcher answered the port check with something other than 200.
    #[error("Dispatcher '{dispatcher}' rejected port check for {port} with status {status}")]
    RemoteProbe {
        dispatcher: String,
        port: u16,
        status: u16,
    },

    /// Connection failure, timeout or undecodable body while probing.
    #[error("Port check against dispatcher '{dispatcher}' failed: {source}")]
    Transport {
        dispatcher: String,
        source: reqwest::Error,
    },

    /// Every port of the usable range was rejected for this dispatcher.
    #[error("No free port left on dispatcher '{dispatcher}'")]
    PortsExhausted { dispatcher: String },

    /// An allocation refers to state the planner never created.
    #[error("Internal planner error: {0}")]
    Internal(String),

    /// Reading a configuration file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration document is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Building the agency tree failed.
    #[error("Agency error: {0}")]
    Agency(#[from] planner_protocol::ProtocolError),
}

impl PlannerError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        PlannerError::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        PlannerError::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;
