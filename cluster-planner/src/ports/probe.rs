use crate::dispatcher::{Dispatcher, Port};
use crate::error::{PlannerError, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::net::TcpListener;
use std::time::Duration;

/// Timeout for a single remote port check.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Path a dispatcher serves its port check on.
pub const CHECK_PORT_PATH: &str = "/_admin/clusterCheckPort";

/// Answers whether a port is free on a dispatcher.
///
/// Implement this to plan against dispatchers without touching the network.
pub trait PortProbe {
    fn is_port_free(&self, dispatcher: &Dispatcher, port: Port) -> Result<bool>;
}

impl<P: PortProbe + ?Sized> PortProbe for &P {
    fn is_port_free(&self, dispatcher: &Dispatcher, port: Port) -> Result<bool> {
        (**self).is_port_free(dispatcher, port)
    }
}

impl<P: PortProbe + ?Sized> PortProbe for Box<P> {
    fn is_port_free(&self, dispatcher: &Dispatcher, port: Port) -> Result<bool> {
        (**self).is_port_free(dispatcher, port)
    }
}

/// Probes local dispatchers with a bind test and remote dispatchers over
/// HTTP.
pub struct NetworkProbe {
    client: Client,
}

impl NetworkProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| PlannerError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn check_local(port: Port) -> bool {
        TcpListener::bind(("0.0.0.0", port)).is_ok()
    }

    fn check_remote(&self, dispatcher: &Dispatcher, port: Port) -> Result<bool> {
        let endpoint = dispatcher.parsed_endpoint()?;
        let base = endpoint.clone().with_port(endpoint.port_or_default()).to_url();
        let url = format!("{}{}?port={}", base, CHECK_PORT_PATH, port);

        let mut request = self.client.get(&url);
        if let Some(username) = &dispatcher.username {
            request = request.basic_auth(username, dispatcher.passwd.as_ref());
        }

        let transport = |source| PlannerError::Transport {
            dispatcher: dispatcher.id.clone(),
            source,
        };

        let response = request.send().map_err(transport)?;
        if response.status() != StatusCode::OK {
            return Err(PlannerError::RemoteProbe {
                dispatcher: dispatcher.id.clone(),
                port,
                status: response.status().as_u16(),
            });
        }

        response.json::<bool>().map_err(transport)
    }
}

impl PortProbe for NetworkProbe {
    fn is_port_free(&self, dispatcher: &Dispatcher, port: Port) -> Result<bool> {
        let free = if dispatcher.is_local() {
            Self::check_local(port)
        } else {
            self.check_remote(dispatcher, port)?
        };
        debug!(
            "Port {} on dispatcher '{}' is {}",
            port,
            dispatcher.id,
            if free { "free" } else { "taken" }
        );
        Ok(free)
    }
}

/// Treats every port as free. Only the in-run avoid set prevents reuse.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProbe;

impl PortProbe for OfflineProbe {
    fn is_port_free(&self, _dispatcher: &Dispatcher, _port: Port) -> Result<bool> {
        Ok(true)
    }
}
