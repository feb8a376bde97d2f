use jvclink::{Error, ProjectorLink, DEFAULT_HOST, DEFAULT_PORT};
use tracing::{info, warn};

use crate::{Command, Feedback};

/// Projector address used when a `Connect` request names none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn command_feedback(name: &str, result: Result<(), Error>) -> Feedback {
    match result {
        Ok(()) => Feedback::ok(format!("{} Sent", name)),
        Err(Error::NotConnected) => Feedback::failed("Not connected"),
        Err(e) => {
            warn!(command = name, "{}", e);
            Feedback::failed(format!("Failed to Send {}", name))
        }
    }
}

/// Runs one client request against the session.
///
/// A `Connect` with a host or port replaces the remembered endpoint.
pub async fn dispatch(link: &mut ProjectorLink, endpoint: &mut Endpoint, cmd: Command) -> Feedback {
    match cmd {
        Command::Connect { host, port } => {
            if let Some(host) = host {
                endpoint.host = host;
            }
            if let Some(port) = port {
                endpoint.port = port;
            }

            info!(%endpoint, "connecting");
            match link.connect(&endpoint.host, endpoint.port).await {
                Ok(()) => Feedback::ok("Connected to Projector"),
                Err(e) => {
                    warn!(%endpoint, "connection failed: {}", e);
                    Feedback::failed("Connection Failed")
                }
            }
        }
        Command::Disconnect => {
            link.disconnect().await;
            Feedback::ok("Disconnected")
        }
        Command::Operate { command } => {
            let result = link.send_operating_command(command).await;
            command_feedback(command.label(), result)
        }
        Command::Remote { command } => {
            let result = link.send_remote_control_command(command).await;
            command_feedback(command.name(), result)
        }
        Command::Status => match link.peer() {
            Some(peer) if link.is_connected() => Feedback::ok(format!("Connected to {}", peer)),
            _ => Feedback::failed("Not connected"),
        },
    }
}
