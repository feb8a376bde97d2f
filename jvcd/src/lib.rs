use jvclink::{OperatingCommand, RemoteControlCommand};

mod client;
mod dispatch;
mod server;

pub use client::request;
pub use dispatch::{dispatch, Endpoint};
pub use server::{handle_client, Session};

pub const DEFAULT_SOCKET_PATH: &str = "/run/jvcd/socket";

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize, clap::Subcommand)]
pub enum Command {
    /// Connect to the projector, replacing any open connection
    Connect {
        /// Projector address, defaults to the one the daemon was started with
        host: Option<String>,
        #[clap(long, short)]
        port: Option<u16>,
    },
    Disconnect,
    /// POWER_ON, POWER_OFF, HDMI_1 or HDMI_2
    Operate { command: OperatingCommand },
    /// Remote control button, e.g. MENU, UP, OK, BACK, CINEMA
    Remote { command: RemoteControlCommand },
    Status,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct SocketPayload {
    pub cmd: Command,
}

/// Status text returned to the client for every request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Feedback {
    pub ok: bool,
    pub text: String,
}

impl Feedback {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
