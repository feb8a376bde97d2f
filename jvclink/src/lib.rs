//! Client for the line-oriented network control protocol spoken by JVC D-ILA
//! projectors on TCP port 20554.
//!
//! A [`ProjectorLink`] owns at most one connection. It performs the `PJREQ`
//! handshake, sends hex-packed [`OperatingCommand`]s and
//! [`RemoteControlCommand`]s and decodes the projector's replies for logging.

mod command;
mod frame;
mod link;

pub use command::{hex_pack, OperatingCommand, RemoteControlCommand};
pub use frame::{ResponseFrame, ACK, FRAME_BUFFER_SIZE, TERMINATOR};
pub use link::{LinkConfig, ProjectorLink, State, Transport};

use std::time::Duration;

pub const DEFAULT_HOST: &str = "10.0.0.33";
pub const DEFAULT_PORT: u16 = 20554;
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("connection timeout after {0:?}")]
    Timeout(Duration),
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),
    #[error("handshake failed: expected {expected} but got {received:?}")]
    Handshake {
        expected: &'static str,
        received: String,
    },
    #[error("not connected to the projector")]
    NotConnected,
    #[error("no data received")]
    EmptyResponse,
    #[error("invalid hex payload {input:?}: {source}")]
    InvalidHex {
        input: String,
        #[source]
        source: hex::FromHexError,
    },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl Error {
    /// Whether the transport is gone after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ResponseTimeout(_)
                | Error::NotConnected
                | Error::InvalidHex { .. }
                | Error::UnknownCommand(_)
        )
    }
}
