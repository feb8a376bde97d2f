use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::frame::{FrameBuffer, ResponseFrame, FRAME_BUFFER_SIZE};
use crate::{Error, OperatingCommand, RemoteControlCommand, DEFAULT_HANDSHAKE_TIMEOUT};

const HANDSHAKE_REQUEST: &[u8] = b"PJREQ";
const HANDSHAKE_OK: &str = "PJ_OK";
const HANDSHAKE_ACK: &str = "PJACK";
const HANDSHAKE_COMBINED: &str = "PJ_OKPJACK";

/// Byte stream a [`ProjectorLink`] can run over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Handshaking,
    Ready,
}

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Bound on TCP connect plus the `PJREQ` exchange.
    pub handshake_timeout: Duration,
    /// Bound on waiting for a command reply. `None` waits until data or EOF.
    pub response_timeout: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            response_timeout: None,
        }
    }
}

struct Connection<S> {
    stream: S,
    frames: FrameBuffer,
    peer: Option<String>,
}

/// A control session with one projector.
///
/// Methods take `&mut self`, so callers are serialized: one command is in
/// flight at a time and its reply is read before the next one can be sent.
pub struct ProjectorLink<S = TcpStream> {
    conn: Option<Connection<S>>,
    state: State,
    config: LinkConfig,
}

impl<S> Default for ProjectorLink<S> {
    fn default() -> Self {
        Self::with_config(LinkConfig::default())
    }
}

impl<S> ProjectorLink<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LinkConfig) -> Self {
        Self {
            conn: None,
            state: State::Disconnected,
            config,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Ready && self.conn.is_some()
    }

    /// Endpoint of the live connection, when it was opened by address.
    pub fn peer(&self) -> Option<&str> {
        self.conn.as_ref().and_then(|conn| conn.peer.as_deref())
    }
}

impl ProjectorLink<TcpStream> {
    /// Opens a TCP connection to `host:port` and performs the handshake.
    ///
    /// Any previous connection is closed first.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.disconnect().await;
        self.state = State::Handshaking;

        let limit = self.config.handshake_timeout;
        let result = tokio::time::timeout(limit, async {
            let stream = TcpStream::connect((host, port)).await?;
            info!(host, port, "connected to projector");
            self.open(stream, Some(format!("{}:{}", host, port)));
            self.handshake().await
        })
        .await;

        self.finish_handshake(result, limit).await
    }
}

impl<S: Transport> ProjectorLink<S> {
    /// Performs the handshake over an already open transport.
    pub async fn connect_stream(&mut self, stream: S) -> Result<(), Error> {
        self.disconnect().await;
        self.state = State::Handshaking;
        self.open(stream, None);

        let limit = self.config.handshake_timeout;
        let result = tokio::time::timeout(limit, self.handshake()).await;

        self.finish_handshake(result, limit).await
    }

    fn open(&mut self, stream: S, peer: Option<String>) {
        self.conn = Some(Connection {
            stream,
            frames: FrameBuffer::default(),
            peer,
        });
    }

    async fn finish_handshake(
        &mut self,
        result: Result<Result<(), Error>, tokio::time::error::Elapsed>,
        limit: Duration,
    ) -> Result<(), Error> {
        let err = match result {
            Ok(Ok(())) => {
                self.state = State::Ready;
                return Ok(());
            }
            Ok(Err(e)) => e,
            Err(_) => Error::Timeout(limit),
        };

        warn!("connection error: {}", err);
        self.disconnect().await;
        Err(err)
    }

    async fn handshake(&mut self) -> Result<(), Error> {
        self.write(HANDSHAKE_REQUEST).await?;
        debug!("sent PJREQ, waiting for PJ_OK");

        let first = self.read_frame().await?;
        let first = String::from_utf8_lossy(&first);
        if !first.contains(HANDSHAKE_COMBINED) {
            info!("handshake handled in one packet");
            return Ok(());
        }

        if !first.contains(HANDSHAKE_OK) {
            return Err(Error::Handshake {
                expected: HANDSHAKE_OK,
                received: first.into_owned(),
            });
        }
        debug!("received PJ_OK, waiting for PJACK");

        let second = self.read_frame().await?;
        let second = String::from_utf8_lossy(&second);
        if !second.contains(HANDSHAKE_ACK) {
            return Err(Error::Handshake {
                expected: HANDSHAKE_ACK,
                received: second.into_owned(),
            });
        }

        info!("handshake successful");
        Ok(())
    }

    /// Sends `21 89 01 <code> <data> 0A` and waits for the reply.
    pub async fn send_operating_command(&mut self, command: OperatingCommand) -> Result<(), Error> {
        if !self.is_connected() {
            warn!(%command, "not connected to the projector");
            return Err(Error::NotConnected);
        }

        let payload = command.encode()?;
        self.exchange(&payload).await?;
        info!(%command, "sent operating command");
        Ok(())
    }

    /// Sends `21 89 01 52 43 <code> 0A` and waits for the reply.
    pub async fn send_remote_control_command(
        &mut self,
        command: RemoteControlCommand,
    ) -> Result<(), Error> {
        if !self.is_connected() {
            warn!(%command, "not connected to the projector");
            return Err(Error::NotConnected);
        }

        let payload = command.encode()?;
        self.exchange(&payload).await?;
        info!(%command, "sent remote control command");
        Ok(())
    }

    /// Writes `payload` and succeeds once any reply arrives.
    ///
    /// The reply's ACK/NAK byte is only logged. Transport failures drop the
    /// connection, a response timeout leaves it open.
    async fn exchange(&mut self, payload: &[u8]) -> Result<(), Error> {
        let result = match self.write(payload).await {
            Ok(()) => match self.config.response_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.read_frame()).await {
                    Ok(frame) => frame,
                    Err(_) => Err(Error::ResponseTimeout(limit)),
                },
                None => self.read_frame().await,
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(_frame) => Ok(()),
            Err(e) => {
                warn!("error sending command: {}", e);
                if e.is_fatal() {
                    self.disconnect().await;
                }
                Err(e)
            }
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let conn = self.conn.as_mut().ok_or(Error::NotConnected)?;
        debug!(raw = %hex::encode_upper(bytes), "sending");
        conn.stream.write_all(bytes).await?;
        conn.stream.flush().await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>, Error> {
        let conn = self.conn.as_mut().ok_or(Error::NotConnected)?;

        let frame = match conn.frames.next_buffered() {
            Some(frame) => frame,
            None => {
                let mut buf = [0u8; FRAME_BUFFER_SIZE];
                let n = conn.stream.read(&mut buf).await?;
                if n == 0 {
                    return Err(Error::EmptyResponse);
                }
                conn.frames.push(&buf[..n])
            }
        };

        debug!(response = %String::from_utf8_lossy(&frame), "received response");
        ResponseFrame::trace(&frame);
        Ok(frame)
    }

    /// Reads one reply frame. `None` when the read fails or the peer closed.
    pub async fn receive_frame(&mut self) -> Option<Vec<u8>> {
        match self.read_frame().await {
            Ok(frame) => Some(frame),
            Err(Error::EmptyResponse) => {
                debug!("no data received");
                None
            }
            Err(e) => {
                warn!("error reading response: {}", e);
                None
            }
        }
    }

    /// Closes the transport if one is open. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.state = State::Disconnected;
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        conn.frames.clear();
        match conn.stream.shutdown().await {
            Ok(()) => info!("connection closed"),
            Err(e) => warn!("error closing connection: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::{Builder, Mock};

    async fn ready(mock: Mock) -> ProjectorLink<Mock> {
        let mut link = ProjectorLink::new();
        link.connect_stream(mock).await.unwrap();
        assert_eq!(link.state(), State::Ready);
        link
    }

    #[tokio::test]
    async fn handshake_in_one_packet() {
        let mock = Builder::new().write(b"PJREQ").read(b"PJACK").build();
        let mut link = ready(mock).await;
        assert!(link.is_connected());
        assert_eq!(link.peer(), None);
        link.disconnect().await;
    }

    #[tokio::test]
    async fn combined_handshake_reads_second_frame() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJ_OKPJACK")
            .read(b"PJACK")
            .build();
        let mut link = ready(mock).await;
        link.disconnect().await;
    }

    #[tokio::test]
    async fn combined_handshake_without_ack_fails() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJ_OKPJACK")
            .read(b"PJNAK")
            .build();
        let mut link = ProjectorLink::new();
        let err = link.connect_stream(mock).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Handshake {
                expected: "PJACK",
                ..
            }
        ));
        assert_eq!(link.state(), State::Disconnected);
        assert!(!link.is_connected());
    }

    #[tokio::test]
    async fn combined_handshake_with_closed_second_read_fails() {
        let mock = Builder::new().write(b"PJREQ").read(b"PJ_OKPJACK").build();
        let mut link = ProjectorLink::new();
        let err = link.connect_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
        assert_eq!(link.state(), State::Disconnected);
    }

    #[tokio::test]
    async fn handshake_fails_on_closed_transport() {
        let mock = Builder::new().write(b"PJREQ").build();
        let mut link = ProjectorLink::new();
        let err = link.connect_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
        assert_eq!(link.state(), State::Disconnected);
    }

    #[tokio::test]
    async fn handshake_fails_on_read_error() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();
        let mut link = ProjectorLink::new();
        let err = link.connect_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(link.state(), State::Disconnected);
    }

    #[tokio::test]
    async fn operating_command_round_trip() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJ_OK")
            .write(&[0x21, 0x89, 0x01, 0x50, 0x57, 0x31, 0x0a])
            .read(&[0x06, 0x89, 0x01, 0x50, 0x57, 0x0a])
            .build();
        let mut link = ready(mock).await;
        link.send_operating_command(OperatingCommand::PowerOn)
            .await
            .unwrap();
        assert!(link.is_connected());
        link.disconnect().await;
    }

    #[tokio::test]
    async fn remote_command_round_trip() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJACK")
            .write(&[0x21, 0x89, 0x01, 0x52, 0x43, 0x37, 0x33, 0x32, 0x46, 0x0a])
            .read(&[0x06, 0x89, 0x01, 0x52, 0x43, 0x0a])
            .build();
        let mut link = ready(mock).await;
        link.send_remote_control_command(RemoteControlCommand::Ok)
            .await
            .unwrap();
        link.disconnect().await;
    }

    #[tokio::test]
    async fn nak_reply_still_counts_as_sent() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJACK")
            .write(&[0x21, 0x89, 0x01, 0x49, 0x50, 0x36, 0x0a])
            .read(&[0x15, 0x89, 0x01, 0x49, 0x50])
            .build();
        let mut link = ready(mock).await;
        link.send_operating_command(OperatingCommand::Hdmi1)
            .await
            .unwrap();
        assert!(link.is_connected());
        link.disconnect().await;
    }

    #[tokio::test]
    async fn coalesced_replies_are_split() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJACK")
            .write(&[0x21, 0x89, 0x01, 0x50, 0x57, 0x30, 0x0a])
            .read(&[0x06, 0x89, 0x01, 0x50, 0x57, 0x0a, 0x06, 0x89, 0x01, 0x50, 0x57, 0x0a])
            .write(&[0x21, 0x89, 0x01, 0x50, 0x57, 0x31, 0x0a])
            .build();
        let mut link = ready(mock).await;
        link.send_operating_command(OperatingCommand::PowerOff)
            .await
            .unwrap();
        // the second reply is already buffered
        link.send_operating_command(OperatingCommand::PowerOn)
            .await
            .unwrap();
        link.disconnect().await;
    }

    #[tokio::test]
    async fn send_while_disconnected_fails() {
        let mut link: ProjectorLink<Mock> = ProjectorLink::new();
        assert!(matches!(
            link.send_operating_command(OperatingCommand::PowerOn).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            link.send_remote_control_command(RemoteControlCommand::Menu)
                .await,
            Err(Error::NotConnected)
        ));
        assert_eq!(link.state(), State::Disconnected);
    }

    #[tokio::test]
    async fn send_after_disconnect_does_not_write() {
        // any write past the handshake would panic the mock
        let mock = Builder::new().write(b"PJREQ").read(b"PJACK").build();
        let mut link = ready(mock).await;
        link.disconnect().await;
        assert!(matches!(
            link.send_operating_command(OperatingCommand::PowerOff).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn closed_reply_drops_connection() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJACK")
            .write(&[0x21, 0x89, 0x01, 0x52, 0x43, 0x37, 0x33, 0x32, 0x35, 0x0a])
            .build();
        let mut link = ready(mock).await;
        let err = link
            .send_remote_control_command(RemoteControlCommand::Menu)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
        assert_eq!(link.state(), State::Disconnected);
        assert!(link.receive_frame().await.is_none());
    }

    #[tokio::test]
    async fn read_error_after_send_drops_connection() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJACK")
            .write(&[0x21, 0x89, 0x01, 0x50, 0x57, 0x31, 0x0a])
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();
        let mut link = ready(mock).await;
        let err = link
            .send_operating_command(OperatingCommand::PowerOn)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(link.state(), State::Disconnected);
        assert!(!link.is_connected());
    }

    #[tokio::test]
    async fn write_error_drops_connection() {
        let mock = Builder::new()
            .write(b"PJREQ")
            .read(b"PJACK")
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            ))
            .build();
        let mut link = ready(mock).await;
        let err = link
            .send_operating_command(OperatingCommand::PowerOn)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(link.state(), State::Disconnected);
        assert!(matches!(
            link.send_operating_command(OperatingCommand::PowerOn).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn response_timeout_keeps_session() {
        let (client, mut projector) = tokio::io::duplex(64);
        let mut link = ProjectorLink::with_config(LinkConfig {
            response_timeout: Some(Duration::from_millis(50)),
            ..LinkConfig::default()
        });

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 5];
            projector.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"PJREQ");
            projector.write_all(b"PJACK").await.unwrap();

            let mut cmd = [0u8; 7];
            projector.read_exact(&mut cmd).await.unwrap();
            assert_eq!(cmd, [0x21, 0x89, 0x01, 0x50, 0x57, 0x31, 0x0a]);
            // no reply, keep the pipe open until the client closes it
            let mut rest = Vec::new();
            projector.read_to_end(&mut rest).await.unwrap();
        });

        link.connect_stream(client).await.unwrap();
        let err = link
            .send_operating_command(OperatingCommand::PowerOn)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResponseTimeout(_)));
        assert_eq!(link.state(), State::Ready);

        link.disconnect().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn handshake_timeout() {
        let (client, _projector) = tokio::io::duplex(64);
        let mut link = ProjectorLink::with_config(LinkConfig {
            handshake_timeout: Duration::from_millis(50),
            ..LinkConfig::default()
        });

        let err = link.connect_stream(client).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(link.state(), State::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_replaces_connection() {
        let first = Builder::new().write(b"PJREQ").read(b"PJACK").build();
        let second = Builder::new()
            .write(b"PJREQ")
            .read(b"PJACK")
            .write(&[0x21, 0x89, 0x01, 0x49, 0x50, 0x37, 0x0a])
            .read(&[0x06, 0x89, 0x01, 0x49, 0x50, 0x0a])
            .build();

        let mut link = ready(first).await;
        link.connect_stream(second).await.unwrap();
        link.send_operating_command(OperatingCommand::Hdmi2)
            .await
            .unwrap();
        link.disconnect().await;
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let mut link: ProjectorLink<Mock> = ProjectorLink::new();
        link.disconnect().await;
        link.disconnect().await;
        assert_eq!(link.state(), State::Disconnected);

        let mut link = ready(Builder::new().write(b"PJREQ").read(b"PJACK").build()).await;
        link.disconnect().await;
        link.disconnect().await;
        assert_eq!(link.state(), State::Disconnected);
        assert!(!link.is_connected());
    }
}
