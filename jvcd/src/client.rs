use std::path::Path;

use futures::{SinkExt, TryStreamExt};

use crate::{Command, Feedback, SocketPayload};

/// Sends `cmd` to the daemon listening on `socket`.
///
/// `None` when the daemon hung up without replying.
pub async fn request(socket: &Path, cmd: Command) -> Result<Option<Feedback>, std::io::Error> {
    let stream = tokio::net::UnixStream::connect(socket).await?;
    let frames =
        tokio_util::codec::Framed::new(stream, tokio_util::codec::LengthDelimitedCodec::new());
    let mut transport = tokio_serde::Framed::new(
        frames,
        tokio_serde::formats::Bincode::<Feedback, SocketPayload>::default(),
    );

    transport.send(SocketPayload { cmd }).await?;
    transport.try_next().await
}
