use futures::{SinkExt, TryStreamExt};
use jvclink::ProjectorLink;
use tracing::info;

use crate::{dispatch, Endpoint, Feedback, SocketPayload};

/// The daemon's single projector session and the endpoint it reconnects to.
pub struct Session {
    pub link: ProjectorLink,
    pub endpoint: Endpoint,
}

/// Serves requests from one client until it hangs up, one reply per request.
pub async fn handle_client(
    session: &mut Session,
    stream: tokio::net::UnixStream,
) -> Result<(), std::io::Error> {
    let frames =
        tokio_util::codec::Framed::new(stream, tokio_util::codec::LengthDelimitedCodec::new());
    let mut transport = tokio_serde::Framed::new(
        frames,
        tokio_serde::formats::Bincode::<SocketPayload, Feedback>::default(),
    );

    while let Some(payload) = transport.try_next().await? {
        let feedback = dispatch(&mut session.link, &mut session.endpoint, payload.cmd).await;
        info!(ok = feedback.ok, "{}", feedback);
        transport.send(feedback).await?;
    }

    Ok(())
}
