use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use jvcd::*;
use jvclink::{LinkConfig, ProjectorLink, DEFAULT_HOST, DEFAULT_PORT};
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Keeps one control session open to a JVC projector and serves requests
/// from `jvc` clients over a Unix socket.
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    #[clap(long, default_value = DEFAULT_HOST)]
    host: String,
    #[clap(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Bound on TCP connect plus the PJREQ/PJACK exchange
    #[clap(long, default_value_t = 5000)]
    handshake_timeout_ms: u64,
    /// Give up waiting for a command reply after this long
    #[clap(long)]
    response_timeout_ms: Option<u64>,
    /// Socket to bind when none is passed in by the service manager
    #[clap(long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,
    /// Wait for a `connect` request instead of connecting on startup
    #[clap(long)]
    no_autoconnect: bool,
}

impl Args {
    fn link_config(&self) -> LinkConfig {
        LinkConfig {
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
            response_timeout: self.response_timeout_ms.map(Duration::from_millis),
        }
    }
}

fn listener(args: &Args) -> Result<tokio::net::UnixListener, Error> {
    let mut listenfd = listenfd::ListenFd::from_env();
    let listener = match listenfd.take_unix_listener(0)? {
        Some(listener) => listener,
        None => {
            if args.socket.exists() {
                std::fs::remove_file(&args.socket)?;
            }
            info!(socket = %args.socket.display(), "binding socket");
            std::os::unix::net::UnixListener::bind(&args.socket)?
        }
    };
    listener.set_nonblocking(true)?;
    Ok(tokio::net::UnixListener::from_std(listener)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let listener = match listener(&args) {
        Ok(listener) => listener,
        Err(e) => {
            error!("can't get unix listener: {}", e);
            std::process::exit(1);
        }
    };

    let mut session = Session {
        link: ProjectorLink::with_config(args.link_config()),
        endpoint: Endpoint {
            host: args.host.clone(),
            port: args.port,
        },
    };

    if !args.no_autoconnect {
        let feedback = dispatch(
            &mut session.link,
            &mut session.endpoint,
            Command::Connect {
                host: None,
                port: None,
            },
        )
        .await;
        info!(endpoint = %session.endpoint, "{}", feedback);
    }

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                if let Err(e) = handle_client(&mut session, stream).await {
                    warn!("handle_client: {}", e)
                }
            }
            Err(e) => error!("listener error: {}", e),
        }
    }
}
