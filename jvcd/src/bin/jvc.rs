use std::path::PathBuf;

use clap::Parser;
use jvcd::*;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("daemon closed the connection without replying")]
    NoReply,
}

/// Sends one request to jvcd and prints its feedback.
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    #[clap(long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    #[clap(subcommand)]
    cmd: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let result = match request(&args.socket, args.cmd).await {
        Ok(Some(feedback)) => Ok(feedback),
        Ok(None) => Err(Error::NoReply),
        Err(e) => Err(Error::Io(e)),
    };

    match result {
        Ok(feedback) => {
            println!("{}", feedback);
            if !feedback.ok {
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(socket = %args.socket.display(), "{}", e);
            std::process::exit(1);
        }
    }
}
