use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use staple::{Relay, RelayConfig};

/// Rendezvous relay: peers meet in a named room over one TCP port and have
/// their streams stapled together.
#[derive(Debug, Parser)]
#[command(name = "staple-relay", version)]
struct Opt {
    /// Port to listen on.
    #[arg(default_value_t = 8080)]
    port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Password every connecting peer must present. Empty allows anyone.
    #[arg(long, default_value = "")]
    password: String,
}

#[tokio::main]
async fn main() {
    let opt = Opt::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&opt.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = format!("0.0.0.0:{}", opt.port);
    let relay = match Relay::bind(&addr, opt.password, RelayConfig::default()).await {
        Ok(relay) => relay,
        Err(err) => {
            error!("cannot listen on {addr}: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = relay.serve().await {
        error!("relay stopped: {err}");
        std::process::exit(1);
    }
}
