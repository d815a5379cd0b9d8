mod cli;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let (addr, config) = match cli::run() {
        cli::RunOutcome::Serve(addr, config) => (addr, config),
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    if let Err(err) = beacon::serve(addr, config).await {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}
