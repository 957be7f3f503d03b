use clap::Parser;
use console_bootstrap::{BootstrapConfig, BootstrapError, Bootstrapper, RetrySchedule};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Starts the game server through its web admin console, retrying until it works.
#[derive(Parser, Debug)]
#[command(name = "console-bootstrap", version)]
struct Args {
    /// Host the admin console listens on
    #[arg(long, env = "WEBSERVER_LISTENING_ON")]
    host: String,

    #[arg(long, env = "WEBSERVER_PORT", default_value_t = 7999)]
    port: u16,

    #[arg(long, env = "WEB_USERNAME")]
    username: String,

    #[arg(long, env = "WEB_PASSWORD", hide_env_values = true)]
    password: String,

    /// Seconds between attempts
    #[arg(long, env = "RETRY_INTERVAL_SECS", default_value_t = 30)]
    interval_secs: u64,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Stay idle after the server was started instead of exiting
    #[arg(long)]
    linger: bool,
}

impl From<Args> for BootstrapConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            username: args.username,
            password: args.password,
            retry_interval_seconds: args.interval_secs,
            timeout_seconds: args.timeout_secs,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let linger = args.linger;
    let config = BootstrapConfig::from(args);

    info!("Starting game");
    info!("Host: {}", config.authority());

    let mut schedule = RetrySchedule::from_config(&config);
    let bootstrapper = Bootstrapper::new(config)?;

    let outcome = bootstrapper.run_until(&mut schedule, shutdown_signal()).await;
    let report = match outcome {
        Ok(report) => report,
        Err(BootstrapError::Shutdown) => {
            info!("Stopped after {} attempt(s)", schedule.attempts());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        "Server started on attempt {} (status {})",
        report.attempt, report.submission_status
    );
    match serde_json::to_string(&report) {
        Ok(json) => info!("Attempt report: {}", json),
        Err(e) => warn!("Could not render attempt report: {}", e),
    }

    if linger {
        info!("Idling until shutdown");
        shutdown_signal().await;
    }
    Ok(())
}
