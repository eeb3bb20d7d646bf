use clap::Parser;
use std::io;
use streamql::config::{Args, Settings};
use streamql::{Engine, ResultEmitter, RoundScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries only records.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(&args)?;
    init_logging(&settings.log_level);
    info!(
        data_dir = %settings.data_dir.display(),
        poll_interval_ms = settings.poll_interval_ms,
        format = ?settings.format,
        "starting"
    );

    let engine = Engine::open(&settings.data_dir)?;
    let emitter = ResultEmitter::new(io::stdout().lock(), settings.format);

    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            on_signal.cancel();
        }
    });

    let mut scheduler = RoundScheduler::new(engine, emitter, settings.poll_interval(), token);
    let summary = scheduler.run(&args.query).await?;
    info!(rounds = summary.rounds, queries = summary.queries, rows = summary.rows, "done");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    run(args).await.inspect_err(|e| error!(error = %e, "fatal"))
}
