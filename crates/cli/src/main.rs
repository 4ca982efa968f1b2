//! Triangular arbitrage allocator
//!
//! Usage: `triarb [SCENARIO.json]`. The report goes to stdout, logs to stderr.

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use triarb_cli::{run, LogFormat, Scenario, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config_file = env::var("TRIARB_CONFIG").unwrap_or_else(|_| "triarb".to_string());
    let settings = Settings::load(&config_file)?;

    init_logging(settings.log_format);

    info!("Starting triarb v{}", env!("CARGO_PKG_VERSION"));

    let scenario_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.scenario.clone())
        .context("No scenario given: pass a path or set TRIARB__SCENARIO")?;

    let scenario = Scenario::load(&scenario_path)?;

    let report = match run(&settings, &scenario).await {
        Ok(report) => report,
        Err(e) => {
            error!("Run failed: {:#}", e);
            return Err(e);
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Done");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
