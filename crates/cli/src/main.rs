//! NextLead trigger CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: flags with environment fallbacks (`NEXTLEAD_*`).
//! 2. **Wire observability**: configure `tracing-subscriber` with a text or
//!    JSON layer on stderr and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: create the `NextLeadClient` and the
//!    `FileStateStore` and inject them into a `TriggerRunner`.
//! 4. **Select mode**: `poll` runs one cycle, `watch` runs cycles on an
//!    interval, `check` verifies credentials, `events` lists event types.
//!
//! Emitted events are printed to stdout as one JSON object per line.

mod commands;
mod config;
mod observability;

use clap::Parser;

use crate::config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = observability::init(cli.log_format)?;

    let result = commands::run(cli.command).await;

    telemetry.shutdown();
    result
}
