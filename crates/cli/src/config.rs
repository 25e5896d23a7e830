//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crm_api::{Credentials, DEFAULT_DOMAIN};
use poller::{EventType, TriggerId, UnknownEventType};

#[derive(Debug, Parser)]
#[command(
    name = "nextlead-trigger",
    about = "Poll NextLead for new CRM events and print them as JSON lines",
    version
)]
pub struct Cli {
    /// Log output format (logs go to stderr).
    #[arg(
        long,
        env = "NEXTLEAD_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one poll cycle and print new events.
    Poll(PollArgs),
    /// Poll on an interval until interrupted.
    Watch {
        #[command(flatten)]
        poll: PollArgs,

        /// Seconds between cycles.
        #[arg(long, env = "NEXTLEAD_POLL_INTERVAL_SECS", default_value_t = 60)]
        interval_secs: u64,
    },
    /// Check that the API key is accepted.
    Check(ConnectionArgs),
    /// List the supported event types.
    Events,
}

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// API domain, e.g. http://localhost:3000 for local development.
    #[arg(long, env = "NEXTLEAD_DOMAIN", default_value = DEFAULT_DOMAIN)]
    pub domain: String,

    /// API key from Settings > Automation > API Key.
    #[arg(long, env = "NEXTLEAD_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "NEXTLEAD_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl ConnectionArgs {
    pub fn credentials(&self) -> Result<Credentials, crm_api::CredentialsError> {
        Credentials::new(self.domain.clone(), self.api_key.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Args)]
pub struct PollArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Event type to poll, e.g. contactCreated.
    #[arg(long, env = "NEXTLEAD_EVENT", value_parser = parse_event)]
    pub event: EventType,

    /// Directory holding per-trigger poll state.
    #[arg(long, env = "NEXTLEAD_STATE_DIR", default_value = ".nextlead-state")]
    pub state_dir: PathBuf,

    /// Name scoping the stored state; defaults to the event name.
    #[arg(long, env = "NEXTLEAD_TRIGGER_ID")]
    pub trigger_id: Option<String>,
}

impl PollArgs {
    pub fn trigger_id(&self) -> anyhow::Result<TriggerId> {
        let raw = self
            .trigger_id
            .clone()
            .unwrap_or_else(|| self.event.name().to_owned());
        TriggerId::new(raw).ok_or_else(|| anyhow::anyhow!("trigger id must not be empty"))
    }
}

fn parse_event(raw: &str) -> Result<EventType, UnknownEventType> {
    raw.parse()
}
