//! Subcommand implementations.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Context};
use crm_api::NextLeadClient;
use poller::{
    CrmClient, EventType, PollOutcome, PollStateStore, Poller, RetryPolicy, TriggerError,
    TriggerRunner,
};
use state_store::FileStateStore;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::{Command, ConnectionArgs, PollArgs};

type Runner = TriggerRunner<NextLeadClient, FileStateStore>;

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Poll(args) => poll_once(&args).await,
        Command::Watch {
            poll,
            interval_secs,
        } => watch(&poll, Duration::from_secs(interval_secs.max(1))).await,
        Command::Check(args) => check(&args).await,
        Command::Events => {
            list_events(&mut std::io::stdout().lock())?;
            Ok(())
        }
    }
}

fn client(args: &ConnectionArgs) -> anyhow::Result<NextLeadClient> {
    let credentials = args.credentials().context("Invalid credentials")?;
    Ok(NextLeadClient::new(credentials, args.timeout())?)
}

fn runner(args: &PollArgs) -> anyhow::Result<Runner> {
    Ok(TriggerRunner::new(
        Poller::new(client(&args.connection)?),
        FileStateStore::new(&args.state_dir),
        args.trigger_id()?,
        args.event,
    ))
}

fn describe(err: &TriggerError) -> String {
    match err {
        TriggerError::Poll(poll) => format!("{poll} {}", poll.description()),
        TriggerError::Store(store) => store.to_string(),
    }
}

async fn poll_once(args: &PollArgs) -> anyhow::Result<()> {
    let runner = runner(args)?;
    match runner.run_cycle().await {
        Ok(outcome) => emit(&outcome, &mut std::io::stdout().lock()),
        Err(err) => bail!(describe(&err)),
    }
}

async fn watch(args: &PollArgs, interval: Duration) -> anyhow::Result<()> {
    let runner = runner(args)?;
    info!(
        trigger_id = %runner.trigger(),
        event = %runner.event(),
        interval_secs = interval.as_secs(),
        "Watching for events"
    );
    watch_loop(&runner, interval, tokio::signal::ctrl_c(), &mut std::io::stdout()).await
}

/// Runs cycles every `interval` until `shutdown` resolves.
///
/// Retryable failures are logged and polling continues, waiting at least the
/// server's `Retry-After` when it exceeds the interval. A non-retryable
/// failure ends the loop with an error.
async fn watch_loop<C, S, F, W>(
    runner: &TriggerRunner<C, S>,
    interval: Duration,
    shutdown: F,
    out: &mut W,
) -> anyhow::Result<()>
where
    C: CrmClient,
    S: PollStateStore,
    F: Future,
    W: Write,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted; stopping");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        match runner.run_cycle().await {
            Ok(outcome) => emit(&outcome, out)?,
            Err(err) => match err.retry_policy() {
                RetryPolicy::NonRetryable => bail!(describe(&err)),
                RetryPolicy::Retryable { after } => {
                    error!(error = %describe(&err), "Poll cycle failed; will retry");
                    if let Some(delay) = after.filter(|d| *d > interval) {
                        info!(delay_secs = delay.as_secs(), "Backing off as requested by server");
                        tokio::select! {
                            _ = &mut shutdown => {
                                info!("Interrupted; stopping");
                                return Ok(());
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                        ticker.reset();
                    }
                }
            },
        }
    }
}

async fn check(args: &ConnectionArgs) -> anyhow::Result<()> {
    let client = client(args)?;
    match client.verify_credentials().await {
        Ok(()) => {
            info!(domain = client.credentials().domain(), "Credentials accepted");
            println!("ok");
            Ok(())
        }
        Err(err) => bail!("{err} {}", err.description()),
    }
}

/// Writes one JSON object per emitted event.
fn emit(outcome: &PollOutcome, out: &mut impl Write) -> anyhow::Result<()> {
    match outcome {
        PollOutcome::NothingNew => info!("No new events"),
        PollOutcome::Items(items) => {
            for item in items {
                serde_json::to_writer(&mut *out, item)?;
                writeln!(out)?;
            }
            out.flush()?;
        }
    }
    Ok(())
}

fn list_events(out: &mut impl Write) -> std::io::Result<()> {
    for event in EventType::ALL {
        writeln!(out, "{:<22} {}", event.name(), event.description())?;
    }
    Ok(())
}
