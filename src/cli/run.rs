//! Handler for the `run` command.

use std::io::Write;
use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};

use crate::app;
use crate::cli::{load_config, Cli, RunArgs};
use crate::error::Result;
use crate::runtime::RelayHandle;

/// Run the relay until Ctrl-C, writing every delivered snapshot to stdout
/// as one JSON line.
pub async fn execute(cli: &Cli, args: &RunArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if let Some(ref indices) = args.indices {
        config.upstream.indices = indices
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        config.validate()?;
    }
    config.init_logging();

    let relay = app::start_relay(&config);
    let result = stream_until_interrupted(&relay, args).await;
    relay.shutdown().await;

    let stats = relay.stats();
    info!(
        delivered = stats.delivered,
        ordering_violations = stats.ordering_violations,
        backpressure_drops = stats.backpressure_drops,
        connect_attempts = stats.connect_attempts,
        polls = stats.polls_issued,
        poll_failures = stats.poll_failures,
        "Relay stopped"
    );
    result
}

async fn stream_until_interrupted(relay: &RelayHandle, args: &RunArgs) -> Result<()> {
    let mut subscription = relay.subscribe();
    let mut status_tick = tokio::time::interval(Duration::from_secs(args.status_interval.max(1)));
    status_tick.tick().await;
    let stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                return Ok(());
            }
            _ = status_tick.tick() => {
                let status = relay.status();
                if relay.is_degraded() {
                    warn!(state = %status.state, attempt = status.attempt_count, "Index data is degraded");
                } else {
                    info!(
                        state = %status.state,
                        source = ?status.last_source,
                        delivered = status.stats.delivered,
                        "Relay status"
                    );
                }
            }
            received = subscription.recv() => match received {
                Some(snapshot) => {
                    let line = serde_json::to_string(&*snapshot)?;
                    let mut out = stdout.lock();
                    writeln!(out, "{line}")?;
                    out.flush()?;
                }
                None => {
                    warn!(subscriber_id = %subscription.id(), "Subscription dropped, resubscribing");
                    subscription = relay.subscribe();
                }
            },
        }
    }
}
