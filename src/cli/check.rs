//! Configuration validation command.

use std::path::Path;

use crate::app::Config;
use crate::error::Result;

/// Validate configuration without starting the relay.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    if !path.exists() {
        println!("  (file not found, using defaults and environment)");
    }
    println!();

    let config = Config::load_or_default(path)?;
    let settings = config.relay_settings();

    println!("✓ Configuration is valid");
    println!();
    println!("Upstream:");
    println!("  Push:     {}", config.upstream.ws_url);
    println!("  Poll:     {}", config.upstream.poll_url);
    println!("  Indices:  {}", config.upstream.indices.join(", "));
    println!("  Connect timeout: {:?}", settings.connect_timeout);
    println!();
    println!("Relay:");
    println!(
        "  Backoff:  {:?} .. {:?} (+ up to {:?} jitter)",
        settings.backoff.base(),
        settings.backoff.max(),
        settings.backoff.jitter()
    );
    println!(
        "  Polling:  every {:?} (+ up to {:?} jitter), push grace {:?}",
        settings.poller.idle_interval, settings.poller.jitter, settings.poller.recent_push
    );
    println!("  Subscriber capacity: {}", settings.subscriber_capacity);
    println!("  Degraded after: {:?}", settings.degraded_after());

    Ok(())
}
