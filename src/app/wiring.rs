//! Builds the relay from configuration.

use std::sync::Arc;

use tracing::info;

use super::Config;
use crate::adapter::outbound::vietcap::{VietcapClient, VietcapConnector};
use crate::runtime::{Relay, RelayHandle};

/// Wire the Vietcap adapters into an unstarted relay.
#[must_use]
pub fn build_relay(config: &Config) -> Relay {
    let settings = config.relay_settings();
    let symbols = config.upstream.indices.clone();

    let connector = VietcapConnector::new(config.upstream.ws_url.clone(), symbols.clone());
    let source = VietcapClient::new(
        config.upstream.poll_url.clone(),
        symbols,
        settings.poller.poll_timeout,
    );

    Relay::new(Arc::new(connector), Arc::new(source), settings)
}

/// Build and start the relay. Must be called inside a tokio runtime.
pub fn start_relay(config: &Config) -> RelayHandle {
    info!(
        ws_url = %config.upstream.ws_url,
        poll_url = %config.upstream.poll_url,
        indices = ?config.upstream.indices,
        "Starting relay"
    );
    build_relay(config).start()
}
