//! Handler for the `snapshot` command.

use std::time::Duration;

use tracing::debug;

use crate::app;
use crate::cli::{load_config, Cli, SnapshotArgs};
use crate::domain::IndexId;
use crate::error::Result;
use crate::runtime::SnapshotLookup;

/// Start the relay, wait up to `--wait-ms` for the requested index and print
/// it as JSON. Prints `no data yet` instead when nothing arrived in time.
pub async fn execute(cli: &Cli, args: &SnapshotArgs) -> Result<()> {
    let config = load_config(cli)?;
    config.init_logging();

    let index_id = IndexId::new(args.index.as_str());
    let relay = app::start_relay(&config);
    let lookup = relay
        .snapshot_within(&index_id, Duration::from_millis(args.wait_ms))
        .await;
    debug!(index_id = %index_id, state = %relay.state(), "Snapshot lookup finished");
    relay.shutdown().await;

    match lookup {
        SnapshotLookup::Ready(snapshot) => {
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        }
        SnapshotLookup::NoDataYet => println!("no data yet"),
    }
    Ok(())
}
