pub mod broadcast;
pub mod builder;
pub mod error;
pub mod registry;

use anyhow::Result;
use ckb_types::H256;

pub use broadcast::{ChainBroadcaster, StopHandle};
pub use builder::{plan_migration, MigrationBuilder};
pub use error::{BroadcastError, MigrationError};
pub use registry::CellDepRegistry;

/// Build the migration transactions and broadcast them in order.
///
/// A failed broadcast surfaces as [`BroadcastError`], which lists the
/// transactions already on chain. Running again picks up the cells still
/// owned by the source lock.
pub async fn migrate(
    builder: &MigrationBuilder,
    broadcaster: &ChainBroadcaster,
    cell_limit: usize,
) -> Result<Vec<H256>> {
    let txs = builder.build_txs(cell_limit).await?;
    if txs.is_empty() {
        log::info!("nothing to migrate");
        return Ok(Vec::new());
    }
    log::info!("broadcast {} migration txs", txs.len());
    let hashes = broadcaster.submit_chain(txs).await?;
    Ok(hashes)
}
