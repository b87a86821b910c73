use anyhow::Result;
use lm_migrator::{migrate as run_migration, BroadcastError, StopHandle};

use crate::context::MigrationContext;

pub async fn migrate(ctx: &MigrationContext, cell_limit: Option<usize>) -> Result<()> {
    let stop = StopHandle::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("received sigint, stop after the in-flight tx");
                stop.stop();
            }
        });
    }

    let builder = ctx.builder();
    let broadcaster = ctx.broadcaster(stop);
    match run_migration(&builder, &broadcaster, ctx.cell_limit(cell_limit)).await {
        Ok(hashes) => {
            for tx_hash in &hashes {
                log::info!("migrated in tx {:#x}", tx_hash);
            }
            log::info!("migration finished with {} txs", hashes.len());
            Ok(())
        }
        Err(err) => {
            if let Some(broadcast_err) = err.downcast_ref::<BroadcastError>() {
                for tx_hash in &broadcast_err.confirmed {
                    log::info!("submitted before failure: {:#x}", tx_hash);
                }
                log::warn!("run migrate again to move the remaining cells");
            }
            Err(err)
        }
    }
}
