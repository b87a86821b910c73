use anyhow::Result;
use lm_rpc_client::traits::CellSource;
use lm_types::HumanCapacity;

use crate::context::MigrationContext;

pub async fn get_balance(ctx: &MigrationContext) -> Result<()> {
    let balance = ctx.indexer.get_balance(ctx.source_lock()).await?;
    log::info!("Balance: {:#}", HumanCapacity::from(balance));

    Ok(())
}
