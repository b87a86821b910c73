use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use ckb_jsonrpc_types::{Capacity as JsonCapacity, Transaction as JsonTransaction};
use lm_types::{HumanCapacity, MigrationTransaction};
use lm_utils::transaction_skeleton::{placeholder_witnesses, signature_entries};
use serde::Serialize;

use crate::context::MigrationContext;

#[derive(Serialize)]
struct PlannedTx {
    /// Spends an output of the previous tx, its hash is zero here
    spends_previous: bool,
    fee: JsonCapacity,
    tx: JsonTransaction,
}

impl TryFrom<&MigrationTransaction> for PlannedTx {
    type Error = anyhow::Error;

    fn try_from(tx: &MigrationTransaction) -> Result<Self> {
        let fee = tx.fee().map_err(|err| anyhow!("tx fee: {}", err))?;
        let witnesses = placeholder_witnesses(tx, &signature_entries(tx));
        Ok(PlannedTx {
            spends_previous: tx.has_pending_reference(),
            fee: fee.as_u64().into(),
            tx: tx.to_placeholder_packed(witnesses).into(),
        })
    }
}

pub async fn plan(
    ctx: &MigrationContext,
    cell_limit: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let txs = ctx.builder().build_txs(ctx.cell_limit(cell_limit)).await?;
    let planned = txs
        .iter()
        .map(PlannedTx::try_from)
        .collect::<Result<Vec<_>>>()?;

    let mut total_fee = 0u64;
    for (i, tx) in txs.iter().enumerate() {
        let fee = tx.fee().map_err(|err| anyhow!("tx fee: {}", err))?.as_u64();
        total_fee = total_fee.saturating_add(fee);
        log::info!(
            "tx {}: {} inputs, fee {}",
            i,
            tx.inputs.len(),
            HumanCapacity(fee)
        );
    }
    log::info!(
        "{} txs, total fee {:#}",
        planned.len(),
        HumanCapacity(total_fee)
    );

    if let Some(output) = output {
        let content = serde_json::to_string_pretty(&planned)?;
        fs::write(output, content)?;
        log::info!("write planned txs to {}", output.display());
    }

    Ok(())
}
