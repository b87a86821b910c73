use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ckb_types::{core::Capacity, packed::Script, packed::Transaction, H256};
use lm_types::MigrationCell;

use crate::ckb_client::CKBClient;
use crate::indexer_client::CKBIndexerClient;

/// Live cells owned by a lock script.
#[async_trait]
pub trait CellSource: Send + Sync {
    async fn collect(&self, lock: &Script) -> Result<Vec<MigrationCell>>;

    /// Capacity of the plain cells, cells with a type script are ignored.
    async fn get_balance(&self, lock: &Script) -> Result<Capacity> {
        let cells = self.collect(lock).await?;
        plain_capacity(&cells)
    }
}

/// Broadcast a signed transaction, returning its hash.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, tx: Transaction) -> Result<H256>;
}

pub fn plain_capacity(cells: &[MigrationCell]) -> Result<Capacity> {
    cells
        .iter()
        .filter(|cell| cell.is_plain())
        .try_fold(Capacity::zero(), |total, cell| total.safe_add(cell.capacity))
        .map_err(|err| anyhow!("balance overflow: {}", err))
}

#[async_trait]
impl CellSource for CKBIndexerClient {
    async fn collect(&self, lock: &Script) -> Result<Vec<MigrationCell>> {
        self.collect_live_cells(lock).await
    }
}

#[async_trait]
impl Submitter for CKBClient {
    async fn submit(&self, tx: Transaction) -> Result<H256> {
        self.send_transaction(tx).await
    }
}
