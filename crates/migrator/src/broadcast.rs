use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ckb_types::{prelude::*, H256};
use lm_rpc_client::traits::Submitter;
use lm_types::MigrationTransaction;
use lm_utils::signer::Signer;

use crate::error::{BroadcastError, MigrationError};

/// Asks a running broadcast to stop before its next submission.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Signs and submits planned transactions in order, feeding the hash of each
/// submitted transaction into the pending inputs of the next one.
pub struct ChainBroadcaster {
    signer: Arc<dyn Signer>,
    submitter: Arc<dyn Submitter>,
    detach_cell_deps_when_signing: bool,
    stop: StopHandle,
}

impl ChainBroadcaster {
    pub fn new(signer: Arc<dyn Signer>, submitter: Arc<dyn Submitter>) -> Self {
        ChainBroadcaster {
            signer,
            submitter,
            detach_cell_deps_when_signing: true,
            stop: StopHandle::new(),
        }
    }

    pub fn detach_cell_deps_when_signing(mut self, detach: bool) -> Self {
        self.detach_cell_deps_when_signing = detach;
        self
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub async fn submit_chain(
        &self,
        txs: Vec<MigrationTransaction>,
    ) -> Result<Vec<H256>, BroadcastError> {
        self.resume_chain(txs, 0, None).await
    }

    /// Continue a chain from `start_index`, `previous_hash` being the hash of
    /// the transaction at `start_index - 1` if it was already submitted.
    /// Returns the hashes submitted by this call.
    pub async fn resume_chain(
        &self,
        txs: Vec<MigrationTransaction>,
        start_index: usize,
        previous_hash: Option<H256>,
    ) -> Result<Vec<H256>, BroadcastError> {
        let total = txs.len();
        let mut previous_hash = previous_hash;
        let mut confirmed = Vec::with_capacity(total.saturating_sub(start_index));

        for (index, mut tx) in txs.into_iter().enumerate().skip(start_index) {
            if self.stop.is_stopped() {
                log::info!("stop broadcasting before tx {}/{}", index + 1, total);
                return Err(BroadcastError {
                    failed_index: index,
                    confirmed,
                    source: MigrationError::Cancelled,
                });
            }

            if let Some(tx_hash) = previous_hash.as_ref() {
                let resolved = tx.resolve_pending(tx_hash);
                if resolved > 0 {
                    log::debug!(
                        "tx {} spends {} outputs of {:#x}",
                        index,
                        resolved,
                        tx_hash
                    );
                }
            }

            match self.submit_one(tx).await {
                Ok(tx_hash) => {
                    log::info!("submitted tx {}/{} {:#x}", index + 1, total, tx_hash);
                    confirmed.push(tx_hash.clone());
                    previous_hash = Some(tx_hash);
                }
                Err(source) => {
                    log::error!("tx {}/{} failed: {}", index + 1, total, source);
                    return Err(BroadcastError {
                        failed_index: index,
                        confirmed,
                        source,
                    });
                }
            }
        }

        Ok(confirmed)
    }

    /// Sign and submit a transaction whose inputs are all resolved.
    pub async fn submit_one(&self, tx: MigrationTransaction) -> Result<H256, MigrationError> {
        tx.raw()?;
        let signed = self.sign(tx).await?;
        let packed = signed.to_packed()?;
        self.submitter
            .submit(packed)
            .await
            .map_err(MigrationError::Submitter)
    }

    async fn sign(
        &self,
        mut tx: MigrationTransaction,
    ) -> Result<MigrationTransaction, MigrationError> {
        if !self.detach_cell_deps_when_signing || tx.cell_deps.is_empty() {
            return Ok(self.signer.sign(tx).await?);
        }

        // sighash covers cell deps, the signature only holds if the signer
        // ignores them
        log::warn!("sign tx without its {} cell deps", tx.cell_deps.len());
        let cell_deps = std::mem::take(&mut tx.cell_deps);
        let mut signed = self.signer.sign(tx).await?;
        for cell_dep in cell_deps {
            if !signed
                .cell_deps
                .iter()
                .any(|dep| dep.as_slice() == cell_dep.as_slice())
            {
                signed.cell_deps.push(cell_dep);
            }
        }
        Ok(signed)
    }
}
