use ckb_types::core::Capacity;
use lm_types::MigrationTransaction;

use crate::transaction_skeleton::tx_in_block_size;

/// Minimum fee of a transaction.
pub trait FeeEstimator: Send + Sync {
    fn estimate_fee(&self, tx: &MigrationTransaction) -> Capacity;
}

/// tx_size * fee_rate / KB, rounded up
pub fn calculate_required_tx_fee(tx_size: usize, fee_rate: u64) -> u64 {
    let fee = (tx_size as u128 * fee_rate as u128 + 999) / 1000;
    u64::try_from(fee).unwrap_or(u64::MAX)
}

/// Charges `fee_rate` shannons per KB of the signed transaction.
#[derive(Debug, Clone, Copy)]
pub struct SizeFeeEstimator {
    fee_rate: u64,
}

impl SizeFeeEstimator {
    pub fn new(fee_rate: u64) -> Self {
        SizeFeeEstimator { fee_rate }
    }
}

impl FeeEstimator for SizeFeeEstimator {
    fn estimate_fee(&self, tx: &MigrationTransaction) -> Capacity {
        let tx_size = tx_in_block_size(tx);
        Capacity::shannons(calculate_required_tx_fee(tx_size, self.fee_rate))
    }
}
