use ckb_types::{core::CapacityError, H256};
use lm_types::{error::UnresolvedReferenceError, HumanCapacity};
use lm_utils::signer::SignerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("none of the {cells} cells has capacity left to pay the fee")]
    InsufficientFunds { cells: usize },

    #[error("fee {fee} exceeds the spare capacity of a {capacity} cell")]
    FeeExceedsCapacity {
        capacity: HumanCapacity,
        fee: HumanCapacity,
    },

    #[error("capacity overflow: {0}")]
    CapacityOverflow(#[from] CapacityError),

    #[error(transparent)]
    UnresolvedReference(#[from] UnresolvedReferenceError),

    #[error("migration cancelled")]
    Cancelled,

    #[error("collect cells: {0}")]
    Collector(anyhow::Error),

    #[error("sign tx: {0}")]
    Signer(#[from] SignerError),

    #[error("submit tx: {0}")]
    Submitter(anyhow::Error),
}

/// A chain broadcast stopped at `failed_index`. Transactions before it are on
/// chain and listed in `confirmed`.
#[derive(Error, Debug)]
#[error("tx {failed_index} of the chain failed after {} submitted: {source}", .confirmed.len())]
pub struct BroadcastError {
    pub failed_index: usize,
    pub confirmed: Vec<H256>,
    pub source: MigrationError,
}
