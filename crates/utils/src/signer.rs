use async_trait::async_trait;
use lm_types::MigrationTransaction;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("the id is not found in the signer")]
    IdNotFound,

    #[error("invalid transaction, reason: `{0}`")]
    InvalidTransaction(String),

    // maybe hardware wallet error or io error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fills the witnesses of a transaction.
///
/// A signer must leave inputs, outputs and data untouched. It may append the
/// cell deps its own lock script needs.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, tx: MigrationTransaction) -> Result<MigrationTransaction, SignerError>;
}
