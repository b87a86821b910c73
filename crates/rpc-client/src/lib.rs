pub mod ckb_client;
pub mod error;
pub mod indexer_client;
pub mod indexer_types;
pub mod traits;
mod utils;

pub use utils::JsonRpcClient;
