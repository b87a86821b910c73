use anyhow::Result;
use ckb_types::{packed::Transaction, H256};
use serde_json::json;

use crate::utils::JsonRpcClient;

#[derive(Clone)]
pub struct CKBClient(JsonRpcClient);

impl CKBClient {
    pub fn new(client: JsonRpcClient) -> Self {
        Self(client)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        JsonRpcClient::with_url("ckb client", url).map(Self::new)
    }

    /// Outputs are locked by arbitrary scripts, so the node must not apply
    /// its well-known-scripts validator.
    pub async fn send_transaction(&self, tx: Transaction) -> Result<H256> {
        let tx: ckb_jsonrpc_types::Transaction = tx.into();
        self.0
            .request("send_transaction", json!([tx, "passthrough"]))
            .await
    }
}
