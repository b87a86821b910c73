use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::instrument;

use crate::error::RPCRequestError;

pub(crate) const DEFAULT_QUERY_LIMIT: u32 = 500;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON-RPC 2.0 over http.
#[derive(Clone)]
pub struct JsonRpcClient {
    name: &'static str,
    client: Client,
    url: Url,
    id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn with_url(name: &'static str, url: &str) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_HTTP_TIMEOUT).build()?;
        Ok(JsonRpcClient {
            name,
            client,
            url: Url::parse(url)?,
            id: Arc::new(AtomicU64::new(0)),
        })
    }

    #[instrument(target = "lm-rpc-client", skip_all, err, fields(client = self.name, method = method))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let id = self.id.fetch_add(1, Ordering::Relaxed) + 1;
        let req_json = json!({
            "id": id,
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });

        let map_err = |err: anyhow::Error| RPCRequestError::new(self.name, method.to_string(), err);
        let resp = self
            .client
            .post(self.url.clone())
            .json(&req_json)
            .send()
            .await
            .map_err(|err| map_err(err.into()))?;
        let output = resp
            .json::<jsonrpc_core::response::Output>()
            .await
            .map_err(|err| map_err(err.into()))?;

        match output {
            jsonrpc_core::response::Output::Success(success) => {
                let result = success.result;
                let result_str = result.to_string();
                serde_json::from_value(result).map_err(|err| {
                    log::error!(
                        "[{}] Failed to parse response, method: {}, response: {}",
                        self.name,
                        method,
                        result_str
                    );
                    err.into()
                })
            }
            jsonrpc_core::response::Output::Failure(failure) => {
                Err(map_err(failure.error.into()).into())
            }
        }
    }
}
