use anyhow::Result;
use ckb_jsonrpc_types::{JsonBytes, Uint32};
use ckb_types::packed::Script;
use lm_types::MigrationCell;
use serde_json::json;
use tracing::instrument;

use crate::indexer_types::{Cell, Order, Pagination, SearchKey};
use crate::utils::{JsonRpcClient, DEFAULT_QUERY_LIMIT};

#[derive(Clone)]
pub struct CKBIndexerClient(JsonRpcClient);

impl CKBIndexerClient {
    pub fn new(client: JsonRpcClient) -> Self {
        Self(client)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        JsonRpcClient::with_url("ckb indexer client", url).map(Self::new)
    }

    pub async fn get_cells(
        &self,
        search_key: &SearchKey,
        order: &Order,
        limit: Option<Uint32>,
        cursor: &Option<JsonBytes>,
    ) -> Result<Pagination<Cell>> {
        self.0
            .request(
                "get_cells",
                json!([
                    search_key,
                    order,
                    limit.unwrap_or_else(|| DEFAULT_QUERY_LIMIT.into()),
                    cursor,
                ]),
            )
            .await
    }

    /// Every live cell locked by `lock`, page by page.
    #[instrument(skip_all)]
    pub async fn collect_live_cells(&self, lock: &Script) -> Result<Vec<MigrationCell>> {
        let search_key = SearchKey::with_lock(lock.clone());
        let order = Order::Asc;
        let limit = Uint32::from(DEFAULT_QUERY_LIMIT);

        let mut collected = Vec::new();
        let mut cursor = None;
        loop {
            let cells = self
                .get_cells(&search_key, &order, Some(limit), &cursor)
                .await?;
            let page_len = cells.objects.len();
            collected.extend(cells.objects.into_iter().map(MigrationCell::from));

            if page_len < DEFAULT_QUERY_LIMIT as usize || cells.last_cursor.is_empty() {
                break;
            }
            cursor = Some(cells.last_cursor);
        }

        log::debug!("[ckb-indexer-client] collected {} cells", collected.len());
        Ok(collected)
    }
}
