// Request and response types of the ckb-indexer `get_cells` method.

use ckb_jsonrpc_types::{BlockNumber, CellOutput, JsonBytes, OutPoint, Script, Uint32};
use ckb_types::packed;
use lm_types::MigrationCell;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SearchKey {
    pub script: Script,
    pub script_type: ScriptType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_data: Option<bool>,
}

impl SearchKey {
    /// Build a SearchKey to search for cells with this lock script.
    pub fn with_lock(script: packed::Script) -> Self {
        Self {
            script: script.into(),
            script_type: ScriptType::Lock,
            with_data: Some(true),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    Lock,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Asc,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Cell {
    pub output: CellOutput,
    pub output_data: Option<JsonBytes>,
    pub out_point: OutPoint,
    pub block_number: BlockNumber,
    pub tx_index: Uint32,
}

impl From<Cell> for MigrationCell {
    fn from(cell: Cell) -> MigrationCell {
        let output: packed::CellOutput = cell.output.into();
        let out_point: packed::OutPoint = cell.out_point.into();
        let data = cell
            .output_data
            .map(JsonBytes::into_bytes)
            .unwrap_or_default();
        MigrationCell::from_output(output, data, Some(out_point.into()))
    }
}

#[derive(Deserialize, Serialize)]
pub struct Pagination<T> {
    pub objects: Vec<T>,
    pub last_cursor: JsonBytes,
}
