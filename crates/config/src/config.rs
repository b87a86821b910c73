use std::fmt;
use std::path::PathBuf;

use ckb_fixed_hash::H256;
use ckb_jsonrpc_types::{CellDep, Script};
use serde::{Deserialize, Serialize};

use crate::builtins::{builtin_cell_deps, builtin_lock_cell_dep};
use crate::constants::{DEFAULT_CELL_LIMIT, DEFAULT_FEE_RATE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Dev,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NetworkType::Mainnet => write!(f, "mainnet"),
            NetworkType::Testnet => write!(f, "testnet"),
            NetworkType::Dev => write!(f, "dev"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub network: NetworkType,
    pub rpc: RPCConfig,
    pub wallet: WalletConfig,
    pub migration: MigrationConfig,
    /// Type scripts known in addition to the builtin ones of `network`
    #[serde(default)]
    pub cell_deps: Vec<CellDepConfig>,
}

impl Config {
    /// Builtin entries of the network followed by the configured ones.
    pub fn registry_entries(&self) -> Vec<CellDepConfig> {
        let mut entries = builtin_cell_deps(self.network);
        entries.extend(self.cell_deps.iter().cloned());
        entries
    }

    /// The configured lock dep, else the builtin one of the network.
    pub fn lock_cell_dep(&self) -> Option<CellDep> {
        self.wallet
            .lock_cell_dep
            .clone()
            .or_else(|| builtin_lock_cell_dep(self.network))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RPCConfig {
    pub ckb_url: String,
    pub indexer_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletConfig {
    pub privkey_path: PathBuf,
    /// Dep of the wallet lock, added by the signer. Overrides the builtin one
    #[serde(default)]
    pub lock_cell_dep: Option<CellDep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub destination: Script,
    #[serde(default = "default_cell_limit")]
    pub cell_limit: usize,
    /// Shannons per KB
    #[serde(default = "default_fee_rate")]
    pub fee_rate: u64,
    #[serde(default = "default_detach_cell_deps")]
    pub detach_cell_deps_when_signing: bool,
}

fn default_cell_limit() -> usize {
    DEFAULT_CELL_LIMIT
}

fn default_fee_rate() -> u64 {
    DEFAULT_FEE_RATE
}

fn default_detach_cell_deps() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellDepConfig {
    pub name: String,
    /// Code hash of the type script
    pub code_hash: H256,
    pub cell_dep: CellDep,
}
