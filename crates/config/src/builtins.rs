use ckb_jsonrpc_types::CellDep;
use lazy_static::lazy_static;
use serde::Deserialize;

use crate::{CellDepConfig, NetworkType};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BuiltinCellDeps {
    lock_cell_dep: CellDep,
    cell_deps: Vec<CellDepConfig>,
}

fn testnet() -> &'static BuiltinCellDeps {
    lazy_static! {
        static ref BUILTIN: BuiltinCellDeps = {
            let content = include_str!("builtins/testnet.toml");
            toml::from_str(content).expect("builtin testnet cell deps")
        };
    }
    &BUILTIN
}

fn mainnet() -> &'static BuiltinCellDeps {
    lazy_static! {
        static ref BUILTIN: BuiltinCellDeps = {
            let content = include_str!("builtins/mainnet.toml");
            toml::from_str(content).expect("builtin mainnet cell deps")
        };
    }
    &BUILTIN
}

fn builtin(network: NetworkType) -> Option<&'static BuiltinCellDeps> {
    match network {
        NetworkType::Mainnet => Some(mainnet()),
        NetworkType::Testnet => Some(testnet()),
        NetworkType::Dev => None,
    }
}

/// Type scripts a migration can reference out of the box.
pub fn builtin_cell_deps(network: NetworkType) -> Vec<CellDepConfig> {
    builtin(network)
        .map(|builtin| builtin.cell_deps.clone())
        .unwrap_or_default()
}

/// Dep group of the secp256k1 blake160 sighash-all lock.
pub fn builtin_lock_cell_dep(network: NetworkType) -> Option<CellDep> {
    builtin(network).map(|builtin| builtin.lock_cell_dep.clone())
}
