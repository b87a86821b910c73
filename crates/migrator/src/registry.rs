use std::collections::HashMap;

use ckb_types::{packed::CellDep, H256};
use lm_config::CellDepConfig;

#[derive(Clone, Debug)]
struct RegisteredDep {
    name: String,
    cell_dep: CellDep,
}

/// Cell deps of the type scripts a migration may carry, keyed by code hash.
#[derive(Clone, Debug, Default)]
pub struct CellDepRegistry {
    deps: HashMap<H256, RegisteredDep>,
}

impl CellDepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later entries replace earlier ones with the same code hash.
    pub fn from_entries(entries: &[CellDepConfig]) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.insert(
                entry.name.clone(),
                entry.code_hash.clone(),
                entry.cell_dep.clone().into(),
            );
        }
        registry
    }

    pub fn insert(&mut self, name: String, code_hash: H256, cell_dep: CellDep) -> Option<CellDep> {
        if let Some(prev) = self.deps.get(&code_hash) {
            log::debug!("replace cell dep {} with {}", prev.name, name);
        }
        self.deps
            .insert(code_hash, RegisteredDep { name, cell_dep })
            .map(|prev| prev.cell_dep)
    }

    pub fn get(&self, code_hash: &H256) -> Option<&CellDep> {
        self.deps.get(code_hash).map(|dep| &dep.cell_dep)
    }

    pub fn name(&self, code_hash: &H256) -> Option<&str> {
        self.deps.get(code_hash).map(|dep| dep.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}
