use ckb_types::{
    bytes::Bytes,
    core::{Capacity, CapacityResult},
    packed::{CellDep, CellInput, RawTransaction, Transaction},
    prelude::*,
    H256,
};

use crate::cell::{MigrationCell, TxHashRef};
use crate::error::UnresolvedReferenceError;

/// A transaction whose inputs are still known by content, so it can be
/// inspected and chained before it is signed.
#[derive(Debug, Clone, Default)]
pub struct MigrationTransaction {
    pub inputs: Vec<MigrationCell>,
    pub outputs: Vec<MigrationCell>,
    pub cell_deps: Vec<CellDep>,
    /// Witness bytes, empty until signed.
    pub witnesses: Vec<Bytes>,
}

impl MigrationTransaction {
    pub fn new(
        inputs: Vec<MigrationCell>,
        outputs: Vec<MigrationCell>,
        cell_deps: Vec<CellDep>,
    ) -> Self {
        MigrationTransaction {
            inputs,
            outputs,
            cell_deps,
            witnesses: Vec::new(),
        }
    }

    pub fn inputs_capacity(&self) -> CapacityResult<Capacity> {
        sum_capacity(&self.inputs)
    }

    pub fn outputs_capacity(&self) -> CapacityResult<Capacity> {
        sum_capacity(&self.outputs)
    }

    /// Inputs capacity minus outputs capacity.
    pub fn fee(&self) -> CapacityResult<Capacity> {
        self.inputs_capacity()?.safe_sub(self.outputs_capacity()?)
    }

    pub fn has_pending_reference(&self) -> bool {
        self.inputs.iter().any(|cell| {
            cell.out_point
                .as_ref()
                .map(|p| p.tx_hash.is_pending())
                .unwrap_or(false)
        })
    }

    /// Point every input spending the previous transaction to `tx_hash`.
    /// Returns the number of rewritten inputs.
    pub fn resolve_pending(&mut self, tx_hash: &H256) -> usize {
        let mut resolved = 0;
        for cell in self.inputs.iter_mut() {
            if let Some(pointer) = cell.out_point.as_mut() {
                if pointer.tx_hash.is_pending() {
                    pointer.tx_hash = TxHashRef::Resolved(tx_hash.clone());
                    resolved += 1;
                }
            }
        }
        resolved
    }

    /// Wire form of the transaction.
    pub fn to_packed(&self) -> Result<Transaction, UnresolvedReferenceError> {
        let inputs = self
            .inputs
            .iter()
            .enumerate()
            .map(|(index, cell)| cell.input(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.build_packed(inputs, self.witnesses.clone()))
    }

    /// Same layout as [`to_packed`](Self::to_packed), with pending references
    /// written as the zero hash. Never submit this.
    pub fn to_placeholder_packed(&self, witnesses: Vec<Bytes>) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(MigrationCell::placeholder_input)
            .collect();
        self.build_packed(inputs, witnesses)
    }

    pub fn raw(&self) -> Result<RawTransaction, UnresolvedReferenceError> {
        self.to_packed().map(|tx| tx.raw())
    }

    pub fn hash(&self) -> Result<H256, UnresolvedReferenceError> {
        Ok(self.to_packed()?.calc_tx_hash().unpack())
    }

    fn build_packed(&self, inputs: Vec<CellInput>, witnesses: Vec<Bytes>) -> Transaction {
        let outputs = self
            .outputs
            .iter()
            .map(MigrationCell::output)
            .collect::<Vec<_>>();
        let outputs_data = self
            .outputs
            .iter()
            .map(|cell| cell.data.pack())
            .collect::<Vec<_>>();
        let raw = RawTransaction::new_builder()
            .version(0u32.pack())
            .cell_deps(self.cell_deps.clone().pack())
            .inputs(inputs.pack())
            .outputs(outputs.pack())
            .outputs_data(outputs_data.pack())
            .build();
        let witnesses = witnesses
            .into_iter()
            .map(|witness| witness.pack())
            .collect::<Vec<_>>();
        Transaction::new_builder()
            .raw(raw)
            .witnesses(witnesses.pack())
            .build()
    }
}

fn sum_capacity(cells: &[MigrationCell]) -> CapacityResult<Capacity> {
    cells
        .iter()
        .try_fold(Capacity::zero(), |total, cell| total.safe_add(cell.capacity))
}
