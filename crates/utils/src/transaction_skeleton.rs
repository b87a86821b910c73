use std::collections::HashMap;

use ckb_types::{
    bytes::Bytes,
    packed::{Byte32, WitnessArgs},
    prelude::*,
};
use lm_types::MigrationTransaction;

pub const SECP_SIGNATURE_SIZE: usize = 65;

/// Inputs sharing one lock script, signed together.
#[derive(Clone, Debug)]
pub struct SignatureEntry {
    pub indexes: Vec<usize>,
    pub lock_hash: Byte32,
}

/// Lock groups of the inputs, ordered by their first input.
pub fn signature_entries(tx: &MigrationTransaction) -> Vec<SignatureEntry> {
    let mut entries: Vec<SignatureEntry> = Vec::new();
    let mut positions: HashMap<Byte32, usize> = HashMap::new();
    for (index, input) in tx.inputs.iter().enumerate() {
        let lock_hash = input.lock.calc_script_hash();
        let position = *positions.entry(lock_hash.clone()).or_insert_with(|| {
            entries.push(SignatureEntry {
                indexes: Vec::new(),
                lock_hash,
            });
            entries.len() - 1
        });
        entries[position].indexes.push(index);
    }
    entries
}

pub fn signature_witness(signature: &[u8]) -> Bytes {
    WitnessArgs::new_builder()
        .lock(Some(Bytes::from(signature.to_vec())).pack())
        .build()
        .as_bytes()
}

/// One witness per input; the first input of every lock group carries a
/// zeroed signature, the rest stay empty.
pub fn placeholder_witnesses(tx: &MigrationTransaction, entries: &[SignatureEntry]) -> Vec<Bytes> {
    let mut witnesses = vec![Bytes::new(); tx.inputs.len()];
    for entry in entries {
        if let Some(&first) = entry.indexes.first() {
            witnesses[first] = signature_witness(&[0u8; SECP_SIGNATURE_SIZE]);
        }
    }
    witnesses
}

/// Serialized size once signed, plus 4 bytes of block serialization cost.
pub fn tx_in_block_size(tx: &MigrationTransaction) -> usize {
    let entries = signature_entries(tx);
    let witnesses = placeholder_witnesses(tx, &entries);
    tx.to_placeholder_packed(witnesses).as_slice().len() + 4
}
