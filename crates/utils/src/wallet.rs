use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use ckb_crypto::secp::Privkey;
use ckb_hash::{blake2b_256, new_blake2b};
use ckb_types::{
    bytes::Bytes,
    core::ScriptHashType,
    h256,
    packed::{CellDep, Script},
    prelude::*,
    H256,
};
use faster_hex::hex_decode;
use lm_config::Config;
use lm_types::MigrationTransaction;

use crate::signer::{Signer, SignerError};
use crate::transaction_skeleton::{
    placeholder_witnesses, signature_entries, signature_witness, SignatureEntry,
};

pub const SIGHASH_TYPE_HASH: H256 =
    h256!("0x9bd7e06f3ecf4be0f2fcd2188b23f1b9fcc88e5d4b65a8637b17723bbda3cce8");

/// A secp256k1 blake160 sighash-all key.
pub struct Wallet {
    privkey: Privkey,
    lock: Script,
    lock_cell_dep: Option<CellDep>,
}

impl TryFrom<Privkey> for Wallet {
    type Error = ckb_crypto::secp::Error;

    fn try_from(privkey: Privkey) -> Result<Self, Self::Error> {
        let pk = privkey.pubkey()?.serialize();
        let pk160 = &blake2b_256(&pk)[..20];
        Ok(Self {
            lock: Script::new_builder()
                .code_hash(SIGHASH_TYPE_HASH.pack())
                .hash_type(ScriptHashType::Type.into())
                .args(Bytes::from(pk160.to_vec()).pack())
                .build(),
            privkey,
            lock_cell_dep: None,
        })
    }
}

impl Wallet {
    pub fn from_privkey_path(p: &Path) -> Result<Self> {
        let privkey = {
            let content = std::fs::read_to_string(p).context("read wallet privkey")?;
            let content = content.trim().trim_start_matches("0x");
            ensure!(content.as_bytes().len() == 64, "invalid privkey length");
            let mut decoded = [0u8; 32];
            hex_decode(content.as_bytes(), &mut decoded)?;
            Privkey::from_slice(&decoded)
        };
        let wallet = Self::try_from(privkey)?;
        Ok(wallet)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let wallet = Self::from_privkey_path(&config.wallet.privkey_path)?;
        Ok(wallet.with_lock_cell_dep(config.lock_cell_dep().map(Into::into)))
    }

    pub fn with_lock_cell_dep(mut self, cell_dep: Option<CellDep>) -> Self {
        self.lock_cell_dep = cell_dep;
        self
    }

    pub fn lock_script(&self) -> &Script {
        &self.lock
    }

    // sign message
    pub fn sign_message(&self, msg: [u8; 32]) -> Result<[u8; 65]> {
        let signature = self
            .privkey
            .sign_recoverable(&msg.into())
            .map_err(|err| anyhow!("signing error: {}", err))?;
        let mut inner = [0u8; 65];
        inner.copy_from_slice(&signature.serialize());
        Ok(inner)
    }
}

#[async_trait]
impl Signer for Wallet {
    async fn sign(
        &self,
        mut tx: MigrationTransaction,
    ) -> Result<MigrationTransaction, SignerError> {
        if let Some(dep) = self.lock_cell_dep.as_ref() {
            if !tx.cell_deps.iter().any(|d| d.as_slice() == dep.as_slice()) {
                tx.cell_deps.push(dep.clone());
            }
        }

        let tx_hash = tx
            .hash()
            .map_err(|err| SignerError::InvalidTransaction(err.to_string()))?;
        let lock_hash = self.lock.calc_script_hash();
        let entries = signature_entries(&tx);
        let mut witnesses = placeholder_witnesses(&tx, &entries);
        log::debug!("sign {} lock groups of tx {:#x}", entries.len(), tx_hash);
        for entry in &entries {
            if entry.lock_hash != lock_hash {
                return Err(SignerError::IdNotFound);
            }
            let message = sighash_all_message(&tx_hash, &witnesses, entry, tx.inputs.len());
            let signature = self.sign_message(message)?;
            witnesses[entry.indexes[0]] = signature_witness(&signature);
        }
        tx.witnesses = witnesses;
        Ok(tx)
    }
}

/// tx hash, then each witness of the group and the witnesses beyond the
/// inputs, every witness prefixed by its u64 length
pub fn sighash_all_message(
    tx_hash: &H256,
    witnesses: &[Bytes],
    entry: &SignatureEntry,
    inputs_len: usize,
) -> [u8; 32] {
    let mut hasher = new_blake2b();
    hasher.update(tx_hash.as_bytes());
    let group_witnesses = entry.indexes.iter().filter_map(|&i| witnesses.get(i));
    let extra_witnesses = witnesses.iter().skip(inputs_len);
    for witness in group_witnesses.chain(extra_witnesses) {
        hasher.update(&(witness.len() as u64).to_le_bytes());
        hasher.update(witness);
    }
    let mut message = [0u8; 32];
    hasher.finalize(&mut message);
    message
}
