use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ckb_crypto::secp::Privkey;
use ckb_types::{
    bytes::Bytes,
    core::{Capacity, ScriptHashType},
    packed::{CellDep, OutPoint, Script, Transaction, WitnessArgs},
    prelude::*,
    H256,
};
use lm_migrator::{
    migrate, BroadcastError, CellDepRegistry, ChainBroadcaster, MigrationBuilder, MigrationError,
};
use lm_rpc_client::traits::{CellSource, Submitter};
use lm_types::{CellPointer, MigrationCell, ONE_CKB};
use lm_utils::{fee::SizeFeeEstimator, wallet::Wallet};

const SUDT_CODE_HASH: [u8; 32] = [5u8; 32];

struct FixedCells(Vec<MigrationCell>);

#[async_trait]
impl CellSource for FixedCells {
    async fn collect(&self, _lock: &Script) -> Result<Vec<MigrationCell>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct MemPool {
    txs: Mutex<Vec<Transaction>>,
    fail_at: Option<usize>,
}

#[async_trait]
impl Submitter for MemPool {
    async fn submit(&self, tx: Transaction) -> Result<H256> {
        let mut txs = self.txs.lock().unwrap();
        if Some(txs.len()) == self.fail_at {
            return Err(anyhow!("tx pool is full"));
        }
        let tx_hash = tx.calc_tx_hash().unpack();
        txs.push(tx);
        Ok(tx_hash)
    }
}

fn wallet() -> Wallet {
    Wallet::try_from(Privkey::from_slice(&[1u8; 32])).unwrap()
}

fn destination() -> Script {
    Script::new_builder()
        .code_hash(H256([2u8; 32]).pack())
        .hash_type(ScriptHashType::Type.into())
        .args(Bytes::from(vec![2u8; 20]).pack())
        .build()
}

fn registry() -> CellDepRegistry {
    let mut registry = CellDepRegistry::new();
    let cell_dep = CellDep::new_builder()
        .out_point(OutPoint::new(H256([6u8; 32]).pack(), 0))
        .build();
    registry.insert("sUDT".to_string(), H256(SUDT_CODE_HASH), cell_dep);
    registry
}

fn cells(lock: &Script, n: u32) -> Vec<MigrationCell> {
    (0..n)
        .map(|i| MigrationCell {
            capacity: Capacity::shannons(100 * ONE_CKB),
            lock: lock.clone(),
            type_: None,
            out_point: Some(CellPointer::resolved(H256([9u8; 32]), i)),
            data: Bytes::new(),
        })
        .collect()
}

fn typed(mut cell: MigrationCell, code_hash: [u8; 32]) -> MigrationCell {
    cell.type_ = Some(
        Script::new_builder()
            .code_hash(code_hash.pack())
            .hash_type(ScriptHashType::Type.into())
            .build(),
    );
    cell.capacity = Capacity::shannons(200 * ONE_CKB);
    cell.data = Bytes::from(1000u128.to_le_bytes().to_vec());
    cell
}

fn builder(wallet: &Wallet, cells: Vec<MigrationCell>) -> MigrationBuilder {
    MigrationBuilder::new(
        Arc::new(FixedCells(cells)),
        wallet.lock_script().clone(),
        destination(),
        registry(),
        Arc::new(SizeFeeEstimator::new(1000)),
    )
}

#[tokio::test]
async fn test_migrate_150_cells_in_two_txs() {
    let wallet = Arc::new(wallet());
    let builder = builder(&wallet, cells(wallet.lock_script(), 150));
    let txs = builder.build_txs(100).await.unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].inputs.len(), 100);
    assert_eq!(txs[1].inputs.len(), 51);

    let pool = Arc::new(MemPool::default());
    let broadcaster = ChainBroadcaster::new(wallet.clone(), pool.clone());
    let hashes = broadcaster.submit_chain(txs).await.unwrap();
    assert_eq!(hashes.len(), 2);

    let submitted = pool.txs.lock().unwrap();
    let first = submitted[0].raw();
    let second = submitted[1].raw();

    // the carried fee cell is spent by the resolved hash, never the zero hash
    let carried = second.inputs().get(50).unwrap().previous_output();
    assert_eq!(carried.tx_hash(), hashes[0].pack());
    let index: u32 = carried.index().unpack();
    assert_eq!(index, 99);
    assert_ne!(carried.tx_hash(), H256::default().pack());

    let change = first.outputs().get(99).unwrap();
    assert_eq!(change.lock(), *wallet.lock_script());
    for i in 0..99 {
        assert_eq!(first.outputs().get(i).unwrap().lock(), destination());
    }
    for output in second.outputs().into_iter() {
        assert_eq!(output.lock(), destination());
    }

    // one signature per tx, since every input shares the wallet lock
    for tx in submitted.iter() {
        let first_witness = tx.witnesses().get(0).unwrap().raw_data();
        let witness = WitnessArgs::from_slice(&first_witness).unwrap();
        assert!(witness.lock().to_opt().is_some());
        assert!(tx
            .witnesses()
            .into_iter()
            .skip(1)
            .all(|w| w.raw_data().is_empty()));
    }
}

#[tokio::test]
async fn test_migrate_skips_unknown_type() {
    let wallet = Arc::new(wallet());
    let mut cells = cells(wallet.lock_script(), 4);
    cells[0] = typed(cells[0].clone(), SUDT_CODE_HASH);
    cells[1] = typed(cells[1].clone(), [7u8; 32]);

    let pool = Arc::new(MemPool::default());
    let broadcaster = ChainBroadcaster::new(wallet.clone(), pool.clone());
    let hashes = migrate(&builder(&wallet, cells), &broadcaster, 100)
        .await
        .unwrap();
    assert_eq!(hashes.len(), 1);

    let submitted = pool.txs.lock().unwrap();
    let raw = submitted[0].raw();
    assert_eq!(raw.inputs().len(), 3);
    assert_eq!(raw.cell_deps().len(), 1);
    assert_eq!(
        raw.cell_deps().get(0).unwrap().out_point().tx_hash(),
        H256([6u8; 32]).pack()
    );
    let unknown = H256([7u8; 32]).pack();
    assert!(raw
        .outputs()
        .into_iter()
        .all(|o| o.type_().to_opt().map(|t| t.code_hash()) != Some(unknown.clone())));
}

#[tokio::test]
async fn test_migrate_nothing() {
    let wallet = Arc::new(wallet());
    let pool = Arc::new(MemPool::default());
    let broadcaster = ChainBroadcaster::new(wallet.clone(), pool.clone());
    let hashes = migrate(&builder(&wallet, vec![]), &broadcaster, 100)
        .await
        .unwrap();
    assert!(hashes.is_empty());
    assert!(pool.txs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_migrate_rejects_cell_limit_one() {
    let wallet = Arc::new(wallet());
    let broadcaster = ChainBroadcaster::new(wallet.clone(), Arc::new(MemPool::default()));
    let builder = builder(&wallet, cells(wallet.lock_script(), 3));
    let err = migrate(&builder, &broadcaster, 1).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MigrationError>(),
        Some(MigrationError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_migrate_partial_failure() {
    let wallet = Arc::new(wallet());
    let pool = Arc::new(MemPool {
        fail_at: Some(1),
        ..Default::default()
    });
    let broadcaster = ChainBroadcaster::new(wallet.clone(), pool.clone());
    let builder = builder(&wallet, cells(wallet.lock_script(), 30));
    let err = migrate(&builder, &broadcaster, 10).await.unwrap_err();
    let err = err.downcast_ref::<BroadcastError>().unwrap();
    assert_eq!(err.failed_index, 1);
    assert_eq!(err.confirmed.len(), 1);
    let first: H256 = pool.txs.lock().unwrap()[0].calc_tx_hash().unpack();
    assert_eq!(err.confirmed[0], first);
}
