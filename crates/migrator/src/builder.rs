use std::collections::HashSet;
use std::sync::Arc;

use ckb_types::{
    core::Capacity,
    packed::{CellDep, Script},
    prelude::*,
    H256,
};
use lm_rpc_client::traits::CellSource;
use lm_types::{CellPointer, HumanCapacity, MigrationCell, MigrationTransaction};
use lm_utils::fee::FeeEstimator;

use crate::error::MigrationError;
use crate::registry::CellDepRegistry;

/// Cells with more spare capacity than this can pay fees.
pub const FEE_THRESHOLD: u64 = 1_000_000;
/// Added on top of every estimated fee.
pub const FEE_SAFETY_MARGIN: u64 = 100_000;

pub struct MigrationBuilder {
    source: Arc<dyn CellSource>,
    source_lock: Script,
    destination: Script,
    registry: CellDepRegistry,
    estimator: Arc<dyn FeeEstimator>,
}

impl MigrationBuilder {
    pub fn new(
        source: Arc<dyn CellSource>,
        source_lock: Script,
        destination: Script,
        registry: CellDepRegistry,
        estimator: Arc<dyn FeeEstimator>,
    ) -> Self {
        MigrationBuilder {
            source,
            source_lock,
            destination,
            registry,
            estimator,
        }
    }

    /// Collect the cells of the source lock and plan the transactions moving
    /// them to the destination lock.
    pub async fn build_txs(
        &self,
        cell_limit: usize,
    ) -> Result<Vec<MigrationTransaction>, MigrationError> {
        check_cell_limit(cell_limit)?;
        let cells = self
            .source
            .collect(&self.source_lock)
            .await
            .map_err(MigrationError::Collector)?;
        log::info!("collected {} cells of the source lock", cells.len());

        plan_migration(
            cells,
            &self.registry,
            &self.destination,
            self.estimator.as_ref(),
            cell_limit,
        )
    }
}

/// Batch `cells` into transactions of at most `cell_limit` inputs.
///
/// A single transaction pays its fee from its last input, the cell with the
/// most spare capacity. Larger sets are chained: the fee cell travels through
/// every transaction as the last input and comes back as the last output,
/// referenced by the next transaction as a pending output of its predecessor.
pub fn plan_migration(
    cells: Vec<MigrationCell>,
    registry: &CellDepRegistry,
    destination: &Script,
    estimator: &dyn FeeEstimator,
    cell_limit: usize,
) -> Result<Vec<MigrationTransaction>, MigrationError> {
    check_cell_limit(cell_limit)?;

    let (cells, cell_deps) = select_cells(cells, registry);
    if cells.is_empty() {
        log::info!("no cells to migrate");
        return Ok(Vec::new());
    }

    let total = cells.len();
    let (mut sufficient, insufficient): (Vec<_>, Vec<_>) =
        cells.into_iter().partition(is_fee_sufficient);
    sufficient.sort_by_key(MigrationCell::available_fee);
    log::debug!(
        "{} cells can pay fees, {} can not",
        sufficient.len(),
        insufficient.len()
    );

    let fee_cell = match sufficient.pop() {
        Some(cell) => cell,
        None => return Err(MigrationError::InsufficientFunds { cells: total }),
    };

    if total <= cell_limit {
        let mut inputs = insufficient;
        inputs.extend(sufficient);
        inputs.push(fee_cell);
        let tx = build_tx(inputs, destination, destination, &cell_deps, estimator)?;
        return Ok(vec![tx]);
    }

    let payload: Vec<_> = sufficient.into_iter().chain(insufficient).collect();
    let batches: Vec<_> = payload.chunks(cell_limit - 1).collect();
    let mut txs = Vec::with_capacity(batches.len());
    let mut fee_cell = fee_cell;
    for (i, batch) in batches.iter().enumerate() {
        let change_lock = if i + 1 == batches.len() {
            destination.clone()
        } else {
            fee_cell.lock.clone()
        };
        let mut inputs = batch.to_vec();
        inputs.push(fee_cell);
        let tx = build_tx(inputs, destination, &change_lock, &cell_deps, estimator)?;

        let change_index = tx.outputs.len() - 1;
        fee_cell = tx.outputs[change_index]
            .clone()
            .with_out_point(CellPointer::pending_previous(change_index as u32));
        txs.push(tx);
    }
    log::info!("planned {} chained txs for {} cells", txs.len(), total);

    Ok(txs)
}

fn check_cell_limit(cell_limit: usize) -> Result<(), MigrationError> {
    if cell_limit <= 1 {
        return Err(MigrationError::InvalidArgument(format!(
            "cell limit must be greater than 1, got {}",
            cell_limit
        )));
    }
    Ok(())
}

/// Typed cells never pay fees.
fn is_fee_sufficient(cell: &MigrationCell) -> bool {
    cell.is_plain() && cell.available_fee() > Capacity::shannons(FEE_THRESHOLD)
}

/// Drop cells whose type script has no known dep and collect the deps of the
/// rest, first seen first.
fn select_cells(
    cells: Vec<MigrationCell>,
    registry: &CellDepRegistry,
) -> (Vec<MigrationCell>, Vec<CellDep>) {
    let mut selected = Vec::with_capacity(cells.len());
    let mut cell_deps = Vec::new();
    let mut seen: HashSet<H256> = HashSet::new();
    for cell in cells {
        let code_hash: H256 = match cell.type_.as_ref() {
            Some(type_) => type_.code_hash().unpack(),
            None => {
                selected.push(cell);
                continue;
            }
        };
        match registry.get(&code_hash) {
            Some(cell_dep) => {
                if seen.insert(code_hash.clone()) {
                    log::debug!(
                        "add cell dep of {}",
                        registry.name(&code_hash).unwrap_or("unnamed type")
                    );
                    cell_deps.push(cell_dep.clone());
                }
                selected.push(cell);
            }
            None => {
                log::debug!(
                    "skip cell {:?} with unknown type {:#x}",
                    cell.out_point,
                    code_hash
                );
            }
        }
    }
    (selected, cell_deps)
}

/// All inputs but the last move to `destination`, the last one pays the fee
/// and is owned by `payer_lock` afterwards.
fn build_tx(
    inputs: Vec<MigrationCell>,
    destination: &Script,
    payer_lock: &Script,
    cell_deps: &[CellDep],
    estimator: &dyn FeeEstimator,
) -> Result<MigrationTransaction, MigrationError> {
    let mut outputs: Vec<_> = inputs
        .iter()
        .map(|cell| cell.reowned(destination.clone()))
        .collect();
    if let (Some(payer), Some(last)) = (inputs.last(), outputs.last_mut()) {
        *last = payer.reowned(payer_lock.clone());
    }
    let draft = MigrationTransaction::new(inputs, outputs, cell_deps.to_vec());

    let margin = Capacity::shannons(FEE_SAFETY_MARGIN);
    let fee = estimator.estimate_fee(&draft).safe_add(margin)?;
    let tx = charge_fee(draft.clone(), fee)?;

    // the signed size must not outgrow what was charged
    let final_fee = estimator.estimate_fee(&tx).safe_add(margin)?;
    if final_fee > fee {
        log::debug!(
            "recharge tx fee {} -> {}",
            HumanCapacity::from(fee),
            HumanCapacity::from(final_fee)
        );
        return charge_fee(draft, final_fee);
    }
    Ok(tx)
}

fn charge_fee(
    mut tx: MigrationTransaction,
    fee: Capacity,
) -> Result<MigrationTransaction, MigrationError> {
    if let Some(payer) = tx.outputs.pop() {
        tx.outputs.push(deduct_fee(payer, fee)?);
    }
    Ok(tx)
}

fn deduct_fee(cell: MigrationCell, fee: Capacity) -> Result<MigrationCell, MigrationError> {
    let exceeds = || MigrationError::FeeExceedsCapacity {
        capacity: HumanCapacity::from(cell.capacity),
        fee: HumanCapacity::from(fee),
    };
    let capacity = cell.capacity.safe_sub(fee).map_err(|_| exceeds())?;
    if capacity < cell.occupied_capacity() {
        return Err(exceeds());
    }
    Ok(cell.with_capacity(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckb_types::{bytes::Bytes, core::ScriptHashType};
    use lm_types::{TxHashRef, ONE_CKB};
    use lm_utils::fee::SizeFeeEstimator;

    fn source_lock() -> Script {
        Script::new_builder()
            .code_hash(H256([1u8; 32]).pack())
            .hash_type(ScriptHashType::Type.into())
            .args(Bytes::from(vec![1u8; 20]).pack())
            .build()
    }

    fn destination() -> Script {
        Script::new_builder()
            .code_hash(H256([2u8; 32]).pack())
            .hash_type(ScriptHashType::Type.into())
            .args(Bytes::from(vec![2u8; 20]).pack())
            .build()
    }

    fn type_script(code_hash: u8) -> Script {
        Script::new_builder()
            .code_hash(H256([code_hash; 32]).pack())
            .hash_type(ScriptHashType::Type.into())
            .args(Bytes::from(vec![code_hash; 32]).pack())
            .build()
    }

    fn cell(index: u32, shannons: u64) -> MigrationCell {
        MigrationCell {
            capacity: Capacity::shannons(shannons),
            lock: source_lock(),
            type_: None,
            out_point: Some(CellPointer::resolved(H256([9u8; 32]), index)),
            data: Bytes::new(),
        }
    }

    fn cells(n: u32) -> Vec<MigrationCell> {
        (0..n).map(|i| cell(i, 100 * ONE_CKB)).collect()
    }

    fn registry() -> CellDepRegistry {
        let mut registry = CellDepRegistry::new();
        registry.insert("sUDT".to_string(), H256([5u8; 32]), CellDep::default());
        registry
    }

    fn plan(
        cells: Vec<MigrationCell>,
        cell_limit: usize,
    ) -> Result<Vec<MigrationTransaction>, MigrationError> {
        let estimator = SizeFeeEstimator::new(1000);
        plan_migration(cells, &registry(), &destination(), &estimator, cell_limit)
    }

    fn lock_of(cell: &MigrationCell) -> Script {
        cell.lock.clone()
    }

    #[test]
    fn test_reject_small_cell_limit() {
        for limit in [0, 1] {
            let err = plan(cells(3), limit).unwrap_err();
            assert!(matches!(err, MigrationError::InvalidArgument(_)), "{}", limit);
        }
    }

    #[test]
    fn test_empty_cells() {
        assert!(plan(vec![], 100).unwrap().is_empty());
    }

    #[test]
    fn test_insufficient_funds() {
        // 61 CKB is exactly the occupied capacity
        let cells = vec![cell(0, 61 * ONE_CKB), cell(1, 61 * ONE_CKB + FEE_THRESHOLD)];
        let err = plan(cells, 100).unwrap_err();
        assert!(matches!(err, MigrationError::InsufficientFunds { cells: 2 }));
    }

    #[test]
    fn test_single_tx() {
        let mut cells = cells(3);
        cells[1].capacity = Capacity::shannons(500 * ONE_CKB);
        cells.push(cell(3, 61 * ONE_CKB));

        let txs = plan(cells.clone(), 100).unwrap();
        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert_eq!(tx.inputs.len(), 4);
        assert_eq!(tx.outputs.len(), 4);
        assert!(tx.cell_deps.is_empty());

        // insufficient first, the richest cell pays
        assert_eq!(tx.inputs[0].capacity, Capacity::shannons(61 * ONE_CKB));
        assert_eq!(tx.inputs[3].capacity, Capacity::shannons(500 * ONE_CKB));
        assert!(tx.outputs.iter().all(|c| lock_of(c) == destination()));
        assert!(tx.outputs.iter().all(|c| c.out_point.is_none()));

        let fee = tx.fee().unwrap();
        let estimated = SizeFeeEstimator::new(1000).estimate_fee(tx);
        let expected = estimated
            .safe_add(Capacity::shannons(FEE_SAFETY_MARGIN))
            .unwrap();
        assert_eq!(fee, expected);
        assert_eq!(
            tx.outputs_capacity().unwrap(),
            tx.inputs_capacity().unwrap().safe_sub(fee).unwrap()
        );
        for (input, output) in tx.inputs.iter().zip(&tx.outputs).take(3) {
            assert_eq!(input.capacity, output.capacity);
        }
    }

    #[test]
    fn test_typed_cell_never_pays() {
        let mut typed = cell(0, 10_000 * ONE_CKB);
        typed.type_ = Some(type_script(5));
        typed.data = Bytes::from(vec![0u8; 16]);
        let cells = vec![typed.clone(), cell(1, 100 * ONE_CKB)];

        let txs = plan(cells, 100).unwrap();
        let tx = &txs[0];
        assert_eq!(tx.cell_deps.len(), 1);
        assert_eq!(tx.inputs[1].capacity, Capacity::shannons(100 * ONE_CKB));
        assert_eq!(tx.outputs[0].capacity, typed.capacity);
        assert_eq!(tx.outputs[0].type_, typed.type_);
        assert_eq!(tx.outputs[0].data, typed.data);
    }

    #[test]
    fn test_skip_unknown_type() {
        let mut known = cell(0, 100 * ONE_CKB);
        known.type_ = Some(type_script(5));
        let mut known2 = cell(1, 100 * ONE_CKB);
        known2.type_ = Some(type_script(5));
        let mut unknown = cell(2, 100 * ONE_CKB);
        unknown.type_ = Some(type_script(6));
        let cells = vec![known, unknown, known2, cell(3, 100 * ONE_CKB)];

        let txs = plan(cells, 100).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].inputs.len(), 3);
        assert_eq!(txs[0].cell_deps.len(), 1);
        assert!(txs[0]
            .outputs
            .iter()
            .all(|c| c.type_.as_ref() != Some(&type_script(6))));
    }

    #[test]
    fn test_chained_txs() {
        let cells = cells(150);
        let total = cells
            .iter()
            .try_fold(Capacity::zero(), |sum, c| sum.safe_add(c.capacity))
            .unwrap();

        let txs = plan(cells, 100).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].inputs.len(), 100);
        assert_eq!(txs[1].inputs.len(), 51);

        // the first change cell keeps the source lock and is spent next
        let change = txs[0].outputs.last().unwrap();
        assert_eq!(lock_of(change), source_lock());
        assert!(txs[0].outputs[..99].iter().all(|c| lock_of(c) == destination()));
        let carried = txs[1].inputs.last().unwrap();
        assert_eq!(carried.out_point, Some(CellPointer::pending_previous(99)));
        assert_eq!(carried.capacity, change.capacity);
        assert!(!txs[0].has_pending_reference());
        assert!(txs[1].has_pending_reference());
        assert!(txs[1].outputs.iter().all(|c| lock_of(c) == destination()));

        // no capacity is created or destroyed
        let mut fees = Capacity::zero();
        for tx in &txs {
            fees = fees.safe_add(tx.fee().unwrap()).unwrap();
        }
        let migrated = txs
            .iter()
            .flat_map(|tx| tx.outputs.iter())
            .filter(|c| lock_of(c) == destination())
            .try_fold(Capacity::zero(), |sum, c| sum.safe_add(c.capacity))
            .unwrap();
        assert_eq!(migrated.safe_add(fees).unwrap(), total);
    }

    #[test]
    fn test_chained_tx_count() {
        for (n, limit, expected) in [(11, 10, 2), (19, 10, 2), (20, 10, 3), (10, 2, 9)] {
            let txs = plan(cells(n), limit).unwrap();
            assert_eq!(txs.len(), expected, "{} cells, limit {}", n, limit);
            assert!(txs.iter().all(|tx| tx.inputs.len() <= limit));
        }
    }

    #[test]
    fn test_fee_cell_runs_dry() {
        let mut cells: Vec<_> = (0..30).map(|i| cell(i, 61 * ONE_CKB)).collect();
        cells.push(cell(30, 61 * ONE_CKB + 15 * FEE_SAFETY_MARGIN));

        let err = plan(cells, 2).unwrap_err();
        assert!(matches!(err, MigrationError::FeeExceedsCapacity { .. }));
    }

    #[test]
    fn test_chained_txs_share_cell_deps() {
        let mut cells = cells(25);
        for (i, c) in cells.iter_mut().enumerate().filter(|(i, _)| i % 3 == 0) {
            c.type_ = Some(type_script(5));
            c.data = Bytes::from(vec![i as u8; 16]);
            c.capacity = Capacity::shannons(200 * ONE_CKB);
        }

        let txs = plan(cells, 10).unwrap();
        assert_eq!(txs.len(), 3);
        assert!(txs.iter().all(|tx| tx.cell_deps == txs[0].cell_deps));
        assert_eq!(txs[0].cell_deps.len(), 1);
        assert!(txs
            .iter()
            .flat_map(|tx| tx.inputs.iter())
            .any(|c| c.type_.is_some()));
    }

    #[test]
    fn test_equal_fee_keeps_collected_order() {
        let mut cells = cells(7);
        // the fee cell, every other cell has the same spare capacity
        cells.push(cell(7, 500 * ONE_CKB));

        let txs = plan(cells, 4).unwrap();
        let indexes: Vec<u32> = txs
            .iter()
            .flat_map(|tx| tx.inputs[..tx.inputs.len() - 1].iter())
            .map(|c| match c.out_point {
                Some(CellPointer {
                    tx_hash: TxHashRef::Resolved(_),
                    index,
                }) => index,
                _ => panic!("payload cell must be resolved"),
            })
            .collect();
        assert_eq!(indexes, (0..7).collect::<Vec<_>>());
        assert_eq!(txs[0].inputs[3].capacity, Capacity::shannons(500 * ONE_CKB));
    }
}
