use ckb_types::{
    bytes::Bytes,
    core::Capacity,
    packed::{Byte32, CellInput, CellOutput, OutPoint, Script},
    prelude::*,
    H256,
};

use crate::error::UnresolvedReferenceError;

/// Hash of the transaction which created a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TxHashRef {
    Resolved(H256),
    /// The previous transaction of the chain, not submitted yet.
    PendingPrevious,
}

impl TxHashRef {
    pub fn is_pending(&self) -> bool {
        matches!(self, TxHashRef::PendingPrevious)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellPointer {
    pub tx_hash: TxHashRef,
    pub index: u32,
}

impl CellPointer {
    pub fn resolved(tx_hash: H256, index: u32) -> Self {
        CellPointer {
            tx_hash: TxHashRef::Resolved(tx_hash),
            index,
        }
    }

    pub fn pending_previous(index: u32) -> Self {
        CellPointer {
            tx_hash: TxHashRef::PendingPrevious,
            index,
        }
    }

    pub fn to_out_point(&self) -> Option<OutPoint> {
        match &self.tx_hash {
            TxHashRef::Resolved(hash) => Some(OutPoint::new(hash.pack(), self.index)),
            TxHashRef::PendingPrevious => None,
        }
    }

    // Same serialized size as the real out point.
    pub(crate) fn to_placeholder_out_point(&self) -> OutPoint {
        self.to_out_point()
            .unwrap_or_else(|| OutPoint::new(Byte32::zero(), self.index))
    }
}

impl From<OutPoint> for CellPointer {
    fn from(out_point: OutPoint) -> Self {
        CellPointer::resolved(out_point.tx_hash().unpack(), out_point.index().unpack())
    }
}

/// A live cell snapshot, or an output about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationCell {
    pub capacity: Capacity,
    pub lock: Script,
    pub type_: Option<Script>,
    pub out_point: Option<CellPointer>,
    pub data: Bytes,
}

impl MigrationCell {
    pub fn from_output(output: CellOutput, data: Bytes, out_point: Option<CellPointer>) -> Self {
        MigrationCell {
            capacity: Capacity::shannons(output.capacity().unpack()),
            lock: output.lock(),
            type_: output.type_().to_opt(),
            out_point,
            data,
        }
    }

    pub fn output(&self) -> CellOutput {
        CellOutput::new_builder()
            .capacity(self.capacity.pack())
            .lock(self.lock.clone())
            .type_(self.type_.clone().pack())
            .build()
    }

    /// Minimal capacity required to store this cell on chain.
    pub fn occupied_capacity(&self) -> Capacity {
        // Data length is bounded by the block size, the product cannot overflow.
        let data_capacity = Capacity::bytes(self.data.len()).unwrap_or(Capacity::zero());
        self.output()
            .occupied_capacity(data_capacity)
            .unwrap_or_else(|_| Capacity::shannons(u64::MAX))
    }

    /// Capacity which could be spent as fee without making the cell invalid.
    pub fn available_fee(&self) -> Capacity {
        self.capacity
            .safe_sub(self.occupied_capacity())
            .unwrap_or_else(|_| Capacity::zero())
    }

    pub fn is_plain(&self) -> bool {
        self.type_.is_none()
    }

    /// Same cell content under another lock, as a fresh output.
    pub fn reowned(&self, lock: Script) -> Self {
        MigrationCell {
            capacity: self.capacity,
            lock,
            type_: self.type_.clone(),
            out_point: None,
            data: self.data.clone(),
        }
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_out_point(mut self, out_point: CellPointer) -> Self {
        self.out_point = Some(out_point);
        self
    }

    pub(crate) fn input(&self, index: usize) -> Result<CellInput, UnresolvedReferenceError> {
        let out_point = self
            .out_point
            .as_ref()
            .and_then(CellPointer::to_out_point)
            .ok_or(UnresolvedReferenceError { input_index: index })?;
        Ok(CellInput::new(out_point, 0))
    }

    pub(crate) fn placeholder_input(&self) -> CellInput {
        let out_point = self
            .out_point
            .as_ref()
            .map(CellPointer::to_placeholder_out_point)
            .unwrap_or_default();
        CellInput::new(out_point, 0)
    }
}
