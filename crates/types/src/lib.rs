mod capacity;
mod cell;
pub mod error;
mod transaction;

pub use capacity::*;
pub use cell::*;
pub use transaction::*;

pub use ckb_types::{bytes, core, packed, prelude, H256};
