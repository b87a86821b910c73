/// Default number of inputs of a migration transaction
pub const DEFAULT_CELL_LIMIT: usize = 100;
/// Default fee rate, shannons per KB
pub const DEFAULT_FEE_RATE: u64 = 1000;
