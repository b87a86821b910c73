pub mod fee;
pub mod signer;
pub mod transaction_skeleton;
pub mod wallet;
