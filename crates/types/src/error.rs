use thiserror::Error;

/// A transaction still spends the output of a predecessor whose hash is not
/// known yet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("input {input_index} references the previous transaction which has no hash yet")]
pub struct UnresolvedReferenceError {
    pub input_index: usize,
}
