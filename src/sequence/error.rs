use super::SequenceKey;
use thiserror::Error;

/// Recoverable failures of the sequence API
///
/// Every variant is raised before the tree is touched, so a failed call
/// leaves the structure exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("malformed transfer object at {path}: neither a track id nor a nested list")]
    MalformedInput { path: String },

    #[error("unknown sequence {0}")]
    UnknownSequence(SequenceKey),

    #[error("sequence {0} is embedded in another sequence and cannot be released")]
    Embedded(SequenceKey),
}
