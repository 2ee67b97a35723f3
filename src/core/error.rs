use crate::core::engine::NativeError;
use std::fmt;

/// Universal error type for binding operations.
///
/// Covers argument-shape failures raised before any native call, misuse of
/// released resources, native engine failures, and the "data not fetched
/// yet" condition that progressive documents surface while blocks are still
/// in flight.
#[derive(Debug, Clone)]
pub enum VellumError {
    /// A slice argument had the wrong number of components
    Shape {
        what: &'static str,
        expected: &'static str,
        actual: usize,
    },

    /// A wrapper was constructed from a null (zero) native handle
    NullHandle(&'static str),

    /// A resource was used after its handle had been released
    Closed(&'static str),

    /// A structured-format operation was invoked on a generic document or page
    NotStructured(&'static str),

    /// An index fell outside the addressed collection
    OutOfRange { index: usize, len: usize },

    /// Progressive stream block size is not a power of two in the 2^10..=2^24 range
    InvalidBlockSize(u32),

    /// The fetch subsystem was set up outside of an async runtime
    NoAsyncRuntime,

    /// The HTTP transport could not be constructed
    Transport(String),

    /// The engine does not have the requested bytes yet; retry once more
    /// blocks have been fetched (distinct from a hard failure)
    NotReady,

    /// The engine does not implement this entry point
    Unsupported(&'static str),

    /// The engine reported a hard failure
    Native(String),
}

impl fmt::Display for VellumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VellumError::Shape {
                what,
                expected,
                actual,
            } => {
                write!(f, "expected {} with {}, got {}", what, expected, actual)
            }
            VellumError::NullHandle(kind) => {
                write!(f, "null native handle for {}", kind)
            }
            VellumError::Closed(kind) => {
                write!(f, "{} used after release", kind)
            }
            VellumError::NotStructured(op) => {
                write!(f, "{} requires a structured document", op)
            }
            VellumError::OutOfRange { index, len } => {
                write!(f, "index {} out of range for length {}", index, len)
            }
            VellumError::InvalidBlockSize(size) => {
                write!(f, "invalid block size: {}", size)
            }
            VellumError::NoAsyncRuntime => {
                write!(f, "fetch subsystem requires a running async runtime")
            }
            VellumError::Transport(msg) => {
                write!(f, "transport error: {}", msg)
            }
            VellumError::NotReady => {
                write!(f, "data not fetched yet, try again later")
            }
            VellumError::Unsupported(op) => {
                write!(f, "engine does not support {}", op)
            }
            VellumError::Native(msg) => {
                write!(f, "engine error: {}", msg)
            }
        }
    }
}

impl std::error::Error for VellumError {}

impl From<NativeError> for VellumError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::TryLater => VellumError::NotReady,
            NativeError::Failed(msg) => VellumError::Native(msg),
            NativeError::Unsupported(op) => VellumError::Unsupported(op),
        }
    }
}

/// Result type alias for binding operations
pub type VellumResult<T> = Result<T, VellumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_later_maps_to_not_ready() {
        let err: VellumError = NativeError::TryLater.into();
        assert!(matches!(err, VellumError::NotReady));
    }

    #[test]
    fn test_display_distinguishes_retryable() {
        let retry = VellumError::NotReady.to_string();
        let fatal = VellumError::Native("broken xref".to_string()).to_string();
        assert!(retry.contains("try again"));
        assert!(!fatal.contains("try again"));
    }
}
