use thiserror::Error;

/// Failure taxonomy for editing operations.
///
/// Every variant is caught at the command dispatcher boundary, logged, and
/// turned into a no-op edit; nothing here ever reaches the host application
/// as a crash or an error dialog.
#[derive(Debug, Error)]
pub enum EditError {
    /// An operation that needs a live selection was invoked without one.
    /// The operation is skipped.
    #[error("no live selection for `{op}`")]
    SelectionUnavailable { op: &'static str },

    /// An expected ancestor or block was not found. The operation aborts
    /// and the normalizer is re-run defensively.
    #[error("tree inconsistency in `{op}`: {detail}")]
    TreeInconsistency { op: &'static str, detail: String },

    /// Insertion of an unregistered custom block type was requested.
    #[error("no descriptor registered for custom block type `{0}`")]
    DescriptorMissing(String),

    /// A payload failed to parse or round-trip. The affected block is kept
    /// in a degraded read-only presentation.
    #[error("serialization failure: {0}")]
    SerializationFailure(String),

    /// `exec` was handed an operation name it does not know.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    /// `exec` was handed arguments the named operation cannot use.
    #[error("invalid argument for `{op}`: {detail}")]
    InvalidArgument { op: &'static str, detail: String },
}
