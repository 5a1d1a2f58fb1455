//! Error taxonomy for tree clock operations.
//!
//! Every failure mode in the crate maps to exactly one [`Error`] kind.
//! Operations are transactional: on any error the caller's inputs are
//! unchanged and nothing half-built escapes.

/// Errors surfaced by stamp operations and the binary codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Absent or malformed input: empty buffer, nonsensical framing,
    /// truncated payload, trailing bytes.
    #[error("invalid parameter: input is absent, truncated, or malformed")]
    InvalidParameter,

    /// An output buffer cannot hold the serialized payload.
    #[error("insufficient resources: output buffer cannot hold the payload")]
    InsufficientResources,

    /// An identity tree is not in normal form.
    #[error("corrupt identity tree")]
    CorruptId,

    /// An event tree is not in normal form, or its header bytes are
    /// malformed on the wire.
    #[error("corrupt event tree")]
    CorruptEvent,

    /// A serialized stamp is missing its identity or event section.
    #[error("corrupt stamp: missing identity or event component")]
    CorruptStamp,

    /// Two identity trees claim overlapping parts of the interval.
    #[error("identity intervals overlap")]
    OverlappingInterval,

    /// An event operation would exceed the counter width.
    #[error("event counter overflow")]
    CounterOverflow,

    /// A serialized payload was produced by a newer library major
    /// version than this build understands.
    #[error("incompatible version tag {0}")]
    IncompatibleVersion(u8),

    /// A serialized event counter is wider than this build's counter.
    #[error("unsupported counter size: {0} bytes")]
    UnsupportedCounterSize(u8),
}
