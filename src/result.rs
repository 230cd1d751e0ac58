//! Result and error types for live-interval construction.

use crate::liverange::Position;
use thiserror::Error;

/// An error produced when constructing interval data.
///
/// Violations of the interval invariants themselves (ordering, coalescing)
/// are bugs in this crate, reported by assertions rather than errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IntervalError {
    /// A range whose start position lies after its end position.
    #[error("backwards range {start}..{end}")]
    BackwardsRange {
        /// First position of the rejected range.
        start: Position,
        /// Last position of the rejected range.
        end: Position,
    },
}

/// A convenient alias for a `Result` that uses `IntervalError` as the error type.
pub type IntervalResult<T> = Result<T, IntervalError>;
