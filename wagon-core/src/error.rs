//! Error types for table construction and word generation.

use thiserror::Error;

/// Errors that can occur while building, loading or generating from a table.
#[derive(Debug, Error)]
pub enum WagonError {
	/// A generation or construction parameter is out of range.
	///
	/// Raised before any search begins.
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),

	/// The backtracking search tried every continuation without reaching
	/// the requested length.
	///
	/// `partial` is the longest prefix the search reached (empty when the
	/// table offers no starting character).
	#[error("cannot generate a word of length {length} (stuck at {partial:?})")]
	GenerationExhausted { length: usize, partial: String },

	/// The caller-level draw budget ran out before the search concluded.
	#[error("draw budget of {0} weighted draws exceeded")]
	BudgetExceeded(usize),

	/// Propagated I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Persisted table could not be encoded or decoded.
	#[error("serialization error: {0}")]
	Serialization(#[from] postcard::Error),
}

impl WagonError {
	/// Shorthand for an exhausted search with no known partial word.
	pub(crate) fn exhausted(length: usize) -> Self {
		Self::GenerationExhausted { length, partial: String::new() }
	}

	/// Returns `true` if this error reports an exhausted search.
	pub fn is_exhausted(&self) -> bool {
		matches!(self, Self::GenerationExhausted { .. })
	}
}

/// Result type for table and generation operations.
pub type WagonResult<T> = Result<T, WagonError>;
