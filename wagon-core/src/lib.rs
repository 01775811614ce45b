//! Variable-order character word generation library.
//!
//! This crate builds a table of sub-word statistics from a corpus and uses
//! it to synthesize new words:
//! - Character-level tables over every context length, with start and end
//!   sentinels
//! - Multi-order weighted choices favouring the longest known context
//! - Backtracking generation of words of an exact length
//! - Persistence and corpus helpers
//!
//! Generation takes an explicit random generator, so results are
//! reproducible from a seed.

/// Tables, table construction and word generation.
pub mod model;

/// I/O utilities (file loading, word extraction, path helpers).
pub mod io;

/// Error type shared by every operation.
pub mod error;

/// Numeric validators and the weighted draw.
pub mod utils;

pub use error::{WagonError, WagonResult};
pub use model::builder::TableBuilder;
pub use model::generation_input::{GenerationInput, StartMode};
pub use model::generator::{Source, WordGenerator, WordSource};
pub use model::table::{END_CHAR, START_CHAR, Table};
