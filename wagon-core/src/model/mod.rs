//! Top-level module for the word generation system.
//!
//! This module provides:
//! - The table of sub-word statistics (`Table`), its completeness check and
//!   its multi-order weighted choices
//! - Table construction from a corpus (`TableBuilder`)
//! - Generation configuration (`GenerationInput`)
//! - The backtracking word generator (`WordGenerator`) and the
//!   `WordSource` capability

/// Backtracking generation of words of an exact length.
///
/// Exposes `WordGenerator`, the `WordSource` trait and the `Source` variants.
pub mod generator;

/// Table construction from a corpus of words, sequential or parallel.
pub mod builder;

/// Table of contexts and their weighted successors.
///
/// Holds the completeness check, the multi-order weighted choices and
/// persistence.
pub mod table;

/// Validated parameters of a generation call.
pub mod generation_input;
