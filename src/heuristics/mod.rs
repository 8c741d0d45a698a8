//! Heuristics module for the ATSP.
//!
//! This module exports the construction heuristics and the metaheuristics.

pub mod construction;
pub mod local_search;
pub mod genetic;

pub use construction::*;
pub use local_search::*;
pub use genetic::*;
