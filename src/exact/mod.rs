//! Exact solvers module.
//!
//! Three solvers share the same contract: an optimal tour starting at city 0,
//! or an error when the instance admits no tour or exceeds the solver's size
//! limit.

pub mod branch_and_bound;
pub mod brute_force;
pub mod dynamic_programming;

pub use branch_and_bound::{BranchAndBound, BranchAndBoundConfig, BranchAndBoundResult, SearchStatistics};
pub use brute_force::BruteForce;
pub use dynamic_programming::HeldKarp;
