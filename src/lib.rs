//! ATSP Solver Library
//!
//! Solvers for the Asymmetric Traveling Salesman Problem over a dense
//! directed integer cost matrix.
//!
//! # Features
//!
//! - Exact solvers: best-first branch and bound with row/column reduction and
//!   an MST bound, Held-Karp dynamic programming, brute force
//! - Construction heuristics (nearest neighbour, best greedy start, random)
//! - Metaheuristics (Tabu Search, Simulated Annealing, Genetic Algorithm)
//! - Research harness writing CSV tables and convergence traces
//!
//! # Example
//!
//! ```no_run
//! use atsp_solver::matrix::CostMatrix;
//! use atsp_solver::exact::branch_and_bound;
//! use atsp_solver::heuristics::local_search::{LocalSearch, TabuSearch};
//!
//! // Load a matrix
//! let matrix = CostMatrix::from_file("ftv33.atsp").unwrap();
//!
//! // Solve to optimality
//! let optimal = branch_and_bound::solve(&matrix).unwrap();
//!
//! // Or search heuristically
//! let tabu = TabuSearch::default().solve(&matrix);
//!
//! println!("optimal {} / tabu {}", optimal.cost, tabu.cost);
//! ```

pub mod error;
pub mod matrix;
pub mod solution;
pub mod heuristics;
pub mod exact;
pub mod benchmark;

pub use error::{AtspError, Result};
pub use matrix::{CostMatrix, NO_EDGE};
pub use solution::Solution;
