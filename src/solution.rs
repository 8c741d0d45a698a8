//! Solution representation and manipulation for the ATSP.
//!
//! This module provides the tour container shared by every solver, the move
//! primitives used by the metaheuristics, and the tour file format.

use crate::error::{AtspError, Result};
use crate::matrix::CostMatrix;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One sample of a solver's best cost over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    /// Seconds since the solver started
    pub elapsed: f64,
    /// Best tour cost known at that moment
    pub cost: i64,
}

/// Represents a solution to the ATSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of city indices starting at 0 (the return edge is implicit)
    pub tour: Vec<usize>,
    /// Total tour cost, `i64::MAX` while no tour is known
    pub cost: i64,
    /// Whether every edge of the tour exists
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Best-cost samples recorded while searching
    #[serde(default)]
    pub convergence: Vec<ConvergencePoint>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: i64::MAX,
            feasible: false,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
            convergence: Vec::new(),
        }
    }

    /// Create a solution from a tour, pricing it on the matrix.
    ///
    /// Infeasible tours keep their penalized cost so that metaheuristics can
    /// still rank them.
    pub fn from_tour(matrix: &CostMatrix, tour: Vec<usize>, algorithm: &str) -> Self {
        let (cost, feasible) = match matrix.tour_cost(&tour) {
            Some(cost) => (cost, true),
            None => (matrix.penalized_tour_cost(&tour), false),
        };

        Solution {
            tour,
            cost,
            feasible,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
            convergence: Vec::new(),
        }
    }

    /// Recompute cost and feasibility after the tour was edited.
    pub fn evaluate(&mut self, matrix: &CostMatrix) {
        match matrix.tour_cost(&self.tour) {
            Some(cost) => {
                self.cost = cost;
                self.feasible = true;
            }
            None => {
                self.cost = matrix.penalized_tour_cost(&self.tour);
                self.feasible = false;
            }
        }
    }

    /// Check that every city is visited exactly once, starting at 0.
    pub fn is_complete(&self, matrix: &CostMatrix) -> bool {
        validate_tour(&self.tour, matrix.size()).is_ok()
    }

    /// Record a convergence sample if the cost improved on the last one.
    pub fn record(&mut self, elapsed: f64, cost: i64) {
        if self.convergence.last().map_or(true, |p| cost < p.cost) {
            self.convergence.push(ConvergencePoint { elapsed, cost });
        }
    }

    /// Change in penalized cost caused by swapping the cities at positions `i` and `j`.
    pub fn swap_delta(&self, matrix: &CostMatrix, i: usize, j: usize) -> i64 {
        let n = self.tour.len();
        if i == j || n < 3 {
            return 0;
        }

        // Edge k leaves position k. Only edges touching i or j change.
        let mut edges = [(i + n - 1) % n, i, (j + n - 1) % n, j];
        edges.sort_unstable();
        let mut touched: Vec<usize> = edges.to_vec();
        touched.dedup();

        let position = |p: usize| {
            if p == i {
                self.tour[j]
            } else if p == j {
                self.tour[i]
            } else {
                self.tour[p]
            }
        };

        let mut delta = 0;
        for &k in &touched {
            let next = (k + 1) % n;
            delta -= matrix.penalized_cost(self.tour[k], self.tour[next]);
            delta += matrix.penalized_cost(position(k), position(next));
        }
        delta
    }

    /// Apply a swap move
    pub fn apply_swap(&mut self, i: usize, j: usize) {
        self.tour.swap(i, j);
    }

    /// Reverse the segment between positions `i` and `j` inclusive
    pub fn apply_inversion(&mut self, i: usize, j: usize) {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        self.tour[lo..=hi].reverse();
    }

    /// Write the tour file: the city count, then the closed tour one city per line.
    ///
    /// The file is named after the algorithm and the current time and placed in `dir`.
    pub fn save_tour<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let stamp = chrono::Local::now().format("%d_%H_%M_%S");
        let algorithm = if self.algorithm.is_empty() {
            "tour".to_string()
        } else {
            self.algorithm.replace(|c: char| !c.is_ascii_alphanumeric(), "_")
        };

        fs::create_dir_all(&dir)?;
        let path = dir.as_ref().join(format!("{}_{}.txt", algorithm, stamp));
        self.write_tour(&path)?;
        Ok(path)
    }

    /// Write the tour file to an explicit path.
    pub fn write_tour<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = format!("{}\n", self.tour.len());
        for city in self.tour.iter().chain(self.tour.first()) {
            out.push_str(&city.to_string());
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Read a tour file, returning the open tour (the trailing start city is dropped).
    pub fn load_tour<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
        let text = fs::read_to_string(path)?;
        let mut values = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: usize = line.parse().map_err(|_| AtspError::Parse {
                line: idx + 1,
                message: format!("invalid city index '{}'", line),
            })?;
            values.push(value);
        }

        let (&count, cities) = values.split_first().ok_or(AtspError::Parse {
            line: 1,
            message: "empty tour file".to_string(),
        })?;

        let mut tour = cities.to_vec();
        if tour.len() == count + 1 && tour.first() == tour.last() {
            tour.pop();
        }
        if tour.len() != count {
            return Err(AtspError::InvalidTour(format!(
                "header announces {} cities, file lists {}",
                count,
                tour.len()
            )));
        }
        validate_tour(&tour, count)?;
        Ok(tour)
    }
}

/// Check that `tour` is a permutation of `0..size` starting at city 0.
pub fn validate_tour(tour: &[usize], size: usize) -> Result<()> {
    if tour.len() != size {
        return Err(AtspError::InvalidTour(format!(
            "tour visits {} cities, expected {}",
            tour.len(),
            size
        )));
    }
    if tour.first() != Some(&0) {
        return Err(AtspError::InvalidTour("tour must start at city 0".to_string()));
    }

    let mut seen = vec![false; size];
    for &city in tour {
        if city >= size || seen[city] {
            return Err(AtspError::InvalidTour(format!(
                "city {} is out of range or repeated",
                city
            )));
        }
        seen[city] = true;
    }
    Ok(())
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {}", self.cost)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        let cities: Vec<String> = self
            .tour
            .iter()
            .chain(self.tour.first())
            .map(|c| c.to_string())
            .collect();
        writeln!(f, "  Tour: {}", cities.join(" -> "))
    }
}
