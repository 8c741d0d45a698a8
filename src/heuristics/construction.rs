//! Construction heuristics for the ATSP.
//!
//! Every heuristic returns a complete permutation starting at city 0. Tours
//! that need an absent edge come back with `feasible == false` and a
//! penalized cost so that improvement methods can repair them.

use crate::matrix::CostMatrix;
use crate::solution::Solution;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub trait ConstructionHeuristic {
    fn construct(&self, matrix: &CostMatrix) -> Solution;
    fn name(&self) -> &str;
}

/// Greedy walk from `start`, always taking the cheapest edge to an unvisited
/// city (lowest index on ties). Absent edges are only taken when nothing
/// else is left. The result is rotated to begin at city 0.
fn greedy_walk(matrix: &CostMatrix, start: usize) -> Vec<usize> {
    let n = matrix.size();
    let mut visited = vec![false; n];
    let mut tour = Vec::with_capacity(n);
    let mut current = start;
    visited[start] = true;
    tour.push(start);

    while tour.len() < n {
        let next = (0..n)
            .filter(|&c| !visited[c])
            .min_by_key(|&c| (matrix.penalized_cost(current, c), c));
        let Some(next) = next else {
            break;
        };
        visited[next] = true;
        tour.push(next);
        current = next;
    }

    if let Some(zero) = tour.iter().position(|&c| c == 0) {
        tour.rotate_left(zero);
    }
    tour
}

/// Nearest-neighbour tour from `start`, or `None` when the walk gets stuck
/// or the closing edge is absent.
pub fn nearest_neighbor_tour(matrix: &CostMatrix, start: usize) -> Option<Vec<usize>> {
    let tour = greedy_walk(matrix, start);
    matrix.tour_cost(&tour).map(|_| tour)
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly moving to the cheapest unvisited city.
pub struct NearestNeighborHeuristic {
    pub start: usize,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic { start: 0 }
    }

    pub fn from_city(start: usize) -> Self {
        NearestNeighborHeuristic { start }
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, matrix: &CostMatrix) -> Solution {
        let start = std::time::Instant::now();
        let tour = greedy_walk(matrix, self.start.min(matrix.size() - 1));
        let mut solution = Solution::from_tour(matrix, tour, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

/// Best greedy tour
///
/// Runs the nearest-neighbour walk from every city and keeps the cheapest.
pub struct BestGreedyHeuristic;

impl ConstructionHeuristic for BestGreedyHeuristic {
    fn construct(&self, matrix: &CostMatrix) -> Solution {
        let start = std::time::Instant::now();

        let mut best = Solution::new();
        for city in 0..matrix.size() {
            let candidate = Solution::from_tour(matrix, greedy_walk(matrix, city), self.name());
            if (candidate.feasible, -candidate.cost) > (best.feasible, -best.cost) || best.tour.is_empty() {
                best = candidate;
            }
        }

        best.computation_time = start.elapsed().as_secs_f64();
        best
    }

    fn name(&self) -> &str {
        "BestGreedy"
    }
}

/// Uniformly random permutation with city 0 fixed first.
pub fn random_tour<R: Rng>(size: usize, rng: &mut R) -> Vec<usize> {
    let mut tour: Vec<usize> = (0..size).collect();
    if size > 2 {
        tour[1..].shuffle(rng);
    }
    tour
}

/// Random tour heuristic
pub struct RandomTourHeuristic {
    pub seed: u64,
}

impl RandomTourHeuristic {
    pub fn new(seed: u64) -> Self {
        RandomTourHeuristic { seed }
    }
}

impl ConstructionHeuristic for RandomTourHeuristic {
    fn construct(&self, matrix: &CostMatrix) -> Solution {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        Solution::from_tour(matrix, random_tour(matrix.size(), &mut rng), self.name())
    }

    fn name(&self) -> &str {
        "Random"
    }
}
