//! Best-first branch-and-bound for the ATSP.
//!
//! Nodes are ordered by their lower bound in a binary heap. Each node carries
//! its own reduced matrix; children are built from a deep copy, reduced again
//! and bounded with [`bound::combine`]. The incumbent is seeded with the
//! nearest-neighbour tour and only replaced at leaves.
//!
//! ```no_run
//! use atsp_solver::matrix::CostMatrix;
//! use atsp_solver::exact::branch_and_bound;
//!
//! let matrix = CostMatrix::from_file("br17.atsp").unwrap();
//! let solution = branch_and_bound::solve(&matrix).unwrap();
//! println!("{}", solution);
//! ```

pub mod bound;
pub mod node;
pub mod reduction;

pub use node::SearchNode;
pub use reduction::ReducedMatrix;

use crate::error::{AtspError, Result};
use crate::heuristics::construction::nearest_neighbor_tour;
use crate::matrix::CostMatrix;
use crate::solution::Solution;
use log::{debug, info, trace};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Branch-and-bound configuration
#[derive(Debug, Clone)]
pub struct BranchAndBoundConfig {
    /// Stop after this long and return the incumbent (no limit by default)
    pub time_limit: Option<Duration>,
    /// Seed the incumbent with the nearest-neighbour tour
    pub seed_incumbent: bool,
}

impl Default for BranchAndBoundConfig {
    fn default() -> Self {
        BranchAndBoundConfig {
            time_limit: None,
            seed_incumbent: true,
        }
    }
}

/// Counters collected during one search
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStatistics {
    pub nodes_created: usize,
    pub nodes_expanded: usize,
    pub pruned_at_pop: usize,
    pub pruned_at_creation: usize,
    pub leaves_evaluated: usize,
    pub incumbent_updates: usize,
    pub peak_frontier: usize,
}

/// Result of a branch-and-bound run
#[derive(Debug, Clone)]
pub struct BranchAndBoundResult {
    /// Best tour found
    pub solution: Solution,
    pub stats: SearchStatistics,
    /// False when the deadline cut the search short
    pub proven_optimal: bool,
}

/// Heap entry: smallest cost first, then oldest first.
struct FrontierEntry {
    cost: i64,
    seq: u64,
    node: SearchNode,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Incumbent {
    path: Vec<usize>,
    cost: i64,
}

/// Branch-and-bound solver
pub struct BranchAndBound {
    config: BranchAndBoundConfig,
}

impl BranchAndBound {
    pub fn new(config: BranchAndBoundConfig) -> Self {
        BranchAndBound { config }
    }

    pub fn solve(&self, matrix: &CostMatrix) -> Result<BranchAndBoundResult> {
        let start = Instant::now();
        let n = matrix.size();
        let mut stats = SearchStatistics::default();

        if n == 1 {
            let mut solution = Solution::from_tour(matrix, vec![0], "Branch and Bound");
            solution.computation_time = start.elapsed().as_secs_f64();
            return Ok(BranchAndBoundResult {
                solution,
                stats,
                proven_optimal: true,
            });
        }

        info!("Branch and bound on {} ({} cities)", matrix.name, n);

        let mut incumbent = if self.config.seed_incumbent {
            nearest_neighbor_tour(matrix, 0).and_then(|path| {
                matrix.tour_cost(&path).map(|cost| Incumbent { path, cost })
            })
        } else {
            None
        };
        let mut convergence = Vec::new();
        if let Some(inc) = &incumbent {
            debug!("Nearest neighbour upper bound: {}", inc.cost);
            convergence.push((start.elapsed().as_secs_f64(), inc.cost));
        }

        let mut frontier = BinaryHeap::new();
        let mut seq = 0u64;
        let root = SearchNode::root(matrix);
        stats.nodes_created += 1;
        frontier.push(FrontierEntry {
            cost: root.cost(),
            seq,
            node: root,
        });

        let mut timed_out = false;
        while let Some(FrontierEntry { node, .. }) = frontier.pop() {
            if let Some(limit) = self.config.time_limit {
                if start.elapsed() >= limit {
                    timed_out = true;
                    break;
                }
            }

            let bound = incumbent.as_ref().map_or(i64::MAX, |inc| inc.cost);
            if node.cost() >= bound {
                trace!("Pruned {:?} at {} >= {}", node.path(), node.cost(), bound);
                stats.pruned_at_pop += 1;
                continue;
            }

            if node.is_leaf() {
                stats.leaves_evaluated += 1;
                match matrix.tour_cost(node.path()) {
                    Some(cost) if cost < bound => {
                        debug!("New incumbent {} at level {}", cost, node.level());
                        stats.incumbent_updates += 1;
                        convergence.push((start.elapsed().as_secs_f64(), cost));
                        incumbent = Some(Incumbent {
                            path: node.into_path(),
                            cost,
                        });
                    }
                    Some(_) => {}
                    None => trace!("Leaf {:?} has no closing edge", node.path()),
                }
                continue;
            }

            stats.nodes_expanded += 1;
            for to in node.candidates() {
                let Some(child) = node.branch(to) else {
                    continue;
                };
                stats.nodes_created += 1;

                if child.cost() < bound {
                    seq += 1;
                    frontier.push(FrontierEntry {
                        cost: child.cost(),
                        seq,
                        node: child,
                    });
                } else {
                    stats.pruned_at_creation += 1;
                }
            }
            stats.peak_frontier = stats.peak_frontier.max(frontier.len());
        }

        let elapsed = start.elapsed().as_secs_f64();
        let Some(best) = incumbent else {
            return Err(if timed_out {
                AtspError::TimeLimitReached
            } else {
                AtspError::NoFeasibleTour
            });
        };

        info!(
            "Branch and bound finished: cost {} in {:.3}s ({} nodes, {} expanded){}",
            best.cost,
            elapsed,
            stats.nodes_created,
            stats.nodes_expanded,
            if timed_out { ", time limit reached" } else { "" }
        );

        let mut solution = Solution::from_tour(matrix, best.path, "Branch and Bound");
        solution.computation_time = elapsed;
        solution.iterations = Some(stats.nodes_expanded);
        for (t, cost) in convergence {
            solution.record(t, cost);
        }

        Ok(BranchAndBoundResult {
            solution,
            stats,
            proven_optimal: !timed_out,
        })
    }
}

/// Solve to optimality with the default configuration.
pub fn solve(matrix: &CostMatrix) -> Result<Solution> {
    BranchAndBound::new(BranchAndBoundConfig::default())
        .solve(matrix)
        .map(|result| result.solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_matrix() -> CostMatrix {
        CostMatrix::from_rows(vec![
            vec![-1, 10, 15, 20],
            vec![5, -1, 9, 10],
            vec![6, 13, -1, 12],
            vec![8, 8, 9, -1],
        ])
        .unwrap()
    }

    #[test]
    fn test_scenario_optimum() {
        let matrix = create_test_matrix();
        let solution = solve(&matrix).unwrap();

        assert_eq!(solution.cost, 35);
        assert!(solution.feasible);
        assert_eq!(solution.tour[0], 0);
        assert_eq!(matrix.tour_cost(&solution.tour), Some(35));
    }

    #[test]
    fn test_without_seed() {
        let config = BranchAndBoundConfig {
            seed_incumbent: false,
            ..Default::default()
        };
        let result = BranchAndBound::new(config).solve(&create_test_matrix()).unwrap();

        assert_eq!(result.solution.cost, 35);
        assert!(result.proven_optimal);
        assert!(result.stats.leaves_evaluated >= 1);
    }

    #[test]
    fn test_single_city() {
        let matrix = CostMatrix::from_rows(vec![vec![0]]).unwrap();
        let solution = solve(&matrix).unwrap();
        assert_eq!(solution.tour, vec![0]);
        assert_eq!(solution.cost, 0);
    }

    #[test]
    fn test_two_cities() {
        let matrix = CostMatrix::from_rows(vec![vec![-1, 3], vec![4, -1]]).unwrap();
        let solution = solve(&matrix).unwrap();
        assert_eq!(solution.tour, vec![0, 1]);
        assert_eq!(solution.cost, 7);
    }

    #[test]
    fn test_costs_at_the_limit() {
        let limit = CostMatrix::max_edge_cost(3);
        let matrix = CostMatrix::from_rows(vec![
            vec![-1, limit, limit],
            vec![limit, -1, limit],
            vec![limit, limit, -1],
        ])
        .unwrap();
        let solution = solve(&matrix).unwrap();
        assert_eq!(solution.cost, 3 * limit);
    }

    #[test]
    fn test_disconnected_city() {
        let matrix = CostMatrix::from_rows(vec![
            vec![-1, 1, 2],
            vec![1, -1, 2],
            vec![-1, -1, -1],
        ])
        .unwrap();
        assert!(matches!(solve(&matrix), Err(AtspError::NoFeasibleTour)));
    }

    #[test]
    fn test_expired_deadline_keeps_seed() {
        let config = BranchAndBoundConfig {
            time_limit: Some(Duration::ZERO),
            ..Default::default()
        };
        let result = BranchAndBound::new(config).solve(&create_test_matrix()).unwrap();
        assert!(!result.proven_optimal);
        assert!(result.solution.feasible);

        let config = BranchAndBoundConfig {
            time_limit: Some(Duration::ZERO),
            seed_incumbent: false,
        };
        assert!(matches!(
            BranchAndBound::new(config).solve(&create_test_matrix()),
            Err(AtspError::TimeLimitReached)
        ));
    }

    #[test]
    fn test_frontier_order() {
        let matrix = create_test_matrix();
        let mut heap = BinaryHeap::new();
        for (seq, cost) in [(0, 5), (1, 3), (2, 3), (3, 9)] {
            heap.push(FrontierEntry {
                cost,
                seq,
                node: SearchNode::root(&matrix),
            });
        }
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }
}
