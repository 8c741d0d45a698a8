//! Exhaustive permutation search.

use crate::error::{AtspError, Result};
use crate::matrix::CostMatrix;
use crate::solution::Solution;
use log::info;
use std::time::Instant;

/// Rearrange `perm` into the next lexicographic permutation.
/// Returns false (leaving `perm` sorted ascending) after the last one.
pub fn next_permutation(perm: &mut [usize]) -> bool {
    if perm.len() < 2 {
        return false;
    }

    let Some(i) = (0..perm.len() - 1).rev().find(|&i| perm[i] < perm[i + 1]) else {
        perm.reverse();
        return false;
    };
    let j = (i + 1..perm.len())
        .rev()
        .find(|&j| perm[j] > perm[i])
        .unwrap_or(i + 1);
    perm.swap(i, j);
    perm[i + 1..].reverse();
    true
}

/// Brute force solver: tries every tour starting at city 0.
pub struct BruteForce {
    pub max_size: usize,
}

impl Default for BruteForce {
    fn default() -> Self {
        BruteForce { max_size: 12 }
    }
}

impl BruteForce {
    pub fn solve(&self, matrix: &CostMatrix) -> Result<Solution> {
        let start = Instant::now();
        let n = matrix.size();
        if n > self.max_size {
            return Err(AtspError::TooLarge {
                algorithm: "Brute force".to_string(),
                size: n,
                max: self.max_size,
            });
        }

        let mut tour: Vec<usize> = (0..n).collect();
        let mut best: Option<(Vec<usize>, i64)> = None;
        let mut evaluated = 0usize;

        loop {
            evaluated += 1;
            if let Some(cost) = matrix.tour_cost(&tour) {
                if best.as_ref().map_or(true, |(_, b)| cost < *b) {
                    best = Some((tour.clone(), cost));
                }
            }
            if n < 2 || !next_permutation(&mut tour[1..]) {
                break;
            }
        }

        let (tour, cost) = best.ok_or(AtspError::NoFeasibleTour)?;
        info!("Brute force: cost {} over {} permutations", cost, evaluated);

        let mut solution = Solution::from_tour(matrix, tour, "Brute Force");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(evaluated);
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_permutation_order() {
        let mut perm = vec![1, 2, 3];
        let mut seen = vec![perm.clone()];
        while next_permutation(&mut perm) {
            seen.push(perm.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![1, 2, 3],
                vec![1, 3, 2],
                vec![2, 1, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![3, 2, 1],
            ]
        );
        assert_eq!(perm, vec![1, 2, 3]);
    }

    #[test]
    fn test_scenario() {
        let matrix = CostMatrix::from_rows(vec![
            vec![-1, 10, 15, 20],
            vec![5, -1, 9, 10],
            vec![6, 13, -1, 12],
            vec![8, 8, 9, -1],
        ])
        .unwrap();
        let solution = BruteForce::default().solve(&matrix).unwrap();
        assert_eq!(solution.cost, 35);
        assert_eq!(solution.tour, vec![0, 1, 3, 2]);
        assert_eq!(solution.iterations, Some(6));
    }

    #[test]
    fn test_limits() {
        let single = CostMatrix::from_rows(vec![vec![-1]]).unwrap();
        assert_eq!(BruteForce::default().solve(&single).unwrap().cost, 0);

        let big = CostMatrix::random(13, 1).unwrap();
        assert!(matches!(
            BruteForce::default().solve(&big),
            Err(AtspError::TooLarge { size: 13, max: 12, .. })
        ));
    }
}
