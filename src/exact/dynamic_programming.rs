//! Held-Karp dynamic programming over subsets.

use crate::error::{AtspError, Result};
use crate::matrix::CostMatrix;
use crate::solution::Solution;
use log::info;
use std::time::Instant;

const UNREACHED: i64 = i64::MAX;

/// Held-Karp solver. Memory grows as `2^(n-1) * (n-1)` entries.
pub struct HeldKarp {
    pub max_size: usize,
}

impl Default for HeldKarp {
    fn default() -> Self {
        HeldKarp { max_size: 20 }
    }
}

impl HeldKarp {
    pub fn solve(&self, matrix: &CostMatrix) -> Result<Solution> {
        let start = Instant::now();
        let n = matrix.size();
        if n > self.max_size {
            return Err(AtspError::TooLarge {
                algorithm: "Held-Karp".to_string(),
                size: n,
                max: self.max_size,
            });
        }
        if n == 1 {
            return Ok(Solution::from_tour(matrix, vec![0], "Held-Karp"));
        }

        // City k >= 1 is bit k - 1; dp[mask * m + (k - 1)] is the cheapest path
        // from 0 through exactly `mask` that ends at k.
        let m = n - 1;
        let full = (1usize << m) - 1;
        let mut dp = vec![UNREACHED; (full + 1) * m];
        let mut parent = vec![u16::MAX; (full + 1) * m];

        for k in 0..m {
            if let Some(c) = matrix.cost(0, k + 1) {
                dp[(1 << k) * m + k] = c;
            }
        }

        for mask in 1..=full {
            for last in 0..m {
                let here = dp[mask * m + last];
                if here == UNREACHED || mask & (1 << last) == 0 {
                    continue;
                }
                for next in 0..m {
                    if mask & (1 << next) != 0 {
                        continue;
                    }
                    let Some(c) = matrix.cost(last + 1, next + 1) else {
                        continue;
                    };
                    let idx = (mask | 1 << next) * m + next;
                    if here + c < dp[idx] {
                        dp[idx] = here + c;
                        parent[idx] = last as u16;
                    }
                }
            }
        }

        let closing = (0..m)
            .filter_map(|last| {
                let here = dp[full * m + last];
                let back = matrix.cost(last + 1, 0)?;
                (here != UNREACHED).then_some((here + back, last))
            })
            .min();
        let (cost, mut last) = closing.ok_or(AtspError::NoFeasibleTour)?;

        let mut tour = Vec::with_capacity(n);
        let mut mask = full;
        loop {
            tour.push(last + 1);
            let prev = parent[mask * m + last];
            mask &= !(1 << last);
            if prev == u16::MAX {
                break;
            }
            last = prev as usize;
        }
        tour.push(0);
        tour.reverse();

        info!("Held-Karp: cost {} on {} cities", cost, n);

        let mut solution = Solution::from_tour(matrix, tour, "Held-Karp");
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::brute_force::BruteForce;

    #[test]
    fn test_scenario() {
        let matrix = CostMatrix::from_rows(vec![
            vec![-1, 10, 15, 20],
            vec![5, -1, 9, 10],
            vec![6, 13, -1, 12],
            vec![8, 8, 9, -1],
        ])
        .unwrap();
        let solution = HeldKarp::default().solve(&matrix).unwrap();
        assert_eq!(solution.cost, 35);
        assert_eq!(matrix.tour_cost(&solution.tour), Some(35));
        assert!(solution.is_complete(&matrix));
    }

    #[test]
    fn test_matches_brute_force() {
        for seed in 0..5 {
            let matrix = CostMatrix::random(8, seed).unwrap();
            let dp = HeldKarp::default().solve(&matrix).unwrap();
            let bf = BruteForce::default().solve(&matrix).unwrap();
            assert_eq!(dp.cost, bf.cost);
            assert_eq!(matrix.tour_cost(&dp.tour), Some(dp.cost));
        }
    }

    #[test]
    fn test_degenerate() {
        let two = CostMatrix::from_rows(vec![vec![-1, 2], vec![3, -1]]).unwrap();
        let solution = HeldKarp::default().solve(&two).unwrap();
        assert_eq!(solution.tour, vec![0, 1]);
        assert_eq!(solution.cost, 5);

        let stuck = CostMatrix::from_rows(vec![vec![-1, 2, 2], vec![-1, -1, 1], vec![-1, 1, -1]]).unwrap();
        assert!(matches!(HeldKarp::default().solve(&stuck), Err(AtspError::NoFeasibleTour)));
    }
}
