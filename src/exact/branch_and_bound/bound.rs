//! Lower bounds for partial tours.
//!
//! A node's bound is the largest of three admissible estimates: the parent's
//! bound, the accumulated reduction bound, and a minimum spanning tree over
//! the cities still to visit.

use super::reduction::ReducedMatrix;

/// Cost of a minimum spanning tree over the unvisited cities.
///
/// Edges are undirected with the cheaper finite direction of the reduced
/// matrix as weight. The tree grows from the lowest-index unvisited city with
/// Prim's algorithm and stops as soon as no remaining city is reachable.
pub fn minimum_spanning_tree(matrix: &ReducedMatrix, visited: &[bool]) -> i64 {
    let n = matrix.size();
    let remaining: Vec<usize> = (0..n).filter(|&c| !visited[c]).collect();
    if remaining.len() < 2 {
        return 0;
    }

    let weight = |u: usize, v: usize| match (matrix.get(u, v), matrix.get(v, u)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    let mut in_tree = vec![false; remaining.len()];
    let mut key: Vec<Option<i64>> = vec![None; remaining.len()];
    key[0] = Some(0);
    let mut total = 0;

    for _ in 0..remaining.len() {
        let next = (0..remaining.len())
            .filter(|&i| !in_tree[i])
            .filter_map(|i| key[i].map(|k| (k, i)))
            .min();

        let Some((k, u)) = next else {
            break;
        };
        in_tree[u] = true;
        total += k;

        for v in 0..remaining.len() {
            if in_tree[v] {
                continue;
            }
            if let Some(w) = weight(remaining[u], remaining[v]) {
                if key[v].map_or(true, |cur| w < cur) {
                    key[v] = Some(w);
                }
            }
        }
    }

    total
}

/// Combine the estimates into a node cost that never drops below the parent's.
#[inline]
pub fn combine(parent_cost: i64, reduction_bound: i64, mst_bound: i64) -> i64 {
    parent_cost.max(reduction_bound).max(mst_bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CostMatrix;

    fn reduced(rows: Vec<Vec<i64>>) -> ReducedMatrix {
        ReducedMatrix::from_matrix(&CostMatrix::from_rows(rows).unwrap())
    }

    #[test]
    fn test_mst_uses_cheaper_direction() {
        let m = reduced(vec![
            vec![-1, 9, 4],
            vec![1, -1, 7],
            vec![8, 2, -1],
        ]);
        // {0,1}: 1, {1,2}: 2, {0,2}: 4
        assert_eq!(minimum_spanning_tree(&m, &[false, false, false]), 3);
    }

    #[test]
    fn test_mst_skips_visited_cities() {
        let m = reduced(vec![
            vec![-1, 1, 1, 1],
            vec![1, -1, 20, 30],
            vec![1, 20, -1, 25],
            vec![1, 30, 25, -1],
        ]);
        assert_eq!(minimum_spanning_tree(&m, &[true, false, false, false]), 45);
        assert_eq!(minimum_spanning_tree(&m, &[true, true, true, false]), 0);
    }

    #[test]
    fn test_mst_stops_on_unreachable_city() {
        let m = reduced(vec![
            vec![-1, 3, -1],
            vec![5, -1, -1],
            vec![-1, -1, -1],
        ]);
        assert_eq!(minimum_spanning_tree(&m, &[false, false, false]), 3);
    }

    #[test]
    fn test_combine_takes_largest() {
        assert_eq!(combine(10, 7, 3), 10);
        assert_eq!(combine(10, 12, 3), 12);
        assert_eq!(combine(0, 4, 9), 9);
    }
}
