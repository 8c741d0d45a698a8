//! Property tests for the branch-and-bound solver.

use atsp_solver::exact::branch_and_bound::{self, SearchNode};
use atsp_solver::exact::{BruteForce, HeldKarp};
use atsp_solver::{AtspError, CostMatrix, NO_EDGE};
use proptest::prelude::*;

fn matrix_strategy(min: usize, max: usize) -> impl Strategy<Value = CostMatrix> {
    (min..=max).prop_flat_map(|n| {
        prop::collection::vec(prop_oneof![8 => 0i64..100, 1 => Just(NO_EDGE)], n * n).prop_map(move |cells| {
            let rows = cells.chunks(n).map(|row| row.to_vec()).collect();
            CostMatrix::from_rows(rows).unwrap()
        })
    })
}

/// Cheapest closed tour extending `path`, by exhaustive search on the original costs.
fn best_completion(matrix: &CostMatrix, path: &mut Vec<usize>, visited: &mut Vec<bool>) -> Option<i64> {
    let n = matrix.size();
    if path.len() == n {
        return matrix.tour_cost(path);
    }

    let last = path[path.len() - 1];
    let mut best = None;
    for next in 0..n {
        if visited[next] || matrix.cost(last, next).is_none() {
            continue;
        }
        visited[next] = true;
        path.push(next);
        if let Some(cost) = best_completion(matrix, path, visited) {
            best = Some(best.map_or(cost, |b: i64| b.min(cost)));
        }
        path.pop();
        visited[next] = false;
    }
    best
}

/// Walk the whole search tree, checking every bound against the true optimum
/// below it and against its parent.
fn check_subtree(matrix: &CostMatrix, node: &SearchNode) -> Result<(), TestCaseError> {
    let mut path = node.path().to_vec();
    let mut visited = vec![false; matrix.size()];
    for &c in &path {
        visited[c] = true;
    }
    if let Some(best) = best_completion(matrix, &mut path, &mut visited) {
        prop_assert!(
            node.cost() <= best,
            "bound {} exceeds best completion {} of {:?}",
            node.cost(),
            best,
            node.path()
        );
    }

    if node.is_leaf() {
        if let Some(cost) = matrix.tour_cost(node.path()) {
            prop_assert_eq!(node.reduction_bound(), cost);
        }
        return Ok(());
    }

    for to in node.candidates() {
        if let Some(child) = node.branch(to) {
            prop_assert!(child.cost() >= node.cost(), "child {:?} below parent", child.path());
            prop_assert_eq!(child.level(), node.level() + 1);
            prop_assert_eq!(child.path().len(), child.level() + 1);
            check_subtree(matrix, &child)?;
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_matches_brute_force(matrix in matrix_strategy(2, 9)) {
        let exact = BruteForce::default().solve(&matrix);
        let bnb = branch_and_bound::solve(&matrix);

        match (exact, bnb) {
            (Ok(expected), Ok(found)) => prop_assert_eq!(found.cost, expected.cost),
            (Err(AtspError::NoFeasibleTour), Err(AtspError::NoFeasibleTour)) => {}
            (expected, found) => prop_assert!(false, "brute force {:?}, branch and bound {:?}", expected, found),
        }
    }

    #[test]
    fn prop_bounds_admissible_and_monotone(matrix in matrix_strategy(2, 7)) {
        check_subtree(&matrix, &SearchNode::root(&matrix))?;
    }

    #[test]
    fn prop_tour_is_valid(matrix in matrix_strategy(2, 9)) {
        if let Ok(solution) = branch_and_bound::solve(&matrix) {
            let n = matrix.size();
            let mut sorted = solution.tour.clone();
            sorted.sort_unstable();

            prop_assert_eq!(solution.tour[0], 0);
            prop_assert_eq!(sorted, (0..n).collect::<Vec<_>>());
            prop_assert_eq!(matrix.tour_cost(&solution.tour), Some(solution.cost));
            prop_assert!(solution.feasible);
        }
    }

    #[test]
    fn prop_idempotent(matrix in matrix_strategy(2, 9)) {
        let first = branch_and_bound::solve(&matrix).map(|s| s.cost).ok();
        let second = branch_and_bound::solve(&matrix).map(|s| s.cost).ok();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn scenario_four_cities() {
    let matrix = CostMatrix::from_rows(vec![
        vec![-1, 10, 15, 20],
        vec![5, -1, 9, 10],
        vec![6, 13, -1, 12],
        vec![8, 8, 9, -1],
    ])
    .unwrap();

    let solution = branch_and_bound::solve(&matrix).unwrap();
    assert_eq!(solution.cost, 35);
    assert_eq!(solution.tour, vec![0, 1, 3, 2]);
}

#[test]
fn single_city() {
    let matrix = CostMatrix::from_rows(vec![vec![-1]]).unwrap();
    let solution = branch_and_bound::solve(&matrix).unwrap();
    assert_eq!(solution.tour, vec![0]);
    assert_eq!(solution.cost, 0);
}

#[test]
fn city_without_outgoing_edges() {
    let matrix = CostMatrix::from_rows(vec![
        vec![-1, 4, 2, 7],
        vec![3, -1, 5, 1],
        vec![-1, -1, -1, -1],
        vec![6, 2, 8, -1],
    ])
    .unwrap();

    assert!(matches!(
        branch_and_bound::solve(&matrix),
        Err(AtspError::NoFeasibleTour)
    ));
}

#[test]
fn matches_held_karp_on_larger_instances() {
    for seed in 0..3 {
        let matrix = CostMatrix::random(12, seed).unwrap();
        let dp = HeldKarp::default().solve(&matrix).unwrap();
        let bnb = branch_and_bound::solve(&matrix).unwrap();
        assert_eq!(bnb.cost, dp.cost, "seed {}", seed);
    }
}
