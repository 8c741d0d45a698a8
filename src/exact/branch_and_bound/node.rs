//! Search tree nodes.

use super::bound;
use super::reduction::ReducedMatrix;
use crate::matrix::CostMatrix;

/// A partial tour from city 0 together with its own reduced matrix.
///
/// In `matrix` the row of every departed city and the column of every
/// entered city are closed. The edge from the newest city back to 0 is closed
/// too, except at a leaf where it is the only edge left.
#[derive(Debug, Clone)]
pub struct SearchNode {
    matrix: ReducedMatrix,
    reduction_bound: i64,
    cost: i64,
    level: usize,
    path: Vec<usize>,
    visited: Vec<bool>,
    edge: Option<(usize, usize)>,
}

impl SearchNode {
    /// Root node: path `[0]`, reduced copy of the original costs.
    pub fn root(costs: &CostMatrix) -> Self {
        let mut matrix = ReducedMatrix::from_matrix(costs);
        let reduction = matrix.reduce();
        let mut visited = vec![false; costs.size()];
        visited[0] = true;

        SearchNode {
            matrix,
            reduction_bound: reduction,
            cost: reduction,
            level: 0,
            path: vec![0],
            visited,
            edge: None,
        }
    }

    /// Cities reachable from the last city through a finite reduced edge.
    pub fn candidates(&self) -> impl Iterator<Item = usize> + '_ {
        let from = self.last();
        (0..self.matrix.size()).filter(move |&to| !self.visited[to] && self.matrix.get(from, to).is_some())
    }

    /// Child extending the path with `to`, or `None` if that edge is unusable.
    pub fn branch(&self, to: usize) -> Option<SearchNode> {
        let from = self.last();
        if self.visited[to] {
            return None;
        }
        let edge_cost = self.matrix.get(from, to)?;

        let n = self.matrix.size();
        let level = self.level + 1;
        let mut matrix = self.matrix.clone();
        matrix.close_row(from);
        matrix.close_column(to);
        if level < n - 1 {
            matrix.forbid(to, 0);
        }

        let reduction = matrix.reduce();
        let reduction_bound = self.reduction_bound + edge_cost + reduction;

        let mut visited = self.visited.clone();
        visited[to] = true;
        let mst = bound::minimum_spanning_tree(&matrix, &visited);

        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(to);

        Some(SearchNode {
            matrix,
            reduction_bound,
            cost: bound::combine(self.cost, reduction_bound, mst),
            level,
            path,
            visited,
            edge: Some((from, to)),
        })
    }

    /// True when every city is on the path.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.level + 1 == self.matrix.size()
    }

    #[inline]
    pub fn last(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    /// Admissible lower bound on every completion of the path.
    #[inline]
    pub fn cost(&self) -> i64 {
        self.cost
    }

    #[inline]
    pub fn reduction_bound(&self) -> i64 {
        self.reduction_bound
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn edge(&self) -> Option<(usize, usize)> {
        self.edge
    }

    pub fn matrix(&self) -> &ReducedMatrix {
        &self.matrix
    }

    pub fn into_path(self) -> Vec<usize> {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> CostMatrix {
        CostMatrix::from_rows(vec![
            vec![-1, 10, 15, 20],
            vec![5, -1, 9, 10],
            vec![6, 13, -1, 12],
            vec![8, 8, 9, -1],
        ])
        .unwrap()
    }

    #[test]
    fn test_root() {
        let root = SearchNode::root(&scenario());
        assert_eq!(root.path(), &[0]);
        assert_eq!(root.level(), 0);
        assert_eq!(root.edge(), None);
        assert_eq!(root.cost(), 35);
        assert_eq!(root.candidates().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_branch_closes_row_column_and_return() {
        let root = SearchNode::root(&scenario());
        let child = root.branch(1).unwrap();

        assert_eq!(child.path(), &[0, 1]);
        assert_eq!(child.level(), 1);
        assert_eq!(child.edge(), Some((0, 1)));
        assert!((0..4).all(|j| child.matrix().get(0, j).is_none()));
        assert!((0..4).all(|i| child.matrix().get(i, 1).is_none()));
        assert_eq!(child.matrix().get(1, 0), None);
        assert!(child.cost() >= root.cost());
        assert!(root.branch(0).is_none());
    }

    #[test]
    fn test_leaf_bound_is_tour_cost() {
        let matrix = scenario();
        let leaf = SearchNode::root(&matrix)
            .branch(1)
            .and_then(|n| n.branch(3))
            .and_then(|n| n.branch(2))
            .unwrap();

        assert!(leaf.is_leaf());
        assert_eq!(leaf.reduction_bound(), 35);
        assert_eq!(matrix.tour_cost(leaf.path()), Some(35));
    }
}
