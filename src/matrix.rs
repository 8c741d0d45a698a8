//! Module for parsing and representing ATSP cost matrices.
//!
//! Two on-disk formats are understood: a plain text format (the city count
//! followed by N×N integers) and TSPLIB `ATSP` files with an explicit
//! `FULL_MATRIX` edge weight section. Absent edges are stored as [`NO_EDGE`].

use crate::error::{AtspError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Sentinel marking a directed edge that does not exist.
pub const NO_EDGE: i64 = -1;

/// Dense directed cost matrix, stored row-major in one buffer.
///
/// Deserialization goes through the same checks as the loaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCostMatrix")]
pub struct CostMatrix {
    /// Name of the instance
    pub name: String,
    size: usize,
    costs: Vec<i64>,
    /// Stand-in cost for absent edges, larger than any feasible tour
    penalty: i64,
}

/// Unchecked serialized form of [`CostMatrix`].
#[derive(Deserialize)]
struct RawCostMatrix {
    name: String,
    size: usize,
    costs: Vec<i64>,
}

impl TryFrom<RawCostMatrix> for CostMatrix {
    type Error = AtspError;

    fn try_from(raw: RawCostMatrix) -> Result<Self> {
        if raw.size == 0 || raw.costs.len() != raw.size.saturating_mul(raw.size) {
            return Err(AtspError::InvalidMatrix(format!(
                "{} costs do not form a {}x{} matrix",
                raw.costs.len(),
                raw.size,
                raw.size
            )));
        }
        CostMatrix::from_costs(&raw.name, raw.size, raw.costs)
    }
}

impl CostMatrix {
    /// Largest edge cost accepted for a matrix of `size` cities.
    ///
    /// Below this limit every tour sum, bound sum and penalized cost fits in an `i64`.
    pub fn max_edge_cost(size: usize) -> i64 {
        let n = (size as i64).saturating_add(1);
        i64::MAX / n.saturating_mul(n).saturating_mul(4)
    }

    /// Build a matrix from rows. The diagonal is forced to [`NO_EDGE`].
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(AtspError::InvalidMatrix("matrix has no cities".to_string()));
        }

        let mut costs = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(AtspError::InvalidMatrix(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    size
                )));
            }
            costs.extend(row);
        }

        Self::from_costs("unnamed", size, costs)
    }

    fn from_costs(name: &str, size: usize, mut costs: Vec<i64>) -> Result<Self> {
        let limit = Self::max_edge_cost(size);
        for (idx, cost) in costs.iter_mut().enumerate() {
            let (i, j) = (idx / size, idx % size);
            if i == j {
                *cost = NO_EDGE;
            } else if *cost < 0 && *cost != NO_EDGE {
                return Err(AtspError::InvalidMatrix(format!(
                    "negative cost {} on edge {} -> {}",
                    cost, i, j
                )));
            } else if *cost > limit {
                return Err(AtspError::InvalidMatrix(format!(
                    "cost {} on edge {} -> {} exceeds {} for {} cities",
                    cost, i, j, limit, size
                )));
            }
        }

        let max_cost = costs.iter().copied().max().unwrap_or(0).max(0);
        let penalty = (max_cost + 1) * size as i64;

        Ok(CostMatrix {
            name: name.to_string(),
            size,
            costs,
            penalty,
        })
    }

    /// Random complete matrix with costs in `1..=10 * size`, seeded.
    pub fn random(size: usize, seed: u64) -> Result<Self> {
        use rand::prelude::*;
        use rand_chacha::ChaCha8Rng;

        if size == 0 {
            return Err(AtspError::InvalidMatrix("matrix has no cities".to_string()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let upper = (size as i64 * 10).max(1);
        let costs = (0..size * size)
            .map(|idx| {
                if idx / size == idx % size {
                    NO_EDGE
                } else {
                    rng.gen_range(1..=upper)
                }
            })
            .collect();

        Self::from_costs(&format!("random{}_{}", size, seed), size, costs)
    }

    /// Load a matrix, detecting the format from the file contents.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)?;
        let mut matrix = Self::parse(&text)?;

        if matrix.name == "unnamed" {
            if let Some(stem) = path.as_ref().file_stem() {
                matrix.name = stem.to_string_lossy().to_string();
            }
        }

        Ok(matrix)
    }

    /// Parse either format from a string.
    pub fn parse(text: &str) -> Result<Self> {
        if text.contains("EDGE_WEIGHT_SECTION") {
            Self::parse_tsplib(text)
        } else {
            Self::parse_plain(text)
        }
    }

    fn parse_plain(text: &str) -> Result<Self> {
        let mut tokens = text.lines().enumerate().flat_map(|(idx, line)| {
            line.split_whitespace().map(move |tok| (idx + 1, tok))
        });

        let (line, first) = tokens.next().ok_or(AtspError::Parse {
            line: 1,
            message: "empty matrix file".to_string(),
        })?;
        let size: usize = first.parse().map_err(|_| AtspError::Parse {
            line,
            message: format!("invalid city count '{}'", first),
        })?;
        if size == 0 {
            return Err(AtspError::InvalidMatrix("matrix has no cities".to_string()));
        }

        let mut costs = Vec::with_capacity(size * size);
        let mut last_line = line;
        for (line, tok) in tokens.by_ref().take(size * size) {
            last_line = line;
            costs.push(parse_cost(tok, line)?);
        }
        if let Some((line, tok)) = tokens.next() {
            return Err(AtspError::Parse {
                line,
                message: format!("unexpected value '{}' after {} costs", tok, size * size),
            });
        }

        if costs.len() != size * size {
            return Err(AtspError::Parse {
                line: last_line,
                message: format!("expected {} costs, found {}", size * size, costs.len()),
            });
        }

        Self::from_costs("unnamed", size, costs)
    }

    fn parse_tsplib(text: &str) -> Result<Self> {
        let mut name = String::from("unnamed");
        let mut dimension = 0usize;
        let mut costs: Vec<i64> = Vec::new();
        let mut in_weights = false;
        let mut last_weight_line = 0;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if line == "EOF" {
                break;
            }

            if in_weights {
                last_weight_line = line_no;
                for tok in line.split_whitespace() {
                    costs.push(parse_cost(tok, line_no)?);
                }
                continue;
            }

            if line.starts_with("EDGE_WEIGHT_SECTION") {
                in_weights = true;
                continue;
            }

            let (key, value) = match line.split_once(':') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => continue,
            };

            match key {
                "NAME" => name = value.to_string(),
                "DIMENSION" => {
                    dimension = value.parse().map_err(|_| AtspError::Parse {
                        line: line_no,
                        message: format!("invalid dimension '{}'", value),
                    })?;
                }
                "EDGE_WEIGHT_TYPE" if value != "EXPLICIT" => {
                    return Err(AtspError::Parse {
                        line: line_no,
                        message: format!("unsupported edge weight type '{}'", value),
                    });
                }
                "EDGE_WEIGHT_FORMAT" if value != "FULL_MATRIX" => {
                    return Err(AtspError::Parse {
                        line: line_no,
                        message: format!("unsupported edge weight format '{}'", value),
                    });
                }
                _ => {}
            }
        }

        if dimension == 0 {
            return Err(AtspError::InvalidMatrix("missing or zero DIMENSION".to_string()));
        }
        if costs.len() != dimension * dimension {
            return Err(AtspError::Parse {
                line: last_weight_line,
                message: format!(
                    "EDGE_WEIGHT_SECTION holds {} values, expected {}",
                    costs.len(),
                    dimension * dimension
                ),
            });
        }

        Self::from_costs(&name, dimension, costs)
    }

    /// Write the matrix in the plain text format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = format!("{}\n", self.size);
        for i in 0..self.size {
            let row: Vec<String> = (0..self.size).map(|j| self.raw(i, j).to_string()).collect();
            out.push_str(&row.join(" "));
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Number of cities
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Stored value, [`NO_EDGE`] included.
    #[inline]
    pub fn raw(&self, from: usize, to: usize) -> i64 {
        self.costs[from * self.size + to]
    }

    /// Cost of the directed edge, or `None` if it does not exist.
    #[inline]
    pub fn cost(&self, from: usize, to: usize) -> Option<i64> {
        let c = self.raw(from, to);
        (c != NO_EDGE).then_some(c)
    }

    /// Edge cost with absent edges priced at a penalty exceeding any feasible tour.
    #[inline]
    pub fn penalized_cost(&self, from: usize, to: usize) -> i64 {
        self.cost(from, to).unwrap_or(self.penalty)
    }

    /// Closed tour cost under [`CostMatrix::penalized_cost`].
    pub fn penalized_tour_cost(&self, tour: &[usize]) -> i64 {
        if tour.len() < 2 {
            return 0;
        }
        let closing = self.penalized_cost(tour[tour.len() - 1], tour[0]);
        tour.windows(2)
            .map(|pair| self.penalized_cost(pair[0], pair[1]))
            .fold(closing, i64::saturating_add)
    }

    /// Row-major view of the whole buffer.
    pub fn as_slice(&self) -> &[i64] {
        &self.costs
    }

    /// Cost of the closed cycle through `tour`, returning to `tour[0]`.
    /// `None` if any edge is absent. A single city costs 0.
    pub fn tour_cost(&self, tour: &[usize]) -> Option<i64> {
        if tour.len() < 2 {
            return Some(0);
        }

        let mut total = 0i64;
        for pair in tour.windows(2) {
            total += self.cost(pair[0], pair[1])?;
        }
        total += self.cost(tour[tour.len() - 1], tour[0])?;
        Some(total)
    }

    /// Get statistics about the matrix
    pub fn statistics(&self) -> MatrixStatistics {
        let finite: Vec<i64> = (0..self.size)
            .flat_map(|i| (0..self.size).filter_map(move |j| self.cost(i, j)))
            .collect();

        let mut asymmetry_sum = 0i64;
        let mut pairs = 0usize;
        for i in 0..self.size {
            for j in i + 1..self.size {
                if let (Some(a), Some(b)) = (self.cost(i, j), self.cost(j, i)) {
                    asymmetry_sum += (a - b).abs();
                    pairs += 1;
                }
            }
        }

        let off_diagonal = self.size * self.size - self.size;
        MatrixStatistics {
            name: self.name.clone(),
            size: self.size,
            edges: finite.len(),
            missing_edges: off_diagonal - finite.len(),
            min_cost: finite.iter().copied().min(),
            max_cost: finite.iter().copied().max(),
            avg_cost: if finite.is_empty() {
                0.0
            } else {
                finite.iter().sum::<i64>() as f64 / finite.len() as f64
            },
            avg_asymmetry: if pairs == 0 {
                0.0
            } else {
                asymmetry_sum as f64 / pairs as f64
            },
        }
    }
}

fn parse_cost(tok: &str, line: usize) -> Result<i64> {
    // Some TSPLIB instances store reals; round them.
    if let Ok(v) = tok.parse::<i64>() {
        return Ok(v);
    }
    tok.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
        .ok_or_else(|| AtspError::Parse {
            line,
            message: format!("invalid cost '{}'", tok),
        })
}

impl fmt::Display for CostMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.size {
            for j in 0..self.size {
                write!(f, "{:>9} ", self.raw(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Statistics about a cost matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixStatistics {
    pub name: String,
    pub size: usize,
    pub edges: usize,
    pub missing_edges: usize,
    pub min_cost: Option<i64>,
    pub max_cost: Option<i64>,
    pub avg_cost: f64,
    pub avg_asymmetry: f64,
}

impl fmt::Display for MatrixStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.size)?;
        writeln!(f, "  Edges: {} ({} missing)", self.edges, self.missing_edges)?;
        match (self.min_cost, self.max_cost) {
            (Some(min), Some(max)) => writeln!(f, "  Cost range: {}..={}", min, max)?,
            _ => writeln!(f, "  Cost range: -")?,
        }
        writeln!(f, "  Avg cost: {:.2}", self.avg_cost)?;
        writeln!(f, "  Avg |c(i,j) - c(j,i)|: {:.2}", self.avg_asymmetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_format() {
        let text = "3\n-1 4 5\n2 -1 7\n1 1 -1\n";
        let matrix = CostMatrix::parse(text).unwrap();

        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.cost(0, 1), Some(4));
        assert_eq!(matrix.cost(2, 0), Some(1));
        assert_eq!(matrix.cost(1, 1), None);
    }

    #[test]
    fn test_plain_format_short_body() {
        let err = CostMatrix::parse("3\n-1 4 5\n2 -1\n").unwrap_err();
        assert!(matches!(err, AtspError::Parse { .. }));
    }

    #[test]
    fn test_tsplib_format() {
        let text = "NAME: tiny3\nTYPE: ATSP\nDIMENSION: 3\nEDGE_WEIGHT_TYPE: EXPLICIT\n\
                    EDGE_WEIGHT_FORMAT: FULL_MATRIX\nEDGE_WEIGHT_SECTION\n\
                    100000000 3 8\n4 100000000 2\n9 5.4 100000000\nEOF\n";
        let matrix = CostMatrix::parse(text).unwrap();

        assert_eq!(matrix.name, "tiny3");
        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.cost(0, 0), None);
        assert_eq!(matrix.cost(2, 1), Some(5));
    }

    #[test]
    fn test_rejects_bad_rows() {
        assert!(CostMatrix::from_rows(vec![]).is_err());
        assert!(CostMatrix::from_rows(vec![vec![-1, 2], vec![3]]).is_err());
        assert!(CostMatrix::from_rows(vec![vec![-1, -7], vec![3, -1]]).is_err());
    }

    #[test]
    fn test_tour_cost() {
        let matrix = CostMatrix::from_rows(vec![
            vec![-1, 10, 15, 20],
            vec![5, -1, 9, 10],
            vec![6, 13, -1, 12],
            vec![8, 8, 9, -1],
        ])
        .unwrap();

        assert_eq!(matrix.tour_cost(&[0, 1, 3, 2]), Some(35));
        assert_eq!(matrix.tour_cost(&[0]), Some(0));

        let sparse = CostMatrix::from_rows(vec![vec![-1, 1], vec![-1, -1]]).unwrap();
        assert_eq!(sparse.tour_cost(&[0, 1]), None);
    }

    #[test]
    fn test_random_is_seeded() {
        let a = CostMatrix::random(6, 7).unwrap();
        let b = CostMatrix::random(6, 7).unwrap();
        assert_eq!(a, b);
        assert!((0..6).all(|i| a.cost(i, i).is_none()));
        assert!(a.as_slice().iter().all(|&c| c == NO_EDGE || (1..=60).contains(&c)));
    }

    #[test]
    fn test_rejects_out_of_range_costs() {
        let err = CostMatrix::parse("2\n-1 9223372036854775807\n0 -1\n").unwrap_err();
        assert!(matches!(err, AtspError::InvalidMatrix(_)));
        let err = CostMatrix::parse("2\n-1 1e300\n0 -1\n").unwrap_err();
        assert!(matches!(err, AtspError::InvalidMatrix(_)));

        let limit = CostMatrix::max_edge_cost(2);
        let matrix = CostMatrix::from_rows(vec![vec![-1, limit], vec![limit, -1]]).unwrap();
        assert_eq!(matrix.tour_cost(&[0, 1]), Some(2 * limit));
        assert!(CostMatrix::from_rows(vec![vec![-1, limit + 1], vec![0, -1]]).is_err());

        let sparse = CostMatrix::from_rows(vec![vec![-1, limit], vec![-1, -1]]).unwrap();
        assert!(sparse.penalized_tour_cost(&[0, 1]) > limit);
    }

    #[test]
    fn test_rejects_trailing_values() {
        let err = CostMatrix::parse("2\n-1 1\n1 -1\n7\n").unwrap_err();
        assert!(matches!(err, AtspError::Parse { line: 4, .. }));

        let text = "NAME: tiny2\nTYPE: ATSP\nDIMENSION: 2\nEDGE_WEIGHT_TYPE: EXPLICIT\n\
                    EDGE_WEIGHT_FORMAT: FULL_MATRIX\nEDGE_WEIGHT_SECTION\n\
                    0 3\n4 0 9\nEOF\n";
        let err = CostMatrix::parse(text).unwrap_err();
        assert!(matches!(err, AtspError::Parse { line: 8, .. }));
    }

    #[test]
    fn test_deserialize_validates() {
        let matrix = CostMatrix::from_rows(vec![vec![-1, 4], vec![2, -1]]).unwrap();
        let json = serde_json::to_string(&matrix).unwrap();
        assert_eq!(serde_json::from_str::<CostMatrix>(&json).unwrap(), matrix);

        let short = r#"{"name":"x","size":3,"costs":[-1,1,1,-1],"penalty":0}"#;
        assert!(serde_json::from_str::<CostMatrix>(short).is_err());
        let negative = r#"{"name":"x","size":2,"costs":[-1,-5,1,-1],"penalty":0}"#;
        assert!(serde_json::from_str::<CostMatrix>(negative).is_err());
    }
}
