//! Constraint-graph solver.
//!
//! A system of difference constraints `r(i) − r(j) ≤ k` is solved as a single-source
//! shortest-path problem: every constraint becomes an edge `j → i` of weight `k`, and an
//! extra reference node has a zero-weight edge to every circuit node. The shortest
//! distance from the reference node to `v` is a valid `r(v)`, and a negative cycle means
//! the system has no solution.
//!
//! The graph is kept as an `(N + 1) x N` matrix: rows `0..N` are circuit nodes as sources,
//! row `N` is the reference node. Weights can be negative, so the solver runs the same
//! min-plus closure as the path matrices and watches the diagonal for negative cycles
//! after every generation.

use tracing::debug;

use crate::{RetimeError, retiming::matrix::Matrix};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintGraph {
    matrix: Matrix,
}

impl ConstraintGraph {
    /// Build the constraint graph of an `N x N` reduced constraint matrix.
    pub fn new(constraints: &Matrix) -> Self {
        let n = constraints.cols();
        let mut matrix = Matrix::unreachable(n + 1, n);

        // r(i) − r(j) ≤ k is the edge j → i
        for (i, j, bound) in constraints.entries() {
            matrix.set(j, i, Some(bound));
        }
        for v in 0..n {
            matrix.set(n, v, Some(0));
        }

        Self { matrix }
    }

    /// Row index of the reference node.
    pub fn reference(&self) -> usize {
        self.matrix.cols()
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// The difference constraints this graph encodes, as an `N x N` constraint matrix.
    pub fn constraints(&self) -> Matrix {
        let n = self.matrix.cols();
        let mut constraints = Matrix::unreachable(n, n);
        for (j, i, bound) in self.matrix.entries().filter(|&(j, _, _)| j < n) {
            constraints.set(i, j, Some(bound));
        }
        constraints
    }

    /// Shortest distance from the reference node to every circuit node.
    ///
    /// `period` is only used to report which clock period turned out infeasible.
    pub fn solve(self, period: u32) -> Result<Vec<i64>, RetimeError> {
        let n = self.matrix.cols();
        let reference = self.reference();

        let closed = self.matrix.closure_with(|generation, next| {
            match (0..n).find(|&v| next[(v, v)].is_some_and(|d| d < 0)) {
                Some(v) => Err(RetimeError::NegativeCycle {
                    node: v + 1,
                    generation,
                    period,
                }),
                None => Ok(()),
            }
        })?;

        // The reference row starts at zero everywhere and only decreases
        let vector: Vec<i64> = closed.row(reference).iter().map(|d| d.unwrap_or(0)).collect();
        debug!(period, ?vector, "solved constraint graph");

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(n: usize, entries: &[(usize, usize, i64)]) -> Matrix {
        let mut m = Matrix::unreachable(n, n);
        for &(i, j, k) in entries {
            m.set(i, j, Some(k));
        }
        m
    }

    fn satisfies(m: &Matrix, r: &[i64]) -> bool {
        m.entries().all(|(i, j, k)| r[i] - r[j] <= k)
    }

    #[test]
    fn test_graph_swaps_constraint_endpoints() {
        let reduced = constraints(3, &[(0, 1, 2), (2, 0, -1)]);
        let graph = ConstraintGraph::new(&reduced);

        assert_eq!(graph.reference(), 3);
        assert_eq!(graph.matrix().get(1, 0), Some(2));
        assert_eq!(graph.matrix().get(0, 2), Some(-1));
        assert_eq!(graph.matrix().get(0, 1), None);
        assert_eq!(graph.matrix().row(3), &[Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn test_graph_round_trips_constraints() {
        let reduced = constraints(4, &[(0, 1, 2), (2, 0, -1), (3, 2, 0), (1, 3, 5)]);
        assert_eq!(ConstraintGraph::new(&reduced).constraints(), reduced);
    }

    #[test]
    fn test_unconstrained_nodes_solve_to_zero() {
        let vector = ConstraintGraph::new(&constraints(3, &[])).solve(1).unwrap();
        assert_eq!(vector, vec![0, 0, 0]);
    }

    #[test]
    fn test_solution_satisfies_every_constraint() {
        let reduced = constraints(
            3,
            &[(0, 1, 1), (0, 2, 1), (1, 0, -1), (1, 2, -1), (2, 0, 0), (2, 1, 1)],
        );
        let vector = ConstraintGraph::new(&reduced).solve(2).unwrap();

        assert_eq!(vector, vec![0, -1, 0]);
        assert!(satisfies(&reduced, &vector));
    }

    #[test]
    fn test_chained_negative_bounds_accumulate() {
        // r(1) ≤ r(0) − 1, r(2) ≤ r(1) − 1, r(3) ≤ r(2) − 1
        let reduced = constraints(4, &[(1, 0, -1), (2, 1, -1), (3, 2, -1)]);
        let vector = ConstraintGraph::new(&reduced).solve(1).unwrap();

        assert_eq!(vector, vec![0, -1, -2, -3]);
        assert!(satisfies(&reduced, &vector));
    }

    #[test]
    fn test_negative_cycle_is_infeasible() {
        // r(0) − r(1) ≤ 0, r(1) − r(2) ≤ −1, r(2) − r(0) ≤ −1
        let reduced = constraints(3, &[(0, 1, 0), (1, 2, -1), (2, 0, -1)]);
        let result = ConstraintGraph::new(&reduced).solve(1);

        match result {
            Err(RetimeError::NegativeCycle {
                generation, period, ..
            }) => {
                assert_eq!(period, 1);
                assert!(generation <= 2);
            }
            other => panic!("expected a negative cycle, got {:?}", other),
        }
    }
}
