//! All-pairs path matrices of a circuit.
//!
//! - **W**: `W[u][v]` is the fewest registers on any path from `u` to `v`.
//! - **G′**: shortest paths under `w′(u, v) = M·registers(u, v) − delay(u)`, with
//!   `M = N·max(delay)`. Scaling by `M` makes register count dominate, so the shortest G′
//!   path is, among the paths with `W[u][v]` registers, the one with the most node delay.
//! - **D**: `D[u][v] = M·W[u][v] − G′[u][v] + delay(v)`, the largest delay of any path from
//!   `u` to `v` that carries only `W[u][v]` registers; `D[v][v] = delay(v)`.

use tracing::debug;

use crate::{RetimeError, circuit::Circuit, retiming::matrix::Matrix};

/// W, G′ and D of one circuit, plus the scale `M` that links them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAnalysis {
    /// `N·max(delay)`.
    pub scale: i64,
    pub w: Matrix,
    pub g_prime: Matrix,
    pub d: Matrix,
}

impl PathAnalysis {
    /// Compute W, G′ and D for `circuit`.
    ///
    /// Fails with [`RetimeError::DegenerateDelayModel`] when every node delay is zero.
    pub fn new(circuit: &Circuit) -> Result<Self, RetimeError> {
        let scale = delay_scale(circuit)?;
        let w = path_weights(circuit);
        let g_prime = weighted_paths(circuit, scale)?;
        let d = delay_matrix(circuit, scale, &w, &g_prime)?;

        debug!(
            scale,
            reachable_pairs = w.entries().count(),
            "computed path matrices"
        );

        Ok(Self {
            scale,
            w,
            g_prime,
            d,
        })
    }
}

/// The scale `M = N·max(delay)` applied to register counts in G′.
pub fn delay_scale(circuit: &Circuit) -> Result<i64, RetimeError> {
    let max_delay = circuit.max_node_delay();
    if max_delay == 0 {
        return Err(RetimeError::DegenerateDelayModel);
    }

    i64::try_from(circuit.node_count())
        .ok()
        .and_then(|n| n.checked_mul(i64::from(max_delay)))
        .ok_or(RetimeError::Overflow { stage: "delay scale" })
}

/// Minimum register count between every ordered pair of nodes.
pub fn path_weights(circuit: &Circuit) -> Matrix {
    let mut seed = Matrix::identity(circuit.node_count());
    for edge in circuit.edges() {
        seed.set(edge.source, edge.target, Some(i64::from(edge.registers)));
    }
    seed.closure()
}

/// Shortest paths under the delay-weighted edge weight `M·registers − delay(source)`.
pub fn weighted_paths(circuit: &Circuit, scale: i64) -> Result<Matrix, RetimeError> {
    const STAGE: &str = "G′ edge weights";

    let n = circuit.node_count();
    let mut seed = Matrix::identity(n);
    let mut largest: i64 = 0;

    for edge in circuit.edges() {
        let weight = scale
            .checked_mul(i64::from(edge.registers))
            .and_then(|w| w.checked_sub(i64::from(circuit.delay(edge.source))))
            .ok_or(RetimeError::Overflow { stage: STAGE })?;
        largest = largest.max(weight.abs());
        seed.set(edge.source, edge.target, Some(weight));
    }

    // Composition adds two paths of at most n edges each
    i64::try_from(2 * n)
        .ok()
        .and_then(|k| largest.checked_mul(k))
        .ok_or(RetimeError::Overflow { stage: STAGE })?;

    Ok(seed.closure())
}

/// Combine converged W and G′ into D.
pub fn delay_matrix(
    circuit: &Circuit,
    scale: i64,
    w: &Matrix,
    g_prime: &Matrix,
) -> Result<Matrix, RetimeError> {
    let n = circuit.node_count();
    let mut d = Matrix::unreachable(n, n);

    for u in 0..n {
        for v in 0..n {
            let delay_v = i64::from(circuit.delay(v));
            let value = if u == v {
                Some(delay_v)
            } else {
                match (w[(u, v)], g_prime[(u, v)]) {
                    (Some(registers), Some(weighted)) => Some(
                        scale
                            .checked_mul(registers)
                            .and_then(|x| x.checked_sub(weighted))
                            .and_then(|x| x.checked_add(delay_v))
                            .ok_or(RetimeError::Overflow {
                                stage: "delay matrix",
                            })?,
                    ),
                    _ => None,
                }
            };
            d.set(u, v, value);
        }
    }

    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, test_helpers::*};

    #[test]
    fn test_path_weights_of_three_node_ring() {
        let w = path_weights(&three_node_ring());

        assert_eq!(w.get(0, 1), Some(1));
        assert_eq!(w.get(1, 2), Some(1));
        assert_eq!(w.get(0, 2), Some(2));
        assert_eq!(w.get(2, 0), Some(0));
        assert_eq!(w.get(1, 0), Some(1));
        assert_eq!(w.get(2, 1), Some(1));
    }

    #[test]
    fn test_diagonals() {
        let circuit = correlator();
        let analysis = PathAnalysis::new(&circuit).unwrap();

        for v in 0..circuit.node_count() {
            assert_eq!(analysis.w.get(v, v), Some(0));
            assert_eq!(analysis.d.get(v, v), Some(i64::from(circuit.delay(v))));
        }
    }

    #[test]
    fn test_delay_matrix_of_three_node_ring() {
        let analysis = PathAnalysis::new(&three_node_ring()).unwrap();
        assert_eq!(analysis.scale, 6);

        assert_eq!(analysis.g_prime.get(0, 1), Some(5));
        assert_eq!(analysis.g_prime.get(2, 0), Some(-1));
        assert_eq!(analysis.g_prime.get(0, 2), Some(9));

        // Delay of the path itself, endpoints included
        assert_eq!(analysis.d.get(0, 1), Some(3));
        assert_eq!(analysis.d.get(0, 2), Some(4));
        assert_eq!(analysis.d.get(1, 0), Some(4));
        assert_eq!(analysis.d.get(2, 0), Some(2));
        assert_eq!(analysis.d.get(2, 1), Some(4));
    }

    #[test]
    fn test_delay_matrix_prefers_slower_path_with_fewest_registers() {
        // Two register-free routes from 1 to 4; the one through node 3 is slower
        let circuit = build_circuit(
            &[1, 1, 5, 1],
            8,
            &[
                ("Edge12", 1, 2, 0),
                ("Edge13", 1, 3, 0),
                ("Edge24", 2, 4, 0),
                ("Edge34", 3, 4, 0),
                ("Edge41", 4, 1, 1),
            ],
        );
        let analysis = PathAnalysis::new(&circuit).unwrap();

        assert_eq!(analysis.w.get(0, 3), Some(0));
        assert_eq!(analysis.d.get(0, 3), Some(7));
    }

    #[test]
    fn test_unreachable_pairs_stay_unreachable() {
        let circuit = build_circuit(&[1, 2], 3, &[("Edge12", 1, 2, 1)]);
        let analysis = PathAnalysis::new(&circuit).unwrap();

        assert_eq!(analysis.w.get(1, 0), None);
        assert_eq!(analysis.g_prime.get(1, 0), None);
        assert_eq!(analysis.d.get(1, 0), None);
        assert_eq!(analysis.d.get(0, 1), Some(3));
    }

    #[test]
    fn test_path_matrices_are_converged() {
        let circuit = correlator();
        let analysis = PathAnalysis::new(&circuit).unwrap();

        assert_eq!(analysis.w.compose(), analysis.w);
        assert_eq!(analysis.g_prime.compose(), analysis.g_prime);
    }

    #[test]
    fn test_all_zero_delays_are_degenerate() {
        let mut circuit = Circuit::new([0, 0, 0], 1);
        circuit.add_edge("Edge12", 1, 2, 1).unwrap();
        circuit.add_edge("Edge23", 2, 3, 0).unwrap();

        assert_eq!(
            PathAnalysis::new(&circuit),
            Err(RetimeError::DegenerateDelayModel)
        );
    }

    #[test]
    fn test_huge_weights_overflow_instead_of_wrapping() {
        let mut circuit = Circuit::new([u32::MAX, u32::MAX], u32::MAX);
        circuit.add_edge("Edge12", 1, 2, u32::MAX).unwrap();
        let scale = delay_scale(&circuit).unwrap();

        // M·registers alone needs more than 64 bits
        assert!(matches!(
            weighted_paths(&circuit, scale),
            Err(RetimeError::Overflow { .. })
        ));
    }
}
