//! Difference constraints on the retiming vector.
//!
//! A cell `(i, j) = k` in a constraint matrix stands for `r(i) − r(j) ≤ k`.
//!
//! Layer 0 holds one constraint per edge, `r(u) − r(v) ≤ registers(u, v)`, so that no
//! edge ends up with a negative register count. Each further layer belongs to one
//! candidate clock period `c`, from the upper period down to the largest node delay, and
//! holds `r(u) − r(v) ≤ W[u][v] − 1` for every pair with `D[u][v] > c`: a path too slow for
//! the period has to keep at least one register.

use tracing::{debug, trace};

use crate::{
    RetimeError,
    circuit::Circuit,
    retiming::{matrix::Matrix, paths::PathAnalysis},
};

/// Constraint layers for every candidate period between `upper` and `lower`.
///
/// Only layer 0 is stored. A period layer is rebuilt from W and D when asked for, so the
/// cost does not depend on how wide the period range is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintLayers {
    edge_layer: Matrix,
    analysis: PathAnalysis,
    upper: u32,
    lower: u32,
}

/// The edge constraints of layer 0.
pub fn edge_constraints(circuit: &Circuit) -> Matrix {
    let n = circuit.node_count();
    let mut layer = Matrix::unreachable(n, n);
    for edge in circuit.edges() {
        layer.set(edge.source, edge.target, Some(i64::from(edge.registers)));
    }
    layer
}

/// The constraints a single candidate `period` adds.
pub fn period_constraints(analysis: &PathAnalysis, period: u32) -> Matrix {
    let n = analysis.d.rows();
    let mut layer = Matrix::unreachable(n, n);
    for (u, v, delay) in analysis.d.entries() {
        if delay <= i64::from(period) {
            continue;
        }
        if let Some(registers) = analysis.w[(u, v)] {
            layer.set(u, v, Some(registers - 1));
        }
    }
    layer
}

impl ConstraintLayers {
    /// Derive layer 0 plus one layer per period from `upper` down to the largest node delay.
    ///
    /// Fails with [`RetimeError::PeriodBelowMinimum`] when `upper` is already below the
    /// largest node delay.
    pub fn derive(
        circuit: &Circuit,
        analysis: PathAnalysis,
        upper: u32,
    ) -> Result<Self, RetimeError> {
        let lower = circuit.max_node_delay();
        if upper < lower {
            return Err(RetimeError::PeriodBelowMinimum {
                period: upper,
                minimum: lower,
            });
        }

        let layers = Self {
            edge_layer: edge_constraints(circuit),
            analysis,
            upper,
            lower,
        };
        debug!(
            upper,
            lower,
            layers = layers.layer_count(),
            "derived constraint layers"
        );

        Ok(layers)
    }

    /// Number of layers, layer 0 included.
    pub fn layer_count(&self) -> u64 {
        u64::from(self.upper - self.lower) + 2
    }

    pub fn upper(&self) -> u32 {
        self.upper
    }

    pub fn lower(&self) -> u32 {
        self.lower
    }

    pub fn edge_layer(&self) -> &Matrix {
        &self.edge_layer
    }

    /// The layer derived for `period`, if it is within range.
    pub fn period_layer(&self, period: u32) -> Option<Matrix> {
        if period < self.lower || period > self.upper {
            return None;
        }
        let layer = period_constraints(&self.analysis, period);
        trace!(
            period,
            constraints = layer.entries().count(),
            "derived constraint layer"
        );
        Some(layer)
    }

    /// Fold layer 0 and the layers from `upper` down to `target` into the tightest bound
    /// per ordered pair.
    ///
    /// A lower period constrains every pair a higher one does, with the same bound, so the
    /// fold only needs layer 0 and the layer for `target`.
    pub fn reduce(&self, target: u32) -> Result<Matrix, RetimeError> {
        if target < self.lower {
            return Err(RetimeError::PeriodBelowMinimum {
                period: target,
                minimum: self.lower,
            });
        }
        let Some(target_layer) = self.period_layer(target) else {
            return Err(RetimeError::PeriodAboveMaximum {
                period: target,
                maximum: self.upper,
            });
        };

        let mut reduced = self.edge_layer.clone();
        for (u, v, bound) in target_layer.entries() {
            reduced.tighten(u, v, bound);
        }

        debug!(
            target,
            layers = u64::from(self.upper - target) + 2,
            constraints = reduced.entries().count(),
            "reduced constraint layers"
        );

        Ok(reduced)
    }
}
