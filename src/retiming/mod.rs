//! Retiming of synchronous circuits.
//!
//! Retiming moves registers across combinational nodes without changing what the circuit
//! computes, in order to shorten its longest register-free path. Given a target clock
//! period, [`retime`] decides whether a retiming exists and, if so, returns the retimed
//! circuit.
//!
//! # Pipeline
//!
//! 1. **Path matrices** ([`paths`]): W (fewest registers between two nodes) and G′
//!    (delay-weighted shortest paths), combined into D (largest delay among the paths with
//!    W registers).
//! 2. **Constraint derivation** ([`constraints`]): one difference-constraint layer per
//!    candidate period, plus the edge constraints in layer 0.
//! 3. **Reduction**: fold layer 0 and the layers down to the target period into one matrix.
//!    Period layers are computed on demand, so only the target's layer is ever built.
//! 4. **Solving** ([`solver`]): shortest paths from a reference node in the constraint
//!    graph give the retiming vector `r`.
//! 5. **Application** ([`apply`]): each edge `(u, v)` gets `registers − r(u) + r(v)`.
//!
//! All shortest paths are computed with the min-plus closure of [`matrix::Matrix`].
//!
//! # Usage Example
//!
//! ```
//! use retime::{circuit::Circuit, retiming::retime};
//!
//! let mut circuit = Circuit::new([1, 2, 1], 4);
//! circuit.add_edge("Edge12", 1, 2, 2).unwrap();
//! circuit.add_edge("Edge23", 2, 3, 0).unwrap();
//! circuit.add_edge("Edge31", 3, 1, 0).unwrap();
//!
//! let retiming = retime(&circuit, 2).unwrap();
//! assert_eq!(retiming.circuit.registers(0, 1), Some(1));
//! assert_eq!(retiming.circuit.registers(1, 2), Some(1));
//! assert_eq!(retiming.circuit.clock_period().unwrap().period, 2);
//! ```

use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use prettytable::*;
use tracing::{debug, info};

use crate::{
    RetimeError,
    circuit::{Circuit, CriticalPath, serialisation::serialize_circuit},
    read_file,
};

pub mod apply;
pub mod constraints;
pub mod matrix;
pub mod paths;
pub mod solver;

use apply::apply_retiming;
use constraints::ConstraintLayers;
use matrix::Matrix;
use paths::PathAnalysis;
use solver::ConstraintGraph;

/// Result of a successful retiming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retiming {
    /// Clock period the circuit was retimed for.
    pub period: u32,
    /// Reduced difference constraints, `(i, j) = k` meaning `r(i) − r(j) ≤ k`.
    pub constraints: Matrix,
    /// Retiming value per node, by 0-based node index.
    pub vector: Vec<i64>,
    /// The retimed circuit, stating `period` as its clock period.
    pub circuit: Circuit,
}

/// Retime `circuit` so that it runs at clock period `period`.
///
/// Layers are derived from the larger of the circuit's stated clock period and `period`
/// down to the largest node delay.
///
/// # Errors
///
/// - [`RetimeError::Malformed`] when the circuit breaks a model invariant.
/// - [`RetimeError::DegenerateDelayModel`] when every node delay is zero.
/// - [`RetimeError::PeriodBelowMinimum`] when the stated period or `period` is below the
///   largest node delay. Checked before any matrix is computed.
/// - [`RetimeError::NegativeCycle`] when the constraints for `period` contradict each
///   other, i.e. no retiming reaches that period.
/// - [`RetimeError::NegativeRegisters`] or [`RetimeError::PeriodNotMet`] if the solved
///   vector does not produce a valid circuit for `period`.
pub fn retime(circuit: &Circuit, period: u32) -> Result<Retiming, RetimeError> {
    circuit.validate()?;

    let minimum = circuit.max_node_delay();
    if minimum == 0 {
        return Err(RetimeError::DegenerateDelayModel);
    }
    let stated = circuit.max_clock_cycle();
    for requested in [stated, period] {
        if requested < minimum {
            return Err(RetimeError::PeriodBelowMinimum {
                period: requested,
                minimum,
            });
        }
    }

    debug!(
        nodes = circuit.node_count(),
        edges = circuit.edge_count(),
        stated,
        period,
        "retiming circuit"
    );

    let analysis = PathAnalysis::new(circuit)?;
    let layers = ConstraintLayers::derive(circuit, analysis, stated.max(period))?;
    let constraints = layers.reduce(period)?;
    let vector = ConstraintGraph::new(&constraints).solve(period)?;
    let retimed = apply_retiming(circuit, &vector, period)?;

    let achieved = retimed.clock_period()?.period;
    if achieved > u64::from(period) {
        return Err(RetimeError::PeriodNotMet { period, achieved });
    }

    Ok(Retiming {
        period,
        constraints,
        vector,
        circuit: retimed,
    })
}

/// Command-line arguments for the retime command.
#[derive(Parser, Debug)]
pub struct RetimeArgs {
    /// Circuit description input file
    pub input: PathBuf,

    /// Retimed circuit output file
    #[clap(short, long)]
    pub output: PathBuf,

    /// Target clock period (default: the largest node delay)
    #[clap(short, long)]
    pub period: Option<u32>,

    /// Report file listing constraints, retiming vector and register moves
    #[clap(long)]
    pub report: Option<PathBuf>,
}

/// Retime a circuit file and write the retimed circuit.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use retime::retiming::{RetimeArgs, retime_main};
///
/// let args = RetimeArgs {
///     input: "circuit.txt".into(),
///     output: "retimed_circuit.txt".into(),
///     period: Some(13),
///     report: None,
/// };
///
/// retime_main(args)?;
/// # Ok(())
/// # }
/// ```
pub fn retime_main(args: RetimeArgs) -> Result<()> {
    let RetimeArgs {
        input,
        output,
        period,
        report,
    } = args;

    let circuit = read_file(&input)?;
    let period = period.unwrap_or_else(|| circuit.max_node_delay());
    info!(input = %input.display(), period, "retiming");

    let retiming = retime(&circuit, period)
        .with_context(|| format!("Cannot retime {} to period {}", input.display(), period))?;

    fs::write(&output, serialize_circuit(&retiming.circuit))
        .with_context(|| format!("Cannot write {}", output.display()))?;
    info!(output = %output.display(), "wrote retimed circuit");

    if let Some(path) = report {
        let file = fs::File::create(&path)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        let mut out_file = BufWriter::new(file);
        write_report(&mut out_file, &circuit, &retiming)?;
    }

    Ok(())
}

fn describe(critical: &CriticalPath) -> String {
    format!(
        "{} (critical path {})",
        critical.period,
        critical.nodes.iter().join(" -> ")
    )
}

/// Write a human-readable account of a retiming.
pub fn write_report<W: Write>(
    writer: &mut W,
    original: &Circuit,
    retiming: &Retiming,
) -> Result<()> {
    writeln!(writer, "Target clock period: {}", retiming.period)?;
    writeln!(
        writer,
        "Clock period before: {}",
        describe(&original.clock_period()?)
    )?;
    writeln!(
        writer,
        "Clock period after: {}",
        describe(&retiming.circuit.clock_period()?)
    )?;

    writeln!(writer, "\nDifference constraints:")?;
    for (i, j, bound) in retiming.constraints.entries() {
        writeln!(writer, "r({}) - r({}) <= {}", i + 1, j + 1, bound)?;
    }

    writeln!(writer, "\nRetiming vector:")?;
    let mut table = Table::new();
    table.set_titles(row!["Node", "Delay", "r"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for (v, r) in retiming.vector.iter().enumerate() {
        table.add_row(row![v + 1, original.delay(v), r]);
    }
    table.print(writer)?;

    writeln!(writer, "\nEdges:")?;
    let mut table = Table::new();
    table.set_titles(row!["Edge", "From", "To", "Registers", "Retimed"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for (before, after) in original.edges().zip(retiming.circuit.edges()) {
        table.add_row(row![
            before.name,
            before.source + 1,
            before.target + 1,
            before.registers,
            after.registers
        ]);
    }
    table.print(writer)?;

    Ok(())
}
