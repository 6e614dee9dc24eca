//! Retiming of synchronous circuits
//!
//! This library reads a circuit made of combinational nodes and registered edges, and
//! moves registers across nodes so that the circuit runs at a shorter clock period
//! without changing what it computes.
//!
//! # Overview
//!
//! A circuit is described in a line-oriented `key=value` file: the node count, one
//! propagation delay per node, one line per edge carrying its register count, and the
//! clock period the circuit is stated to run at. Retiming uses the Leiserson–Saxe
//! formulation: path matrices W and D are computed with min-plus closures, turned into
//! difference constraints per candidate period, and solved as a shortest-path problem.
//!
//! # Main Workflows
//!
//! 1. **Retiming** ([`retiming`]): Retime a circuit to a target clock period
//! 2. **Analysis** ([`analyse`]): Report the current clock period and critical path
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use retime::{read_file, retiming::retime};
//! use std::path::Path;
//!
//! let circuit = read_file(Path::new("correlator.txt"))?;
//! let retiming = retime(&circuit, 13)?;
//!
//! println!("retiming vector: {:?}", retiming.vector);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - **[`circuit`]**: Circuit model, file parser and serialisation
//! - **[`retiming`]**: Path matrices, constraint derivation, solver and application
//! - **[`analyse`]**: Clock period report and DOT export

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{error::Error, fmt, fs, path::Path};

pub mod analyse;
pub mod circuit;
pub mod retiming;

pub use analyse::{AnalyseArgs, analyse_main};
pub use circuit::{Circuit, CircuitError};
pub use retiming::{RetimeArgs, retime_main};

/// Interned edge name.
pub type Symbol = string_cache::DefaultAtom;

/// Reasons a retiming run fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetimeError {
    /// The input circuit breaks a model invariant.
    Malformed(CircuitError),
    /// Every node delay is zero, so there is no delay scale to weigh paths with.
    DegenerateDelayModel,
    /// A clock period below the largest node delay, which no retiming can reach.
    PeriodBelowMinimum { period: u32, minimum: u32 },
    /// A target above the period the constraint layers were derived from.
    PeriodAboveMaximum { period: u32, maximum: u32 },
    /// The difference constraints contradict each other at `period`.
    NegativeCycle {
        node: usize,
        generation: usize,
        period: u32,
    },
    /// Applying the retiming vector left an edge with a negative register count.
    NegativeRegisters {
        edge: Symbol,
        from: usize,
        to: usize,
        registers: i64,
    },
    /// The retimed circuit still needs a longer clock period than requested.
    PeriodNotMet { period: u32, achieved: u64 },
    /// An intermediate value does not fit its integer type.
    Overflow { stage: &'static str },
}

impl RetimeError {
    /// True when the circuit is well formed but cannot run at the requested period.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            RetimeError::PeriodBelowMinimum { .. } | RetimeError::NegativeCycle { .. }
        )
    }
}

impl fmt::Display for RetimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetimeError::Malformed(e) => write!(f, "Malformed circuit: {}", e),
            RetimeError::DegenerateDelayModel => {
                write!(f, "Every node delay is zero, nothing to retime")
            }
            RetimeError::PeriodBelowMinimum { period, minimum } => write!(
                f,
                "Clock period {} is below the largest node delay {}",
                period, minimum
            ),
            RetimeError::PeriodAboveMaximum { period, maximum } => write!(
                f,
                "Clock period {} is above the largest derived period {}",
                period, maximum
            ),
            RetimeError::NegativeCycle {
                node,
                generation,
                period,
            } => write!(
                f,
                "Problem Infeasible: clock period {} cannot be reached (negative cycle through node {} after {} generations)",
                period, node, generation
            ),
            RetimeError::NegativeRegisters {
                edge,
                from,
                to,
                registers,
            } => write!(
                f,
                "Edge {} ({} -> {}) would carry {} registers",
                edge, from, to, registers
            ),
            RetimeError::PeriodNotMet { period, achieved } => write!(
                f,
                "Retimed circuit needs clock period {}, requested {}",
                achieved, period
            ),
            RetimeError::Overflow { stage } => write!(f, "Integer overflow computing {}", stage),
        }
    }
}

impl Error for RetimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetimeError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CircuitError> for RetimeError {
    fn from(e: CircuitError) -> Self {
        RetimeError::Malformed(e)
    }
}

/// Reads and parses a circuit description from a file.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use retime::read_file;
/// use std::path::Path;
///
/// let circuit = read_file(Path::new("correlator.txt"))?;
/// println!("{} nodes", circuit.node_count());
/// # Ok(())
/// # }
/// ```
pub fn read_file(file_name: &Path) -> Result<Circuit> {
    let file = fs::read_to_string(file_name)
        .with_context(|| format!("Cannot read {}", file_name.display()))?;
    circuit::parse_circuit(&file).with_context(|| format!("Cannot parse {}", file_name.display()))
}

/// Command-line interface arguments for the retiming tools.
#[derive(Debug, Parser)]
#[clap(
    name = "retime",
    about = "Leiserson-Saxe retiming of synchronous circuits"
)]
pub struct CLIArguments {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Retime a circuit to a target clock period.
    Retime(RetimeArgs),
    /// Report the clock period and critical path of a circuit.
    Analyse(AnalyseArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_errors() {
        assert!(
            RetimeError::NegativeCycle {
                node: 1,
                generation: 2,
                period: 3
            }
            .is_infeasible()
        );
        assert!(
            RetimeError::PeriodBelowMinimum {
                period: 1,
                minimum: 2
            }
            .is_infeasible()
        );
        assert!(!RetimeError::DegenerateDelayModel.is_infeasible());
        assert!(!RetimeError::Overflow { stage: "W" }.is_infeasible());
    }

    #[test]
    fn test_malformed_keeps_its_source() {
        let err = RetimeError::from(CircuitError::Empty);
        assert_eq!(err, RetimeError::Malformed(CircuitError::Empty));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_cli_parses_verbosity_after_subcommand() {
        let args =
            CLIArguments::try_parse_from(["retime", "analyse", "circuit.txt", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Analyse(_)));
    }
}
