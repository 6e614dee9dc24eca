//! Clock period analysis of a circuit.
//!
//! Reports the clock period the circuit currently needs, its critical path and the
//! lower bound any retiming can reach, and optionally exports the circuit as a DOT graph.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use retime::analyse::{AnalyseArgs, analyse_main};
//!
//! let args = AnalyseArgs {
//!     input: "correlator.txt".into(),
//!     report: Some("analysis.rpt".into()),
//!     dot: Some("correlator.dot".into()),
//! };
//!
//! analyse_main(args)?;
//! # Ok(())
//! # }
//! ```

use std::{fs, io::Write, path::PathBuf};

use anyhow::*;
use clap::Parser;
use petgraph::dot;
use prettytable::*;
use tracing::info;

use crate::{circuit::Circuit, read_file};

/// Command-line arguments for the analysis command.
#[derive(Parser, Debug)]
pub struct AnalyseArgs {
    /// Circuit description input file
    pub input: PathBuf,

    /// Report file for analysis results (default: stdout)
    #[clap(long, short)]
    pub report: Option<PathBuf>,

    /// DOT file displaying the circuit graph
    #[clap(long)]
    pub dot: Option<PathBuf>,
}

/// Analyse a circuit file and print its clock period report.
pub fn analyse_main(args: AnalyseArgs) -> Result<()> {
    let AnalyseArgs { input, report, dot } = args;

    // Create writer for output (file or stdout)
    let mut writer: Box<dyn Write> = match report {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    let circuit = read_file(&input)?;
    info!(input = %input.display(), "analysing circuit");

    write_analysis(&mut writer, &circuit)?;

    if let Some(filename) = dot {
        fs::write(filename, format!("{}", dot::Dot::new(circuit.graph())))?;
    }

    Ok(())
}

/// Write the clock period report of `circuit`.
pub fn write_analysis<W: Write + ?Sized>(writer: &mut W, circuit: &Circuit) -> Result<()> {
    let critical = circuit.clock_period()?;
    let registers: u64 = circuit.edges().map(|e| u64::from(e.registers)).sum();

    writeln!(writer, "Nodes: {}", circuit.node_count())?;
    writeln!(writer, "Edges: {}", circuit.edge_count())?;
    writeln!(writer, "Registers: {}", registers)?;
    writeln!(writer, "Stated clock period: {}", circuit.max_clock_cycle())?;
    writeln!(writer, "Current clock period: {}", critical.period)?;
    writeln!(
        writer,
        "Minimum reachable clock period: >= {}",
        circuit.max_node_delay()
    )?;

    if critical.period > u64::from(circuit.max_clock_cycle()) {
        writeln!(
            writer,
            "Warning: critical path exceeds the stated clock period"
        )?;
    }

    let mut table = Table::new();
    table.set_titles(row!["Node", "Delay", "Arrival"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    let mut arrival = 0u64;
    for &id in &critical.nodes {
        let delay = circuit.delay(id - 1);
        arrival += u64::from(delay);
        table.add_row(row![id, delay, arrival]);
    }

    writeln!(writer, "\nCritical path:")?;
    table.print(writer)?;

    Ok(())
}
