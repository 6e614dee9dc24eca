//! Writer for the circuit description format read by [`crate::circuit::parser`].

use std::fmt;

use itertools::Itertools;

use crate::circuit::Circuit;

/// Serialise a circuit into the provided writer.
///
/// See [`serialize_circuit`] for format details.
pub fn serialize_circuit_to<W: fmt::Write>(circuit: &Circuit, writer: &mut W) -> fmt::Result {
    writeln!(writer, "// Specifies the total number of nodes in the graph")?;
    writeln!(writer, "TotalNodes={}", circuit.node_count())?;
    writeln!(writer)?;

    writeln!(writer, "// Specifies the delay for each node in the graph")?;
    writeln!(writer, "NodeDelays={}", circuit.delays().join(","))?;
    writeln!(writer)?;

    writeln!(
        writer,
        "// Specifies the delay for each edge between nodes in the graph"
    )?;
    for edge in circuit.edges() {
        writeln!(writer, "{}={}", edge.name, edge.registers)?;
    }
    writeln!(writer)?;

    writeln!(writer, "// Specifies the maximum clock cycle for the algorithm")?;
    writeln!(writer, "MaxClockCycle={}", circuit.max_clock_cycle())
}

/// Serialise a circuit to the textual circuit format.
///
/// Edges keep the names and the order they were read with, so a parsed circuit that is
/// written back out only differs in its register counts and `MaxClockCycle`.
///
/// # Example
///
/// ```
/// use retime::circuit::{Circuit, serialisation::serialize_circuit};
///
/// let mut circuit = Circuit::new([1, 1], 2);
/// circuit.add_edge("Edge12", 1, 2, 1).unwrap();
///
/// let text = serialize_circuit(&circuit);
/// assert!(text.contains("TotalNodes=2\n"));
/// assert!(text.contains("NodeDelays=1,1\n"));
/// assert!(text.contains("Edge12=1\n"));
/// assert!(text.contains("MaxClockCycle=2\n"));
/// ```
pub fn serialize_circuit(circuit: &Circuit) -> String {
    let mut out = String::new();
    // Infallible for String
    let _ = serialize_circuit_to(circuit, &mut out);
    out
}
