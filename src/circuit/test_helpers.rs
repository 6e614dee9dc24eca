//! Canned circuits shared by the unit tests.
//!
//! Every circuit returned here passes [`Circuit::validate`].

use crate::circuit::Circuit;

/// Build and validate a circuit from `(name, from, to, registers)` tuples.
pub fn build_circuit(
    delays: &[u32],
    max_clock_cycle: u32,
    edges: &[(&str, usize, usize, u32)],
) -> Circuit {
    let mut circuit = Circuit::new(delays.iter().copied(), max_clock_cycle);
    for &(name, from, to, registers) in edges {
        circuit
            .add_edge(name, from, to, registers)
            .expect("test edge should be valid");
    }
    circuit.validate().expect("test circuit should be valid");
    circuit
}

/// Three nodes in a ring with delays 1, 2, 1 and two registers.
///
/// Already runs at its minimum period of 2.
pub fn three_node_ring() -> Circuit {
    build_circuit(
        &[1, 2, 1],
        4,
        &[("Edge12", 1, 2, 1), ("Edge23", 2, 3, 1), ("Edge31", 3, 1, 0)],
    )
}

/// Same ring as [`three_node_ring`] but with both registers on the first edge.
///
/// Runs at period 4; retiming one register across node 2 brings it down to 2.
pub fn unbalanced_ring() -> Circuit {
    build_circuit(
        &[1, 2, 1],
        4,
        &[("Edge12", 1, 2, 2), ("Edge23", 2, 3, 0), ("Edge31", 3, 1, 0)],
    )
}

/// Ring of three unit-delay nodes with a single register.
///
/// Any period below 3 is infeasible.
pub fn single_register_ring() -> Circuit {
    build_circuit(
        &[1, 1, 1],
        3,
        &[("Edge12", 1, 2, 1), ("Edge23", 2, 3, 0), ("Edge31", 3, 1, 0)],
    )
}

/// The correlator from Leiserson and Saxe's retiming paper.
///
/// Node 1 is the host (delay 0), nodes 2 to 5 are comparators (delay 3) and nodes 6 to 8
/// are adders (delay 7). The circuit runs at period 24 and retimes to 13.
pub fn correlator() -> Circuit {
    build_circuit(
        &[0, 3, 3, 3, 3, 7, 7, 7],
        24,
        &[
            ("Edge12", 1, 2, 1),
            ("Edge23", 2, 3, 1),
            ("Edge34", 3, 4, 1),
            ("Edge45", 4, 5, 1),
            ("Edge28", 2, 8, 0),
            ("Edge37", 3, 7, 0),
            ("Edge46", 4, 6, 0),
            ("Edge56", 5, 6, 0),
            ("Edge67", 6, 7, 0),
            ("Edge78", 7, 8, 0),
            ("Edge81", 8, 1, 0),
        ],
    )
}
