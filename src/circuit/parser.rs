//! Reader for the line-oriented circuit description format.
//!
//! ```text
//! // Specifies the total number of nodes in the graph
//! TotalNodes=3
//!
//! // Specifies the delay for each node in the graph
//! NodeDelays=1,2,1
//!
//! // Specifies the delay for each edge between nodes in the graph
//! Edge12=1
//! Edge23=1
//! Edge31=0
//!
//! // Specifies the maximum clock cycle for the algorithm
//! MaxClockCycle=4
//! ```
//!
//! Blank lines and lines starting with `//` are skipped. Every key other than
//! `TotalNodes`, `NodeDelays` and `MaxClockCycle` names an edge, and its value is the
//! edge's register count. The edge's endpoints are encoded at the end of its name: either
//! two single digits (`Edge12` is node 1 to node 2) or two numbers joined by `_` or `-`
//! (`Edge10_11`).

use std::{collections::HashSet, str::FromStr};

use lazy_static::*;
use regex::Regex;

use crate::{
    Symbol,
    circuit::{Circuit, CircuitError},
};

const TOTAL_NODES: &str = "TotalNodes";
const NODE_DELAYS: &str = "NodeDelays";
const MAX_CLOCK_CYCLE: &str = "MaxClockCycle";

/// Extract the (1-based) endpoint node ids encoded in an edge name.
///
/// Unseparated ids must be exactly two digits; `Edge112` is rejected rather than read
/// as `1 -> 2` or `11 -> 2`.
pub fn edge_endpoints(name: &str) -> Option<(usize, usize)> {
    lazy_static! {
        static ref SEPARATED_RE: Regex = Regex::new(r"([0-9]+)[_-]([0-9]+)$").unwrap();
        static ref PACKED_RE: Regex = Regex::new(r"(?:^|[^0-9])([0-9])([0-9])$").unwrap();
    }

    let c = SEPARATED_RE
        .captures(name)
        .or_else(|| PACKED_RE.captures(name))?;

    Some((c[1].parse().ok()?, c[2].parse().ok()?))
}

fn parse_number<T: FromStr>(line: usize, key: &str, value: &str) -> Result<T, CircuitError> {
    value.parse().map_err(|_| CircuitError::InvalidNumber {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn set_once<T>(slot: &mut Option<T>, value: T, line: usize, key: &str) -> Result<(), CircuitError> {
    if slot.is_some() {
        return Err(CircuitError::DuplicateKey {
            line,
            key: key.to_string(),
        });
    }
    *slot = Some(value);
    Ok(())
}

struct EdgeEntry {
    name: Symbol,
    from: usize,
    to: usize,
    registers: u32,
}

/// Parse and validate a circuit description.
///
/// # Example
///
/// ```
/// use retime::circuit::parse_circuit;
///
/// let circuit = parse_circuit(
///     "TotalNodes=2\nNodeDelays=3,4\nEdge12=1\nEdge21=0\nMaxClockCycle=7\n",
/// )
/// .unwrap();
///
/// assert_eq!(circuit.node_count(), 2);
/// assert_eq!(circuit.registers(0, 1), Some(1));
/// assert_eq!(circuit.max_clock_cycle(), 7);
/// ```
pub fn parse_circuit(input: &str) -> Result<Circuit, CircuitError> {
    let mut total_nodes: Option<usize> = None;
    let mut node_delays: Option<Vec<u32>> = None;
    let mut max_clock_cycle: Option<u32> = None;
    let mut edges = Vec::new();
    let mut edge_names = HashSet::new();

    for (i, raw) in input.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        let (key, value) = trimmed
            .split_once('=')
            .ok_or(CircuitError::MissingSeparator { line })?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            TOTAL_NODES => set_once(
                &mut total_nodes,
                parse_number(line, key, value)?,
                line,
                key,
            )?,
            NODE_DELAYS => {
                let delays = value
                    .split(',')
                    .map(|d| parse_number(line, key, d.trim()))
                    .collect::<Result<Vec<u32>, _>>()?;
                set_once(&mut node_delays, delays, line, key)?
            }
            MAX_CLOCK_CYCLE => set_once(
                &mut max_clock_cycle,
                parse_number(line, key, value)?,
                line,
                key,
            )?,
            name => {
                if !edge_names.insert(name) {
                    return Err(CircuitError::DuplicateKey {
                        line,
                        key: name.to_string(),
                    });
                }
                let (from, to) = edge_endpoints(name).ok_or_else(|| CircuitError::UnnamedEdge {
                    line,
                    name: name.to_string(),
                })?;
                edges.push(EdgeEntry {
                    name: Symbol::from(name),
                    from,
                    to,
                    registers: parse_number(line, name, value)?,
                });
            }
        }
    }

    let total_nodes = total_nodes.ok_or(CircuitError::MissingKey(TOTAL_NODES))?;
    if total_nodes == 0 {
        return Err(CircuitError::Empty);
    }
    let node_delays = node_delays.ok_or(CircuitError::MissingKey(NODE_DELAYS))?;
    if node_delays.len() != total_nodes {
        return Err(CircuitError::DelayCountMismatch {
            expected: total_nodes,
            found: node_delays.len(),
        });
    }
    let max_clock_cycle = max_clock_cycle.ok_or(CircuitError::MissingKey(MAX_CLOCK_CYCLE))?;

    let mut circuit = Circuit::new(node_delays, max_clock_cycle);
    for EdgeEntry {
        name,
        from,
        to,
        registers,
    } in edges
    {
        circuit.add_edge(name, from, to, registers)?;
    }
    circuit.validate()?;

    Ok(circuit)
}
