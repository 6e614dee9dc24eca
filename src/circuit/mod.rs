//! Synchronous circuit model consumed by the retiming engine.
//!
//! A [`Circuit`] is a directed graph whose nodes are combinational blocks with a fixed
//! propagation delay and whose edges carry a number of registers. Node ids are 1-based in
//! circuit files and in every message shown to users; internally node `id` lives at graph
//! index `id - 1`, which is also its row/column in every matrix built by
//! [`crate::retiming`].
//!
//! # Invariants
//!
//! - At least one node.
//! - No self-loops and at most one edge per ordered node pair.
//! - No combinational cycle: every directed cycle carries at least one register.
//!
//! The first two are enforced by [`Circuit::add_edge`], the rest by [`Circuit::validate`].
//!
//! # Example
//!
//! ```
//! use retime::circuit::Circuit;
//!
//! let mut circuit = Circuit::new([1, 2, 1], 4);
//! circuit.add_edge("Edge12", 1, 2, 1).unwrap();
//! circuit.add_edge("Edge23", 2, 3, 1).unwrap();
//! circuit.add_edge("Edge31", 3, 1, 0).unwrap();
//! circuit.validate().unwrap();
//!
//! assert_eq!(circuit.clock_period().unwrap().period, 2);
//! ```

pub mod parser;
pub mod serialisation;
#[cfg(test)]
pub mod test_helpers;

pub use parser::parse_circuit;

use crate::Symbol;
use petgraph::{
    algo,
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use std::{error::Error, fmt};

/// A combinational block of the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// 1-based node id.
    pub id: usize,
    /// Propagation delay through the block.
    pub delay: u32,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (d={})", self.id, self.delay)
    }
}

/// A wire between two blocks, carrying `registers` clocked storage elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Name the edge had in the circuit file.
    pub name: Symbol,
    pub registers: u32,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.registers)
    }
}

/// Borrowed view of one edge.
///
/// `source` and `target` are 0-based node indices; add one to get node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    pub name: &'a Symbol,
    pub source: usize,
    pub target: usize,
    pub registers: u32,
}

/// Longest register-free path of a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalPath {
    /// Sum of node delays along the path.
    pub period: u64,
    /// Node ids (1-based) in path order.
    pub nodes: Vec<usize>,
}

/// Reasons a circuit description is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// A required key never appeared in the circuit file.
    MissingKey(&'static str),
    /// A non-comment line has no `=`.
    MissingSeparator { line: usize },
    /// A value could not be read as a non-negative integer.
    InvalidNumber {
        line: usize,
        key: String,
        value: String,
    },
    /// The same key appeared twice.
    DuplicateKey { line: usize, key: String },
    /// An edge name does not end in the endpoint node ids.
    UnnamedEdge { line: usize, name: String },
    /// `NodeDelays` does not list one delay per node.
    DelayCountMismatch { expected: usize, found: usize },
    /// The circuit has no nodes.
    Empty,
    NodeOutOfRange {
        edge: Symbol,
        node: usize,
        total: usize,
    },
    SelfLoop { edge: Symbol, node: usize },
    DuplicateEdge {
        edge: Symbol,
        from: usize,
        to: usize,
    },
    /// A directed cycle without any register passes through `node`.
    CombinationalCycle { node: usize },
}

impl fmt::Display for CircuitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitError::MissingKey(key) => write!(f, "missing required key `{}`", key),
            CircuitError::MissingSeparator { line } => {
                write!(f, "line {}: expected `key=value`", line)
            }
            CircuitError::InvalidNumber { line, key, value } => write!(
                f,
                "line {}: `{}` is not a valid non-negative integer for `{}`",
                line, value, key
            ),
            CircuitError::DuplicateKey { line, key } => {
                write!(f, "line {}: `{}` is defined more than once", line, key)
            }
            CircuitError::UnnamedEdge { line, name } => write!(
                f,
                "line {}: edge name `{}` does not end in its endpoint node ids",
                line, name
            ),
            CircuitError::DelayCountMismatch { expected, found } => write!(
                f,
                "NodeDelays lists {} delays but TotalNodes is {}",
                found, expected
            ),
            CircuitError::Empty => write!(f, "circuit has no nodes"),
            CircuitError::NodeOutOfRange { edge, node, total } => write!(
                f,
                "edge {} references node {} outside 1..={}",
                edge, node, total
            ),
            CircuitError::SelfLoop { edge, node } => {
                write!(f, "edge {} loops on node {}", edge, node)
            }
            CircuitError::DuplicateEdge { edge, from, to } => write!(
                f,
                "edge {} duplicates an existing edge from node {} to node {}",
                edge, from, to
            ),
            CircuitError::CombinationalCycle { node } => write!(
                f,
                "combinational cycle through node {}: every cycle needs at least one register",
                node
            ),
        }
    }
}

impl Error for CircuitError {}

/// In-memory circuit: node delays, registered edges and the stated clock period.
#[derive(Debug, Clone)]
pub struct Circuit {
    graph: DiGraph<Node, Connection>,
    max_clock_cycle: u32,
}

impl Circuit {
    /// Create a circuit with one node per delay, in node id order, and no edges.
    pub fn new(delays: impl IntoIterator<Item = u32>, max_clock_cycle: u32) -> Self {
        let mut graph = DiGraph::new();
        for (i, delay) in delays.into_iter().enumerate() {
            graph.add_node(Node { id: i + 1, delay });
        }
        Self {
            graph,
            max_clock_cycle,
        }
    }

    /// Add an edge between node ids `from` and `to` (both 1-based).
    pub fn add_edge(
        &mut self,
        name: impl Into<Symbol>,
        from: usize,
        to: usize,
        registers: u32,
    ) -> Result<EdgeIndex, CircuitError> {
        let name = name.into();
        let total = self.node_count();

        if let Some(&node) = [from, to].iter().find(|&&n| n == 0 || n > total) {
            return Err(CircuitError::NodeOutOfRange {
                edge: name,
                node,
                total,
            });
        }
        if from == to {
            return Err(CircuitError::SelfLoop {
                edge: name,
                node: from,
            });
        }

        let (source, target) = (NodeIndex::new(from - 1), NodeIndex::new(to - 1));
        if self.graph.find_edge(source, target).is_some() {
            return Err(CircuitError::DuplicateEdge {
                edge: name,
                from,
                to,
            });
        }

        Ok(self
            .graph
            .add_edge(source, target, Connection { name, registers }))
    }

    /// Check the invariants [`Circuit::add_edge`] cannot check on its own.
    pub fn validate(&self) -> Result<(), CircuitError> {
        if self.node_count() == 0 {
            return Err(CircuitError::Empty);
        }
        self.combinational_order().map(|_| ())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Delay of the node at 0-based `index`.
    pub fn delay(&self, index: usize) -> u32 {
        self.graph[NodeIndex::new(index)].delay
    }

    /// Node delays in node id order.
    pub fn delays(&self) -> impl Iterator<Item = u32> + '_ {
        self.graph.node_indices().map(move |ix| self.graph[ix].delay)
    }

    pub fn max_node_delay(&self) -> u32 {
        self.delays().max().unwrap_or(0)
    }

    /// The clock period stated by the circuit description.
    pub fn max_clock_cycle(&self) -> u32 {
        self.max_clock_cycle
    }

    pub fn set_max_clock_cycle(&mut self, period: u32) {
        self.max_clock_cycle = period;
    }

    /// Edges in the order they were added.
    pub fn edges(&self) -> impl Iterator<Item = Edge<'_>> {
        self.graph.edge_references().map(|e| Edge {
            name: &e.weight().name,
            source: e.source().index(),
            target: e.target().index(),
            registers: e.weight().registers,
        })
    }

    /// Register count of the edge between 0-based indices, if there is one.
    pub fn registers(&self, source: usize, target: usize) -> Option<u32> {
        self.graph
            .find_edge(NodeIndex::new(source), NodeIndex::new(target))
            .map(|ie| self.graph[ie].registers)
    }

    pub fn graph(&self) -> &DiGraph<Node, Connection> {
        &self.graph
    }

    /// Copy of this circuit with every edge's register count replaced by `f(edge)`.
    ///
    /// Stops at the first error returned by `f`.
    pub fn map_registers<E>(
        &self,
        mut f: impl FnMut(Edge<'_>) -> Result<u32, E>,
    ) -> Result<Circuit, E> {
        let mut retimed = self.clone();
        for (ie, edge) in self.graph.edge_indices().zip(self.edges()) {
            retimed.graph[ie].registers = f(edge)?;
        }
        Ok(retimed)
    }

    /// Longest node-delay sum along a path that crosses no register.
    ///
    /// This is the clock period the circuit currently needs.
    pub fn clock_period(&self) -> Result<CriticalPath, CircuitError> {
        let order = self.combinational_order()?;
        let n = self.node_count();

        let mut arrival: Vec<u64> = self.delays().map(u64::from).collect();
        let mut predecessor: Vec<Option<usize>> = vec![None; n];

        for ix in order {
            for e in self.graph.edges(ix) {
                if e.weight().registers != 0 {
                    continue;
                }
                let (s, t) = (ix.index(), e.target().index());
                let candidate = arrival[s] + u64::from(self.delay(t));
                if candidate > arrival[t] {
                    arrival[t] = candidate;
                    predecessor[t] = Some(s);
                }
            }
        }

        // First node with the largest arrival time
        let Some((end, &period)) = arrival.iter().enumerate().rev().max_by_key(|(_, a)| **a)
        else {
            return Ok(CriticalPath {
                period: 0,
                nodes: vec![],
            });
        };

        let mut nodes = vec![end + 1];
        let mut current = end;
        while let Some(previous) = predecessor[current] {
            nodes.push(previous + 1);
            current = previous;
        }
        nodes.reverse();

        Ok(CriticalPath { period, nodes })
    }

    /// Topological order of the register-free subgraph.
    fn combinational_order(&self) -> Result<Vec<NodeIndex>, CircuitError> {
        let combinational = self.graph.filter_map(
            |_, node| Some(node.delay),
            |_, connection| (connection.registers == 0).then_some(()),
        );

        algo::toposort(&combinational, None).map_err(|cycle| {
            CircuitError::CombinationalCycle {
                node: cycle.node_id().index() + 1,
            }
        })
    }
}

impl PartialEq for Circuit {
    fn eq(&self, other: &Self) -> bool {
        self.max_clock_cycle == other.max_clock_cycle
            && self.delays().eq(other.delays())
            && self.edges().eq(other.edges())
    }
}

impl Eq for Circuit {}
