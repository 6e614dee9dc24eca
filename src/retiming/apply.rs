//! Applying a retiming vector to a circuit.

use crate::{RetimeError, circuit::Circuit};

/// Move registers according to `vector`, indexed by 0-based node index.
///
/// Every edge `(u, v)` gets `registers(u, v) − r(u) + r(v)` registers and the retimed
/// circuit states `period` as its clock period. A negative count is reported as
/// [`RetimeError::NegativeRegisters`], never clamped.
pub fn apply_retiming(
    circuit: &Circuit,
    vector: &[i64],
    period: u32,
) -> Result<Circuit, RetimeError> {
    debug_assert_eq!(vector.len(), circuit.node_count());

    let mut retimed = circuit.map_registers(|edge| {
        let registers = i64::from(edge.registers) - vector[edge.source] + vector[edge.target];
        if registers < 0 {
            return Err(RetimeError::NegativeRegisters {
                edge: edge.name.clone(),
                from: edge.source + 1,
                to: edge.target + 1,
                registers,
            });
        }
        u32::try_from(registers).map_err(|_| RetimeError::Overflow {
            stage: "retimed register count",
        })
    })?;
    retimed.set_max_clock_cycle(period);

    Ok(retimed)
}
