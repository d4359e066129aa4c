//! Tseitin encoding of gates and fault injection
//!
//! Every node gets clauses making its variable equivalent to the gate
//! function of its inputs. Vulnerable nodes additionally get four clauses
//! linking the golden output `o`, the control signal `c` and the faulty
//! shadow `f` under the selected fault semantics.

use crate::cnf::{neg, pos, ClauseCategory, Formula, Lit};
use crate::variables::{VarId, VariableAllocator};
use crate::{FormalError, FormalResult};
use fisat_netlist::{Circuit, FaultType, Node, NodeKind};

// ============================================================================
// Clause templates
// ============================================================================

/// Functional clauses for `kind` with output `o` over resolved inputs
///
/// `inputs` must hold at least `kind.arity()` variables; for `input` and
/// unconnected registers the result is empty.
pub fn functional_clauses(kind: NodeKind, o: VarId, inputs: &[VarId]) -> Vec<Vec<Lit>> {
    let o_pos = pos(o);
    let o_neg = neg(o);
    match kind {
        NodeKind::Input => Vec::new(),
        NodeKind::And => {
            let (i1, i2) = (inputs[0], inputs[1]);
            vec![
                vec![pos(i1), o_neg],
                vec![pos(i2), o_neg],
                vec![neg(i1), neg(i2), o_pos],
            ]
        }
        NodeKind::Or => {
            let (i1, i2) = (inputs[0], inputs[1]);
            vec![
                vec![neg(i1), o_pos],
                vec![neg(i2), o_pos],
                vec![pos(i1), pos(i2), o_neg],
            ]
        }
        NodeKind::Not => {
            let i = inputs[0];
            vec![vec![pos(i), o_pos], vec![neg(i), o_neg]]
        }
        NodeKind::Xor => {
            let (i1, i2) = (inputs[0], inputs[1]);
            vec![
                vec![neg(i1), neg(i2), o_neg],
                vec![pos(i1), pos(i2), o_neg],
                vec![neg(i1), pos(i2), o_pos],
                vec![pos(i1), neg(i2), o_pos],
            ]
        }
        NodeKind::Mux => {
            // sel = 0 selects i1, sel = 1 selects i2
            let (i1, i2, sel) = (inputs[0], inputs[1], inputs[2]);
            vec![
                vec![pos(sel), neg(i1), o_pos],
                vec![pos(sel), pos(i1), o_neg],
                vec![neg(sel), neg(i2), o_pos],
                vec![neg(sel), pos(i2), o_neg],
            ]
        }
        NodeKind::Reg | NodeKind::Output => match inputs.first() {
            Some(&i) => vec![vec![neg(i), o_pos], vec![pos(i), o_neg]],
            None => Vec::new(),
        },
    }
}

/// Fault-injection clauses linking control `c`, golden `o` and faulty `f`
pub fn fault_clauses(fault_type: FaultType, c: VarId, o: VarId, f: VarId) -> [[Lit; 3]; 4] {
    let (c, o, f) = (pos(c), pos(o), pos(f));
    // Without an active fault the shadow follows the golden value
    let passthrough = [[c, o, -f], [c, -o, f]];
    let active = match fault_type {
        FaultType::BitFlip => [[-c, o, f], [-c, -o, -f]],
        FaultType::Set => [[-c, o, f], [-c, -o, f]],
        FaultType::Reset => [[-c, o, -f], [-c, -o, -f]],
    };
    [passthrough[0], passthrough[1], active[0], active[1]]
}

// ============================================================================
// Encoder
// ============================================================================

/// Encodes the nodes of one circuit into a formula
pub struct GateEncoder<'a> {
    circuit: &'a Circuit,
    fault_type: FaultType,
}

impl<'a> GateEncoder<'a> {
    pub fn new(circuit: &'a Circuit) -> Self {
        Self {
            circuit,
            fault_type: circuit.fault_model.fault_type,
        }
    }

    /// Encode every node in description order
    pub fn encode_all(
        &self,
        alloc: &mut VariableAllocator,
        formula: &mut Formula,
    ) -> FormalResult<()> {
        for node in self.circuit.nodes() {
            self.encode_node(node, alloc, formula)?;
        }
        Ok(())
    }

    /// Encode one node: functional clauses, then fault clauses if vulnerable
    pub fn encode_node(
        &self,
        node: &Node,
        alloc: &mut VariableAllocator,
        formula: &mut Formula,
    ) -> FormalResult<()> {
        let inputs = self.resolve_inputs(node, alloc)?;
        let output = alloc.var_for_node(&node.id);

        let clauses = functional_clauses(node.kind, output, &inputs);
        log::debug!(
            "Node {} ({}) added {} normal logic clauses",
            node.id,
            node.kind,
            clauses.len()
        );
        formula.extend(ClauseCategory::NormalLogic, clauses);

        if node.vulnerable {
            if node.kind == NodeKind::Input || inputs.is_empty() {
                log::warn!(
                    "Node {} ({}) is marked vulnerable but has no driving logic; no fault injected",
                    node.id,
                    node.kind
                );
            } else {
                self.encode_fault(&node.id, output, alloc, formula);
            }
        }

        Ok(())
    }

    fn resolve_inputs(
        &self,
        node: &Node,
        alloc: &mut VariableAllocator,
    ) -> FormalResult<Vec<VarId>> {
        let used = node.used_inputs();

        match node.kind {
            NodeKind::Output => {
                let input = used.first().ok_or_else(|| {
                    FormalError::configuration(
                        "gate encoding",
                        &node.id,
                        format!("Output node {} has no valid inputs", node.id),
                    )
                })?;
                // Outputs never allocate: their driver must already be encoded
                let var = alloc.lookup_node(input).ok_or_else(|| {
                    FormalError::configuration(
                        "gate encoding",
                        &node.id,
                        format!(
                            "Input {} of output node {} not found in variable mapping",
                            input, node.id
                        ),
                    )
                })?;
                Ok(vec![var])
            }
            NodeKind::Xor if node.is_comparator() => Ok(used
                .iter()
                .map(|input| {
                    if self.circuit.is_vulnerable(input) {
                        alloc.faulty_var_for(input)
                    } else {
                        alloc.var_for_node(input)
                    }
                })
                .collect()),
            _ => Ok(used.iter().map(|input| alloc.var_for_node(input)).collect()),
        }
    }

    fn encode_fault(
        &self,
        id: &str,
        output: VarId,
        alloc: &mut VariableAllocator,
        formula: &mut Formula,
    ) {
        let control = alloc.control_var_for(id);
        let faulty = alloc.faulty_var_for(id);

        let clauses = fault_clauses(self.fault_type, control, output, faulty);
        formula.extend(
            ClauseCategory::FaultLogic,
            clauses.iter().map(|clause| clause.to_vec()),
        );
        log::debug!("Node {} added {} fault logic clauses", id, clauses.len());
    }
}
