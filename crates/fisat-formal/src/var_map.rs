//! Persisted variable map
//!
//! The JSON layout pairs the forward mappings with a reverse index keyed
//! by stringified variable id, so an external result can be decoded without
//! the circuit.

use crate::variables::{Namespace, VarId, VariableTable};
use crate::{FormalError, FormalResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Suffix appended to node ids in the faulty-output mapping
pub const FAULTY_SUFFIX: &str = "_faulty";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableMap {
    pub variable_map: IndexMap<String, VarId>,
    pub control_vars: IndexMap<String, VarId>,
    pub faulty_outputs: IndexMap<String, VarId>,
    pub var_to_node: ReverseMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReverseMap {
    pub nodes: IndexMap<String, String>,
    pub controls: IndexMap<String, String>,
    pub faulty_outputs: IndexMap<String, String>,
}

impl VariableMap {
    pub fn from_table(table: &VariableTable) -> Self {
        let faulty_outputs: IndexMap<String, VarId> = table
            .faulty_vars()
            .iter()
            .map(|(id, &var)| (format!("{}{}", id, FAULTY_SUFFIX), var))
            .collect();

        let reverse = |map: &IndexMap<String, VarId>| {
            map.iter()
                .map(|(id, var)| (var.to_string(), id.clone()))
                .collect::<IndexMap<_, _>>()
        };

        Self {
            variable_map: table.node_vars().clone(),
            control_vars: table.control_vars().clone(),
            var_to_node: ReverseMap {
                nodes: reverse(table.node_vars()),
                controls: reverse(table.control_vars()),
                faulty_outputs: reverse(&faulty_outputs),
            },
            faulty_outputs,
        }
    }

    /// Rebuild the variable table, stripping the faulty suffix
    pub fn to_table(&self) -> FormalResult<VariableTable> {
        let faulty = self
            .faulty_outputs
            .iter()
            .map(|(key, &var)| {
                key.strip_suffix(FAULTY_SUFFIX)
                    .map(|id| (id.to_string(), var))
                    .ok_or_else(|| {
                        FormalError::Decoding(format!(
                            "faulty output key '{}' lacks the '{}' suffix",
                            key, FAULTY_SUFFIX
                        ))
                    })
            })
            .collect::<FormalResult<IndexMap<_, _>>>()?;

        // Ids must be valid DIMACS variables and owned by exactly one entry
        let mut owners: HashMap<VarId, (Namespace, &str)> = HashMap::new();
        let sections = [
            (Namespace::Node, &self.variable_map),
            (Namespace::Control, &self.control_vars),
            (Namespace::Faulty, &faulty),
        ];
        for (namespace, mapping) in sections {
            for (id, &var) in mapping {
                if var == 0 || var > i32::MAX as VarId {
                    return Err(FormalError::Decoding(format!(
                        "{} entry '{}' has invalid variable id {}",
                        namespace.as_str(),
                        id,
                        var
                    )));
                }
                if let Some((other, other_id)) = owners.insert(var, (namespace, id.as_str())) {
                    return Err(FormalError::Decoding(format!(
                        "variable {} is assigned to both {} '{}' and {} '{}'",
                        var,
                        other.as_str(),
                        other_id,
                        namespace.as_str(),
                        id
                    )));
                }
            }
        }

        Ok(VariableTable::from_mappings(
            self.variable_map.clone(),
            self.control_vars.clone(),
            faulty,
        ))
    }

    /// Node id of a control variable, via the reverse index
    pub fn control_node(&self, var: VarId) -> Option<&str> {
        self.var_to_node
            .controls
            .get(&var.to_string())
            .map(String::as_str)
    }

    pub fn write_json(&self, path: &Path) -> FormalResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        log::info!("Variable map written to {}", path.display());
        Ok(())
    }

    pub fn read_json(path: &Path) -> FormalResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableAllocator;

    fn table() -> VariableTable {
        let mut alloc = VariableAllocator::new();
        alloc.var_for_node("a");
        alloc.var_for_node("g");
        alloc.control_var_for("g");
        alloc.faulty_var_for("g");
        alloc.var_for_node("flag");
        alloc.finish()
    }

    #[test]
    fn test_layout() {
        let map = VariableMap::from_table(&table());
        assert_eq!(map.variable_map["g"], 2);
        assert_eq!(map.control_vars["g"], 3);
        assert_eq!(map.faulty_outputs["g_faulty"], 4);
        assert_eq!(map.var_to_node.nodes["5"], "flag");
        assert_eq!(map.var_to_node.faulty_outputs["4"], "g_faulty");
        assert_eq!(map.control_node(3), Some("g"));
        assert_eq!(map.control_node(2), None);

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["var_to_node"]["controls"]["3"], "g");
    }

    #[test]
    fn test_file_round_trip_resolves_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        let table = table();
        VariableMap::from_table(&table).write_json(&path).unwrap();

        let loaded = VariableMap::read_json(&path).unwrap();
        let rebuilt = loaded.to_table().unwrap();
        for (id, &var) in table.node_vars() {
            assert_eq!(rebuilt.node_var(id), Some(var));
            assert_eq!(loaded.var_to_node.nodes[&var.to_string()], *id);
        }
        assert_eq!(rebuilt.faulty_var("g"), table.faulty_var("g"));
        assert_eq!(rebuilt.control_vars(), table.control_vars());
    }

    #[test]
    fn test_bad_faulty_key_is_decoding_error() {
        let mut map = VariableMap::from_table(&table());
        map.faulty_outputs.insert("oops".to_string(), 9);
        assert!(matches!(map.to_table(), Err(FormalError::Decoding(_))));
    }

    #[test]
    fn test_invalid_ids_are_decoding_errors() {
        let mut zero = VariableMap::from_table(&table());
        zero.control_vars.insert("g".to_string(), 0);
        assert!(matches!(zero.to_table(), Err(FormalError::Decoding(_))));

        let mut huge = VariableMap::from_table(&table());
        huge.variable_map.insert("a".to_string(), u32::MAX);
        assert!(matches!(huge.to_table(), Err(FormalError::Decoding(_))));

        // Control id reused as a node id
        let mut shared = VariableMap::from_table(&table());
        shared.control_vars.insert("g".to_string(), 2);
        match shared.to_table() {
            Err(FormalError::Decoding(msg)) => assert!(msg.contains("variable 2"), "{}", msg),
            other => panic!("expected decoding error, got {:?}", other),
        }

        // Two nodes sharing an id
        let mut duplicate = VariableMap::from_table(&table());
        duplicate.variable_map.insert("b".to_string(), 1);
        assert!(matches!(duplicate.to_table(), Err(FormalError::Decoding(_))));
    }
}
