//! The workflow parser (spec §4.4): validates a [`WorkflowDefinition`] and
//! prepares it for execution.
//!
//! Checks run in the order spec'd, so the first violation is the one
//! reported — a caller fixing one error at a time sees the same sequence
//! a human editing the JSON by hand would.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::models::{NodeType, WorkflowDefinition, WorkflowNode};

/// The parser's output: a validated, execution-ready view of the DAG.
#[derive(Debug, Clone)]
pub struct ParsedWorkflow {
    pub start_node: String,
    pub node_map: HashMap<String, WorkflowNode>,
    pub topo_order: Vec<String>,
    pub end_nodes: Vec<String>,
}

/// Validate `definition` against every invariant in spec §3/§4.4 and
/// return the parsed, execution-ready view.
pub fn validate_dag(definition: &WorkflowDefinition) -> Result<ParsedWorkflow, EngineError> {
    if definition.nodes.is_empty() {
        return Err(EngineError::Empty);
    }

    let mut node_map: HashMap<String, WorkflowNode> = HashMap::with_capacity(definition.nodes.len());
    for node in &definition.nodes {
        if node_map.contains_key(&node.id) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
        if node.name.trim().is_empty() {
            return Err(EngineError::MissingName(node.id.clone()));
        }
        node_map.insert(node.id.clone(), node.clone());
    }

    for node in &definition.nodes {
        for target in &node.next_nodes {
            if !node_map.contains_key(target) {
                return Err(EngineError::UnknownNextNode {
                    node_id: node.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    for conn in &definition.connections {
        if !node_map.contains_key(&conn.from) {
            return Err(EngineError::UnknownConnectionEndpoint { node_id: conn.from.clone(), side: "from" });
        }
        if !node_map.contains_key(&conn.to) {
            return Err(EngineError::UnknownConnectionEndpoint { node_id: conn.to.clone(), side: "to" });
        }
    }

    let start_nodes: Vec<&WorkflowNode> =
        definition.nodes.iter().filter(|n| n.node_type == NodeType::Start).collect();
    if start_nodes.len() != 1 {
        return Err(EngineError::StartNodeCount(start_nodes.len()));
    }
    let start_node = start_nodes[0].id.clone();

    let end_nodes: Vec<String> = definition
        .nodes
        .iter()
        .filter(|n| n.node_type == NodeType::End)
        .map(|n| n.id.clone())
        .collect();
    if end_nodes.is_empty() {
        return Err(EngineError::NoEndNode);
    }

    for node in &definition.nodes {
        if node.node_type == NodeType::Condition && node.next_nodes.len() != 2 {
            return Err(EngineError::ConditionArity(node.id.clone()));
        }
    }

    let topo_order = topological_sort(&definition.nodes, &node_map)?;

    Ok(ParsedWorkflow { start_node, node_map, topo_order, end_nodes })
}

/// Kahn's algorithm over the `next_nodes` adjacency. A full topological
/// order covering every node id is required; any node left unvisited
/// means a cycle.
fn topological_sort(
    nodes: &[WorkflowNode],
    node_map: &HashMap<String, WorkflowNode>,
) -> Result<Vec<String>, EngineError> {
    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    for node in nodes {
        for target in &node.next_nodes {
            *in_degree.get_mut(target.as_str()).expect("validated above") += 1;
        }
    }

    let mut queue: Vec<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    queue.sort_unstable();

    let mut order = Vec::with_capacity(nodes.len());
    let mut cursor = 0;
    while cursor < queue.len() {
        let id = queue[cursor];
        cursor += 1;
        order.push(id.to_string());

        let mut newly_free = Vec::new();
        for target in &node_map[id].next_nodes {
            let degree = in_degree.get_mut(target.as_str()).expect("validated above");
            *degree -= 1;
            if *degree == 0 {
                newly_free.push(target.as_str());
            }
        }
        newly_free.sort_unstable();
        queue.extend(newly_free);
    }

    if order.len() != nodes.len() {
        return Err(EngineError::CycleDetected);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, ErrorHandle};
    use serde_json::json;
    use std::collections::HashMap as Map;

    fn node(id: &str, node_type: NodeType, next_nodes: &[&str]) -> WorkflowNode {
        WorkflowNode {
            id: id.to_string(),
            node_type,
            name: format!("node {id}"),
            config: json!({}),
            next_nodes: next_nodes.iter().map(|s| s.to_string()).collect(),
            error_handle: ErrorHandle::Stop,
        }
    }

    fn def(nodes: Vec<WorkflowNode>) -> WorkflowDefinition {
        WorkflowDefinition { nodes, connections: Vec::new(), variables: Map::new() }
    }

    #[test]
    fn accepts_a_minimal_linear_workflow() {
        let d = def(vec![node("n1", NodeType::Start, &["n2"]), node("n2", NodeType::End, &[])]);
        let parsed = validate_dag(&d).unwrap();
        assert_eq!(parsed.start_node, "n1");
        assert_eq!(parsed.end_nodes, vec!["n2".to_string()]);
        assert_eq!(parsed.topo_order, vec!["n1".to_string(), "n2".to_string()]);
    }

    #[test]
    fn rejects_empty_workflow() {
        assert!(matches!(validate_dag(&def(vec![])), Err(EngineError::Empty)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let d = def(vec![node("n1", NodeType::Start, &[]), node("n1", NodeType::End, &[])]);
        assert!(matches!(validate_dag(&d), Err(EngineError::DuplicateNodeId(id)) if id == "n1"));
    }

    #[test]
    fn rejects_unknown_next_node_target() {
        let d = def(vec![node("n1", NodeType::Start, &["missing"])]);
        assert!(matches!(validate_dag(&d), Err(EngineError::UnknownNextNode { .. })));
    }

    #[test]
    fn requires_exactly_one_start() {
        let d = def(vec![
            node("n1", NodeType::Start, &["n3"]),
            node("n2", NodeType::Start, &["n3"]),
            node("n3", NodeType::End, &[]),
        ]);
        assert!(matches!(validate_dag(&d), Err(EngineError::StartNodeCount(2))));
    }

    #[test]
    fn requires_at_least_one_end() {
        let d = def(vec![node("n1", NodeType::Start, &[])]);
        assert!(matches!(validate_dag(&d), Err(EngineError::NoEndNode)));
    }

    #[test]
    fn condition_node_must_have_exactly_two_next_nodes() {
        let d = def(vec![
            node("n1", NodeType::Start, &["c"]),
            node("c", NodeType::Condition, &["t"]),
            node("t", NodeType::End, &[]),
        ]);
        assert!(matches!(validate_dag(&d), Err(EngineError::ConditionArity(id)) if id == "c"));
    }

    #[test]
    fn rejects_cycles() {
        let d = def(vec![
            node("n1", NodeType::Start, &["n2"]),
            node("n2", NodeType::End, &["n1"]),
        ]);
        assert!(matches!(validate_dag(&d), Err(EngineError::CycleDetected)));
    }

    #[test]
    fn rejects_dangling_connection_endpoint() {
        let mut d = def(vec![node("n1", NodeType::Start, &["n2"]), node("n2", NodeType::End, &[])]);
        d.connections.push(Connection { from: "n1".to_string(), to: "ghost".to_string(), condition: None });
        assert!(matches!(validate_dag(&d), Err(EngineError::UnknownConnectionEndpoint { .. })));
    }

    #[test]
    fn condition_branches_to_two_distinct_end_nodes() {
        let d = def(vec![
            node("n1", NodeType::Start, &["c"]),
            node("c", NodeType::Condition, &["t", "f"]),
            node("t", NodeType::End, &[]),
            node("f", NodeType::End, &[]),
        ]);
        let parsed = validate_dag(&d).unwrap();
        assert_eq!(parsed.end_nodes.len(), 2);
    }
}
