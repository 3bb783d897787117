//! Maps a workflow node's `type` string to its executor (spec §4.6 step 2
//! "invoke the executor registered for its type").

use std::collections::HashMap;
use std::sync::Arc;

use crate::condition::ConditionNode;
use crate::control::ControlNode;
use crate::data_process::DataProcessNode;
use crate::start_end::{EndNode, StartNode};
use crate::task_execute::TaskExecuteNode;
use crate::ticket_update::TicketUpdateNode;
use crate::traits::ExecutableNode;

pub type NodeRegistry = HashMap<&'static str, Arc<dyn ExecutableNode>>;

/// The registry wired to the built-in node kinds. Every `WorkflowNode::type`
/// value enumerated in spec §3 has an entry here.
pub fn default_registry() -> NodeRegistry {
    let mut registry: NodeRegistry = HashMap::new();
    registry.insert("start", Arc::new(StartNode));
    registry.insert("end", Arc::new(EndNode));
    registry.insert("condition", Arc::new(ConditionNode));
    registry.insert("data_process", Arc::new(DataProcessNode));
    registry.insert("task_execute", Arc::new(TaskExecuteNode));
    registry.insert("control", Arc::new(ControlNode));
    registry.insert("ticket_update", Arc::new(TicketUpdateNode));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_every_node_kind() {
        let registry = default_registry();
        for kind in ["start", "end", "condition", "data_process", "task_execute", "control", "ticket_update"] {
            assert!(registry.contains_key(kind), "missing executor for '{kind}'");
        }
    }
}
