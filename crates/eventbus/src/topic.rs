//! The two topic families events are routed through.

use std::fmt;

use weave_core::{ExecutionId, WorkflowId};

/// A destination on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `workflow:{workflowId}` — high-level events about any execution of
    /// that workflow.
    Workflow(WorkflowId),
    /// `execution:{executionId}` — fine-grained node events for one run.
    Execution(ExecutionId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workflow(id) => write!(f, "workflow:{id}"),
            Self::Execution(id) => write!(f, "execution:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_topic_formats_with_prefix() {
        let topic = Topic::Workflow("wf1".into());
        assert_eq!(topic.to_string(), "workflow:wf1");
    }

    #[test]
    fn execution_topic_formats_with_prefix() {
        let id = ExecutionId::new();
        let topic = Topic::Execution(id);
        assert_eq!(topic.to_string(), format!("execution:{id}"));
    }

    #[test]
    fn distinct_topics_are_not_equal() {
        assert_ne!(Topic::Workflow("a".into()), Topic::Workflow("b".into()));
    }
}
