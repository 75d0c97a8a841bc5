//! A port for fetching a workflow definition by id.
//!
//! Workflow CRUD is explicitly out of scope : the façade and trigger
//! dispatcher only need *some* way to turn a `workflowId` into the
//! `Workflow` the engine runs against. This trait is that seam; the
//! in-memory implementation below is what tests and `weave-cli` use.

use dashmap::DashMap;
use weave_core::WorkflowId;
use weave_workflow::Workflow;

/// Resolves a `workflowId` to its current definition.
pub trait WorkflowSource: Send + Sync {
    /// Fetch a workflow by id, if known.
    fn get(&self, id: &WorkflowId) -> Option<Workflow>;
}

/// An in-process workflow store, keyed by id. Suitable for tests,
/// `weave-cli`, and any deployment that loads its workflows from files at
/// startup rather than a database.
#[derive(Default)]
pub struct InMemoryWorkflowSource {
    workflows: DashMap<WorkflowId, Workflow>,
}

impl InMemoryWorkflowSource {
    /// Build an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a workflow definition.
    pub fn put(&self, workflow: Workflow) {
        self.workflows.insert(workflow.id.clone(), workflow);
    }
}

impl WorkflowSource for InMemoryWorkflowSource {
    fn get(&self, id: &WorkflowId) -> Option<Workflow> {
        self.workflows.get(id).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_workflow::WorkflowSettings;

    fn workflow(id: &str) -> Workflow {
        Workflow {
            id: id.into(),
            name: id.into(),
            nodes: vec![],
            connections: vec![],
            settings: WorkflowSettings::default(),
            active: true,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let source = InMemoryWorkflowSource::new();
        source.put(workflow("wf1"));
        assert!(source.get(&"wf1".into()).is_some());
    }

    #[test]
    fn unknown_id_returns_none() {
        let source = InMemoryWorkflowSource::new();
        assert!(source.get(&"ghost".into()).is_none());
    }
}
