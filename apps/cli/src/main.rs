//! `weave`: a local operator tool for the workflow engine.
//!
//! Loads a workflow definition from a JSON or YAML file, runs it through
//! the same [`weave_facade::ExecutionFacade`] the HTTP surface uses, and
//! prints the unified façade response plus every recorded node execution
//! — useful for exercising end-to-end scenarios without standing up a
//! server. This binary links its own small node-type registry (see
//! [`builtin`]) rather than a real node library, which stays out of this
//! workspace's scope.

mod builtin;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use weave_core::{NodeId, WorkflowId};
use weave_credential::{CredentialResolver, EncryptionKey, InMemoryCredentialStore};
use weave_engine::FlowExecutionEngine;
use weave_eventbus::EventBus;
use weave_execution::ProgressTracker;
use weave_facade::{ExecutionFacade, FacadeConfig, InMemoryWorkflowSource, StartExecutionRequest, WorkflowSource};
use weave_persistence::{InMemoryPersistenceStore, PersistenceStore};
use weave_workflow::{ParameterValue, Workflow};

#[derive(Parser)]
#[command(name = "weave", about = "Local operator tool for the weave workflow engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow file end to end and print the façade response.
    Run {
        /// Path to a workflow definition, JSON or YAML.
        #[arg(long)]
        workflow: PathBuf,
        /// Trigger node to start from. Defaults to the workflow's sole
        /// trigger.
        #[arg(long)]
        trigger: Option<String>,
        /// Run exactly this node in isolation instead of the full graph.
        #[arg(long)]
        node: Option<String>,
        /// Raw `triggerData`, as a JSON literal. Ignored when `--node` is
        /// set.
        #[arg(long, default_value = "null")]
        trigger_data: String,
        /// Single-node `inputData.main`, as a JSON array literal of items'
        /// `json` payloads. Ignored in full-workflow mode.
        #[arg(long, default_value = "[]")]
        input: String,
        /// Parameter overrides for single-node mode, `name=jsonValue`,
        /// repeatable.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, serde_json::Value)>,
        /// Print every recorded node execution after the run completes.
        #[arg(long)]
        detail: bool,
    },
    /// Parse and structurally validate a workflow file without running it.
    Validate {
        /// Path to a workflow definition, JSON or YAML.
        #[arg(long)]
        workflow: PathBuf,
    },
}

fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn load_workflow(path: &PathBuf) -> anyhow::Result<Workflow> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    let workflow = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&raw)?,
        _ => serde_json::from_str(&raw)?,
    };
    Ok(workflow)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { workflow } => {
            let workflow = load_workflow(&workflow)?;
            workflow.validate()?;
            println!(
                "{} is a valid workflow ({} nodes, {} connections)",
                workflow.id,
                workflow.nodes.len(),
                workflow.connections.len()
            );
            Ok(())
        }
        Command::Run {
            workflow,
            trigger,
            node,
            trigger_data,
            input,
            params,
            detail,
        } => run(workflow, trigger, node, trigger_data, input, params, detail).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    workflow_path: PathBuf,
    trigger: Option<String>,
    node: Option<String>,
    trigger_data: String,
    input: String,
    params: Vec<(String, serde_json::Value)>,
    detail: bool,
) -> anyhow::Result<()> {
    let workflow = load_workflow(&workflow_path)?;
    workflow.validate()?;
    let workflow_id = workflow.id.clone();

    let workflows = Arc::new(InMemoryWorkflowSource::new());
    workflows.put(workflow);

    let credentials = Arc::new(InMemoryCredentialStore::new());
    let key = EncryptionKey::from_bytes(&[0u8; 32]).expect("fixed dev key is 32 bytes");
    let resolver = Arc::new(CredentialResolver::new(credentials, key));
    let tracker = Arc::new(ProgressTracker::new());
    let persistence: Arc<dyn PersistenceStore> = Arc::new(InMemoryPersistenceStore::new());
    let events = Arc::new(EventBus::new());

    let engine = Arc::new(FlowExecutionEngine::new(
        Arc::new(builtin::registry()),
        resolver,
        tracker.clone(),
        persistence.clone(),
        events.clone(),
    ));
    let facade = ExecutionFacade::new(
        workflows as Arc<dyn WorkflowSource>,
        engine,
        tracker,
        persistence,
        events,
        FacadeConfig::default(),
    );

    let request = if let Some(node_id) = node {
        let items: Vec<serde_json::Value> = serde_json::from_str(&input)?;
        let mut port_items = weave_core::PortItems::new();
        port_items.insert(
            "main".into(),
            items.into_iter().map(weave_core::Item::json).collect(),
        );
        let mut request = StartExecutionRequest::single_node(
            workflow_id,
            NodeId::from(node_id.as_str()),
            port_items,
        );
        if !params.is_empty() {
            let overrides: HashMap<String, ParameterValue> = params
                .into_iter()
                .map(|(k, v)| (k, ParameterValue::from_value(v)))
                .collect();
            request.parameters = Some(overrides);
        }
        request
    } else {
        let mut request =
            StartExecutionRequest::workflow(workflow_id, serde_json::from_str(&trigger_data)?);
        request.trigger_node_id = trigger.map(|id| NodeId::from(id.as_str()));
        request
    };

    let response = facade.start_execution(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if detail {
        let detail = facade.get_execution(response.execution_id).await?;
        println!("{}", serde_json::to_string_pretty(&detail)?);
    }

    if response.has_failures {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_param_accepts_json_values() {
        let (name, value) = parse_param("count=3").unwrap();
        assert_eq!(name, "count");
        assert_eq!(value, serde_json::json!(3));
    }

    #[test]
    fn parse_param_falls_back_to_string_for_non_json() {
        let (name, value) = parse_param("label=hello world").unwrap();
        assert_eq!(name, "label");
        assert_eq!(value, serde_json::json!("hello world"));
    }

    #[test]
    fn parse_param_rejects_missing_equals() {
        assert!(parse_param("no-equals-sign").is_err());
    }

    #[test]
    fn load_workflow_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "id": "wf1",
                "name": "test",
                "nodes": [],
                "connections": []
            })
            .to_string(),
        )
        .unwrap();
        let workflow = load_workflow(&path).unwrap();
        assert_eq!(workflow.id, WorkflowId::from("wf1"));
    }

    #[test]
    fn load_workflow_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.yaml");
        std::fs::write(
            &path,
            "id: wf1\nname: test\nnodes: []\nconnections: []\n",
        )
        .unwrap();
        let workflow = load_workflow(&path).unwrap();
        assert_eq!(workflow.id, WorkflowId::from("wf1"));
    }
}
