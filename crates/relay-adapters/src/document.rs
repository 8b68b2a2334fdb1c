//! Carga de un documento JSON de pipeline.
//!
//! El formato de serialización es asunto de este adapter, no del motor: el
//! core sólo consume la `PipelineDefinition` construida. La validación
//! semántica (unicidad, referencias, tokens) sigue siendo del motor.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use relay_core::{ActionKind, ActionSpec, PipelineDefinition, Stage};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pipeline document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown action kind: {0} (expected source|build|approval|deploy)")]
    UnknownKind(String),
}

#[derive(Debug, Deserialize)]
struct PipelineDoc {
    name: String,
    #[serde(default)]
    stages: Vec<StageDoc>,
}

#[derive(Debug, Deserialize)]
struct StageDoc {
    name: String,
    #[serde(default)]
    actions: Vec<ActionDoc>,
}

#[derive(Debug, Deserialize)]
struct ActionDoc {
    name: String,
    kind: String,
    #[serde(default = "default_run_order")]
    run_order: u32,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    output_variables: Vec<String>,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    external_link: Option<String>,
    #[serde(default)]
    deadline_secs: Option<u64>,
}

fn default_run_order() -> u32 {
    1
}

pub fn from_str(text: &str) -> Result<PipelineDefinition, DocumentError> {
    let doc: PipelineDoc = serde_json::from_str(text)?;
    let mut stages = Vec::with_capacity(doc.stages.len());
    for stage in doc.stages {
        let mut actions = Vec::with_capacity(stage.actions.len());
        for action in stage.actions {
            actions.push(convert(action)?);
        }
        stages.push(Stage { name: stage.name,
                            actions });
    }
    Ok(PipelineDefinition::new(&doc.name, stages))
}

pub fn from_path(path: &Path) -> Result<PipelineDefinition, DocumentError> {
    let text = fs::read_to_string(path).map_err(|source| DocumentError::Io { path: path.display().to_string(),
                                                                             source })?;
    from_str(&text)
}

fn convert(doc: ActionDoc) -> Result<ActionSpec, DocumentError> {
    let kind = match doc.kind.as_str() {
        "source" => ActionKind::Source,
        "build" => ActionKind::Build,
        "approval" => ActionKind::ManualApproval,
        "deploy" => ActionKind::Deploy,
        other => return Err(DocumentError::UnknownKind(other.to_string())),
    };
    Ok(ActionSpec { name: doc.name,
                    kind,
                    run_order: doc.run_order,
                    inputs: doc.inputs,
                    outputs: doc.outputs,
                    namespace: doc.namespace,
                    output_variables: doc.output_variables,
                    config: doc.config,
                    summary: doc.summary,
                    external_link: doc.external_link,
                    deadline_secs: doc.deadline_secs })
}
