//! Registros de ejecución reconstruidos por replay del log de eventos.
//!
//! El replay consume los eventos de un run en orden y actualiza un record
//! por acción. Es la interfaz de consulta de sólo lectura: sirve igual a
//! mitad de run (snapshot parcial) que al final (report completo).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ActionError;
use crate::event::{RunEvent, RunEventKind};
use crate::model::PipelineDefinition;

/// Estado observable de una acción.
///
/// Transiciones válidas: `Pending -> Running -> {Succeeded, Failed,
/// Cancelled}`. Una aprobación manual vuelve a `Pending` mientras espera la
/// decisión externa (está suspendida, no ocupa worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Succeeded | ActionStatus::Failed | ActionStatus::Cancelled)
    }
}

/// Estado terminal de un run completo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Record por acción de un run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub stage: String,
    pub action: String,
    pub status: ActionStatus,
    /// Intentos observados (reintentos transitorios incluidos).
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Detalle estructurado si la acción falló.
    pub error: Option<ActionError>,
    /// Hashes de contenido de los artifacts comprometidos.
    pub outputs: Vec<String>,
}

/// Vista reconstruida de un run: records en orden de declaración más el
/// estado terminal si ya cerró.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub records: Vec<ExecutionRecord>,
    pub finished: Option<RunStatus>,
}

impl RunSnapshot {
    pub fn record(&self, stage: &str, action: &str) -> Option<&ExecutionRecord> {
        self.records
            .iter()
            .find(|r| r.stage == stage && r.action == action)
    }
}

/// Resultado final de `PipelineEngine::run`.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub records: Vec<ExecutionRecord>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn record(&self, stage: &str, action: &str) -> Option<&ExecutionRecord> {
        self.records
            .iter()
            .find(|r| r.stage == stage && r.action == action)
    }
}

/// Reconstruye el estado observable de un run a partir de sus eventos.
/// Los records salen en orden de declaración del pipeline.
pub fn replay(run_id: Uuid, definition: &PipelineDefinition, events: &[RunEvent]) -> RunSnapshot {
    let mut records: IndexMap<(String, String), ExecutionRecord> = IndexMap::with_capacity(definition.action_count());
    for stage in &definition.stages {
        for action in &stage.actions {
            records.insert((stage.name.clone(), action.name.clone()),
                           ExecutionRecord { stage: stage.name.clone(),
                                             action: action.name.clone(),
                                             status: ActionStatus::Pending,
                                             attempts: 0,
                                             started_at: None,
                                             finished_at: None,
                                             error: None,
                                             outputs: Vec::new() });
        }
    }

    fn slot<'a>(records: &'a mut IndexMap<(String, String), ExecutionRecord>,
                stage: &str,
                action: &str)
                -> Option<&'a mut ExecutionRecord> {
        records.get_mut(&(stage.to_string(), action.to_string()))
    }

    let mut finished = None;
    for ev in events {
        match &ev.kind {
            RunEventKind::ActionStarted { stage, action, .. } => {
                if let Some(r) = slot(&mut records, stage, action) {
                    r.status = ActionStatus::Running;
                    r.attempts += 1;
                    if r.started_at.is_none() {
                        r.started_at = Some(ev.ts);
                    }
                }
            }
            RunEventKind::ApprovalRequested { stage, action, .. } => {
                // suspendida a la espera de la decisión externa
                if let Some(r) = slot(&mut records, stage, action) {
                    r.status = ActionStatus::Pending;
                }
            }
            RunEventKind::ActionFinished { stage, action, outputs, .. } => {
                if let Some(r) = slot(&mut records, stage, action) {
                    r.status = ActionStatus::Succeeded;
                    r.outputs = outputs.clone();
                    r.finished_at = Some(ev.ts);
                }
            }
            RunEventKind::ActionFailed { stage, action, error } => {
                if let Some(r) = slot(&mut records, stage, action) {
                    r.status = ActionStatus::Failed;
                    r.error = Some(error.clone());
                    r.finished_at = Some(ev.ts);
                }
            }
            RunEventKind::ActionCancelled { stage, action } => {
                if let Some(r) = slot(&mut records, stage, action) {
                    r.status = ActionStatus::Cancelled;
                    r.error = Some(ActionError::Cancelled);
                    r.finished_at = Some(ev.ts);
                }
            }
            RunEventKind::RunFinished { status } => finished = Some(*status),
            RunEventKind::RunInitialized { .. }
            | RunEventKind::StageStarted { .. }
            | RunEventKind::RetryScheduled { .. }
            | RunEventKind::ApprovalResolved { .. } => {}
        }
    }

    RunSnapshot { run_id,
                  records: records.into_values().collect(),
                  finished }
}
