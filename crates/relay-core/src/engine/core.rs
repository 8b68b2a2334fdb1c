//! Bucle principal del motor: stages en orden estricto, olas concurrentes,
//! gating todo-o-nada y señal de stop a nivel de pipeline.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::approval::ApprovalGate;
use crate::config::EngineConfig;
use crate::errors::{InvariantFault, RunError};
use crate::event::{RunEvent, RunEventKind, RunEventStore};
use crate::exec::{self, ActionTermination, ExecutorContext};
use crate::model::{ActionSpec, PipelineDefinition, Stage};
use crate::provider::ExecutionProvider;
use crate::record::{self, RunReport, RunSnapshot, RunStatus};
use crate::store::{ArtifactStore, VariableRegistry};

use super::builder::EngineBuilder;
use super::{scheduler, validate};

/// Señal de parada a nivel de pipeline. Clonable y compartible: `cancel()`
/// alcanza a toda acción Running y evita que arranquen nuevas.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Motor de ejecución de pipelines.
///
/// Posee el provider, el gate de aprobaciones, el log de eventos y la
/// configuración. Los stores de artifacts y variables se crean vacíos en
/// cada run: dos runs del mismo motor no comparten estado.
pub struct PipelineEngine {
    provider: Arc<dyn ExecutionProvider>,
    gate: Arc<ApprovalGate>,
    events: Arc<dyn RunEventStore>,
    config: EngineConfig,
}

impl PipelineEngine {
    pub fn builder(provider: Arc<dyn ExecutionProvider>) -> EngineBuilder {
        EngineBuilder::new(provider)
    }

    pub(crate) fn from_parts(provider: Arc<dyn ExecutionProvider>,
                             gate: Arc<ApprovalGate>,
                             events: Arc<dyn RunEventStore>,
                             config: EngineConfig)
                             -> Self {
        Self { provider,
               gate,
               events,
               config }
    }

    /// Gate de aprobaciones, para conectar canales de entrega externos.
    pub fn approval_gate(&self) -> Arc<ApprovalGate> {
        self.gate.clone()
    }

    /// Eventos de un run en orden de append.
    pub fn list_events(&self, run_id: Uuid) -> Vec<RunEvent> {
        self.events.list(run_id)
    }

    /// Interfaz de consulta de sólo lectura: records actuales de un run,
    /// también a mitad de ejecución.
    pub fn snapshot(&self, run_id: Uuid, definition: &PipelineDefinition) -> RunSnapshot {
        record::replay(run_id, definition, &self.events.list(run_id))
    }

    /// Ejecuta el pipeline completo con un run id nuevo y sin señal de
    /// stop externa.
    pub async fn run(&self, definition: &PipelineDefinition) -> Result<RunReport, RunError> {
        self.run_with(Uuid::new_v4(), definition, CancelToken::new()).await
    }

    /// Ejecuta con run id y señal de stop del caller (necesario para
    /// consultar o cancelar el run mientras corre).
    pub async fn run_with(&self,
                          run_id: Uuid,
                          definition: &PipelineDefinition,
                          cancel: CancelToken)
                          -> Result<RunReport, RunError> {
        // fail-fast: nada se ejecuta ni se registra con definición inválida
        validate::validate(definition)?;
        let span = info_span!("pipeline_run", %run_id, pipeline = %definition.name);
        self.drive(run_id, definition, cancel).instrument(span).await
    }

    async fn drive(&self,
                   run_id: Uuid,
                   definition: &PipelineDefinition,
                   cancel: CancelToken)
                   -> Result<RunReport, RunError> {
        let artifacts = Arc::new(ArtifactStore::new());
        let variables = Arc::new(VariableRegistry::new());
        let cancel_rx = cancel.subscribe();

        self.events.append(run_id,
                           RunEventKind::RunInitialized { definition_hash: definition.definition_hash.clone(),
                                                          stage_count: definition.stages.len() });
        info!(stages = definition.stages.len(), "run started");

        for (stage_index, stage) in definition.stages.iter().enumerate() {
            self.events.append(run_id,
                               RunEventKind::StageStarted { stage_index,
                                                            stage: stage.name.clone() });
            let waves = scheduler::order(&stage.actions);

            for (wave_index, wave) in waves.iter().enumerate() {
                if *cancel_rx.borrow() {
                    Self::cancel_remaining(&self.events, run_id, stage, &waves, wave_index,
                                           &definition.stages[stage_index + 1..]);
                    return Ok(self.finish(run_id, definition, RunStatus::Cancelled));
                }

                let mut set: JoinSet<Result<ActionTermination, InvariantFault>> = JoinSet::new();
                for spec in wave {
                    let ctx = ExecutorContext { run_id,
                                                provider: self.provider.clone(),
                                                gate: self.gate.clone(),
                                                events: self.events.clone(),
                                                artifacts: artifacts.clone(),
                                                variables: variables.clone(),
                                                config: self.config.clone(),
                                                cancel: cancel.subscribe() };
                    set.spawn(exec::execute_action(ctx, stage.name.clone(), (*spec).clone()));
                }

                // La ola entera llega a estado terminal antes de decidir;
                // las hermanas de una acción fallida terminan lo suyo.
                let mut wave_failed = false;
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok(Ok(ActionTermination::Succeeded)) => {}
                        Ok(Ok(ActionTermination::Failed(_))) => wave_failed = true,
                        Ok(Err(fault)) => {
                            error!(%fault, "invariant violated, halting run");
                            return Err(RunError::Fault(fault));
                        }
                        Err(join_error) => {
                            let fault = InvariantFault::Internal(format!("action task aborted: {join_error}"));
                            error!(%fault, "invariant violated, halting run");
                            return Err(RunError::Fault(fault));
                        }
                    }
                }

                if wave_failed {
                    Self::cancel_remaining(&self.events, run_id, stage, &waves, wave_index + 1,
                                           &definition.stages[stage_index + 1..]);
                    let status = if cancel.is_cancelled() { RunStatus::Cancelled } else { RunStatus::Failed };
                    return Ok(self.finish(run_id, definition, status));
                }
            }
        }

        Ok(self.finish(run_id, definition, RunStatus::Succeeded))
    }

    /// Marca Cancelled todo lo que no llegó a arrancar: olas restantes del
    /// stage en curso y stages posteriores completos. Sus executors no se
    /// invocan nunca.
    fn cancel_remaining(events: &Arc<dyn RunEventStore>,
                        run_id: Uuid,
                        stage: &Stage,
                        waves: &[Vec<&ActionSpec>],
                        from_wave: usize,
                        later_stages: &[Stage]) {
        for spec in waves.iter().skip(from_wave).flatten() {
            events.append(run_id,
                          RunEventKind::ActionCancelled { stage: stage.name.clone(),
                                                          action: spec.name.clone() });
        }
        for later in later_stages {
            for spec in &later.actions {
                events.append(run_id,
                              RunEventKind::ActionCancelled { stage: later.name.clone(),
                                                              action: spec.name.clone() });
            }
        }
    }

    fn finish(&self, run_id: Uuid, definition: &PipelineDefinition, status: RunStatus) -> RunReport {
        self.events.append(run_id, RunEventKind::RunFinished { status });
        info!(?status, "run finished");
        let snapshot = record::replay(run_id, definition, &self.events.list(run_id));
        RunReport { run_id,
                    status,
                    records: snapshot.records }
    }
}
