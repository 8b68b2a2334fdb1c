//! Ejecución de una acción de punta a punta.
//!
//! El executor resuelve los tokens de la configuración, junta los artifacts
//! de entrada, invoca al provider (con reintento acotado para errores
//! transitorios) o espera la decisión de una aprobación manual, y sólo al
//! éxito compromete outputs y variables en los stores. Una acción cancelada
//! no compromete nada.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::approval::{ApprovalGate, Decision, PendingApproval};
use crate::config::EngineConfig;
use crate::errors::{ActionError, InvariantFault};
use crate::event::{RunEventKind, RunEventStore};
use crate::model::{variable, ActionKind, ActionSpec};
use crate::provider::{ExecutionProvider, InvokeOutcome, InvokeRequest};
use crate::store::{ArtifactStore, VariableRegistry};

/// Todo lo que una acción necesita del run en curso. Se clona por acción;
/// los stores van detrás de `Arc`.
#[derive(Clone)]
pub(crate) struct ExecutorContext {
    pub run_id: Uuid,
    pub provider: Arc<dyn ExecutionProvider>,
    pub gate: Arc<ApprovalGate>,
    pub events: Arc<dyn RunEventStore>,
    pub artifacts: Arc<ArtifactStore>,
    pub variables: Arc<VariableRegistry>,
    pub config: EngineConfig,
    pub cancel: watch::Receiver<bool>,
}

/// Cierre de una acción: o terminó bien o terminó con su error terminal
/// (la cancelación viaja como `ActionError::Cancelled`).
pub(crate) enum ActionTermination {
    Succeeded,
    Failed(ActionError),
}

pub(crate) async fn execute_action(mut ctx: ExecutorContext,
                                   stage: String,
                                   spec: ActionSpec)
                                   -> Result<ActionTermination, InvariantFault> {
    match spec.kind {
        ActionKind::ManualApproval => run_approval(&mut ctx, &stage, &spec).await,
        _ => run_provider_action(&mut ctx, &stage, &spec).await,
    }
}

/// Espera asíncrona de la señal de stop del pipeline. Si el emisor cae sin
/// señal, la cancelación ya no puede llegar y la espera se vuelve eterna
/// (el resto del select decide).
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if *rx.borrow() {
        return;
    }
    while rx.changed().await.is_ok() {
        if *rx.borrow() {
            return;
        }
    }
    std::future::pending::<()>().await
}

async fn run_approval(ctx: &mut ExecutorContext,
                      stage: &str,
                      spec: &ActionSpec)
                      -> Result<ActionTermination, InvariantFault> {
    ctx.events.append(ctx.run_id,
                      RunEventKind::ActionStarted { stage: stage.to_string(),
                                                    action: spec.name.clone(),
                                                    attempt: 1 });

    // Los textos del gate también resuelven tokens en este momento.
    let summary = match resolve_opt(spec.summary.as_deref(), &ctx.variables) {
        Ok(text) => text,
        Err(error) => return Ok(fail(ctx, stage, spec, error)),
    };
    let external_link = match resolve_opt(spec.external_link.as_deref(), &ctx.variables) {
        Ok(text) => text,
        Err(error) => return Ok(fail(ctx, stage, spec, error)),
    };

    let rx = ctx.gate.register(PendingApproval { run_id: ctx.run_id,
                                                 stage: stage.to_string(),
                                                 action: spec.name.clone(),
                                                 summary: summary.clone(),
                                                 external_link: external_link.clone(),
                                                 requested_at: Utc::now() });
    ctx.events.append(ctx.run_id,
                      RunEventKind::ApprovalRequested { stage: stage.to_string(),
                                                        action: spec.name.clone(),
                                                        summary,
                                                        external_link });
    debug!(stage, action = %spec.name, "approval pending");

    enum Wait {
        Decision(Option<Decision>),
        Expired(u64),
        Stopped,
    }

    let waited = if let Some(secs) = spec.deadline_secs {
        tokio::select! {
            decision = rx => Wait::Decision(decision.ok()),
            _ = sleep(Duration::from_secs(secs)) => Wait::Expired(secs),
            _ = cancelled(&mut ctx.cancel) => Wait::Stopped,
        }
    } else {
        tokio::select! {
            decision = rx => Wait::Decision(decision.ok()),
            _ = cancelled(&mut ctx.cancel) => Wait::Stopped,
        }
    };

    match waited {
        Wait::Decision(Some(decision)) => {
            let approved = decision.approved();
            let justification = decision.justification().map(str::to_string);
            ctx.events.append(ctx.run_id,
                              RunEventKind::ApprovalResolved { stage: stage.to_string(),
                                                               action: spec.name.clone(),
                                                               approved,
                                                               justification: justification.clone() });
            if approved {
                ctx.events.append(ctx.run_id,
                                  RunEventKind::ActionFinished { stage: stage.to_string(),
                                                                 action: spec.name.clone(),
                                                                 outputs: Vec::new(),
                                                                 variables: Vec::new() });
                Ok(ActionTermination::Succeeded)
            } else {
                let reason = justification.unwrap_or_else(|| "rejected by approver".to_string());
                Ok(fail(ctx, stage, spec, ActionError::ApprovalRejected(reason)))
            }
        }
        // El gate soltó el sender sin decisión: el run se está desmontando.
        Wait::Decision(None) | Wait::Stopped => {
            ctx.gate.discard(ctx.run_id, stage, &spec.name);
            Ok(cancel(ctx, stage, spec))
        }
        Wait::Expired(secs) => {
            ctx.gate.discard(ctx.run_id, stage, &spec.name);
            Ok(fail(ctx, stage, spec, ActionError::ApprovalTimedOut(secs)))
        }
    }
}

async fn run_provider_action(ctx: &mut ExecutorContext,
                             stage: &str,
                             spec: &ActionSpec)
                             -> Result<ActionTermination, InvariantFault> {
    let mut attempt: u32 = 1;
    loop {
        ctx.events.append(ctx.run_id,
                          RunEventKind::ActionStarted { stage: stage.to_string(),
                                                        action: spec.name.clone(),
                                                        attempt });

        // Tokens resueltos justo antes de invocar; una referencia sin valor
        // es terminal y el provider no llega a invocarse.
        let config = match variable::substitute_value(&spec.config, &ctx.variables) {
            Ok(resolved) => resolved,
            Err(error) => return Ok(fail(ctx, stage, spec, error)),
        };

        let mut inputs = Vec::with_capacity(spec.inputs.len());
        for name in &spec.inputs {
            match ctx.artifacts.get(name) {
                Some(artifact) => inputs.push(artifact),
                // La validación más el gating garantizan al productor; un
                // hueco aquí es un defecto, no un fallo de la acción.
                None => return Err(InvariantFault::MissingArtifact(name.clone())),
            }
        }

        debug!(stage, action = %spec.name, attempt, "invoking provider");
        let provider = ctx.provider.clone();
        let req = InvokeRequest { kind: spec.kind,
                                  stage,
                                  action: &spec.name,
                                  config: &config,
                                  inputs: &inputs,
                                  outputs: &spec.outputs,
                                  output_variables: &spec.output_variables };
        let result = tokio::select! {
            outcome = provider.invoke(req) => outcome,
            _ = cancelled(&mut ctx.cancel) => Err(ActionError::Cancelled),
        };

        match result {
            Ok(outcome) => return commit(ctx, stage, spec, outcome),
            Err(error) if error.is_transient() && attempt <= ctx.config.max_retries => {
                let delay_ms = ctx.config.retry_backoff_ms * u64::from(attempt);
                ctx.events.append(ctx.run_id,
                                  RunEventKind::RetryScheduled { stage: stage.to_string(),
                                                                 action: spec.name.clone(),
                                                                 attempt,
                                                                 delay_ms });
                debug!(stage, action = %spec.name, attempt, delay_ms, "provider unavailable, retrying");
                tokio::select! {
                    _ = sleep(Duration::from_millis(delay_ms)) => {}
                    _ = cancelled(&mut ctx.cancel) => return Ok(cancel(ctx, stage, spec)),
                }
                attempt += 1;
            }
            Err(error) => return Ok(fail(ctx, stage, spec, error)),
        }
    }
}

/// Commit de un outcome exitoso. Primero el contrato del colaborador,
/// después las escrituras (únicas por clave) en los stores.
fn commit(ctx: &ExecutorContext,
          stage: &str,
          spec: &ActionSpec,
          outcome: InvokeOutcome)
          -> Result<ActionTermination, InvariantFault> {
    for produced in &outcome.artifacts {
        if !spec.outputs.contains(&produced.name) {
            let detail = format!("provider produced undeclared artifact {}", produced.name);
            return Ok(fail(ctx, stage, spec, ActionError::BuildFailed(detail)));
        }
    }
    for declared in &spec.outputs {
        if !outcome.artifacts.iter().any(|p| &p.name == declared) {
            let detail = format!("declared artifact {declared} was not produced");
            return Ok(fail(ctx, stage, spec, ActionError::BuildFailed(detail)));
        }
    }
    // Una variable declarada pero ausente no falla aquí: el consumidor la
    // verá como referencia sin resolver.
    for (key, _) in &outcome.variables {
        let declared = spec.namespace.is_some() && spec.output_variables.contains(key);
        if !declared {
            let detail = format!("provider exported undeclared variable {key}");
            return Ok(fail(ctx, stage, spec, ActionError::BuildFailed(detail)));
        }
    }

    let mut hashes = Vec::with_capacity(outcome.artifacts.len());
    for produced in outcome.artifacts {
        hashes.push(ctx.artifacts.put(&produced.name, produced.bytes, &spec.name)?);
    }
    let mut exported = Vec::with_capacity(outcome.variables.len());
    if let Some(ns) = &spec.namespace {
        for (key, value) in &outcome.variables {
            ctx.variables.put(ns, key, value)?;
            exported.push(key.clone());
        }
    }

    ctx.events.append(ctx.run_id,
                      RunEventKind::ActionFinished { stage: stage.to_string(),
                                                     action: spec.name.clone(),
                                                     outputs: hashes,
                                                     variables: exported });
    debug!(stage, action = %spec.name, "action finished");
    Ok(ActionTermination::Succeeded)
}

fn fail(ctx: &ExecutorContext, stage: &str, spec: &ActionSpec, error: ActionError) -> ActionTermination {
    if error.is_cancellation() {
        return cancel(ctx, stage, spec);
    }
    warn!(stage, action = %spec.name, %error, "action failed");
    ctx.events.append(ctx.run_id,
                      RunEventKind::ActionFailed { stage: stage.to_string(),
                                                   action: spec.name.clone(),
                                                   error: error.clone() });
    ActionTermination::Failed(error)
}

fn cancel(ctx: &ExecutorContext, stage: &str, spec: &ActionSpec) -> ActionTermination {
    ctx.events.append(ctx.run_id,
                      RunEventKind::ActionCancelled { stage: stage.to_string(),
                                                      action: spec.name.clone() });
    ActionTermination::Failed(ActionError::Cancelled)
}

fn resolve_opt(text: Option<&str>, vars: &VariableRegistry) -> Result<Option<String>, ActionError> {
    text.map(|t| variable::substitute(t, vars)).transpose()
}
