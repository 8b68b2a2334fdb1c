//! Taxonomía de errores del motor.
//!
//! Tres familias separadas a propósito:
//! - `DefinitionError`: estático, pre-ejecución; el caller corrige la
//!   definición, nunca se reintenta.
//! - `ActionError`: resultado terminal (o transitorio) de una acción en
//!   ejecución; termina en el `RunReport`, no en un `Err` del run.
//! - `InvariantFault`: violación de invariante interno. Indica un defecto,
//!   detiene el run inmediatamente y se registra aparte.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errores estáticos de la definición del pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionError {
    #[error("pipeline has no stages")]
    EmptyPipeline,
    #[error("duplicate stage name: {0}")]
    DuplicateStage(String),
    #[error("duplicate action name in stage {stage}: {action}")]
    DuplicateAction { stage: String, action: String },
    #[error("invalid run order {run_order} for action {action} (must be >= 1)")]
    InvalidRunOrder { action: String, run_order: u32 },
    #[error("source action {action} must declare exactly one output artifact and no inputs")]
    SourceShape { action: String },
    #[error("approval action {action} cannot declare artifacts or variables")]
    ApprovalShape { action: String },
    #[error("action {action} consumes artifact {artifact} never produced earlier")]
    UnknownArtifact { action: String, artifact: String },
    #[error("artifact name {0} produced more than once")]
    DuplicateArtifactName(String),
    #[error("variables namespace {0} declared more than once")]
    DuplicateNamespace(String),
    #[error("action {action} references namespace {namespace} not declared earlier")]
    UnknownNamespace { action: String, namespace: String },
    #[error("action {action} references variable {namespace}.{key} not exported by its owner")]
    UnknownVariable { action: String, namespace: String, key: String },
    #[error("malformed token {token} in action {action}")]
    MalformedToken { action: String, token: String },
}

/// Errores de una acción en ejecución.
///
/// Salvo `ProviderUnavailable` (transitorio, reintentable con backoff
/// acotado) todos son terminales para la acción.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionError {
    #[error("source collaborator unreachable: {0}")]
    SourceUnavailable(String),
    #[error("ref not found: {0}")]
    RefNotFound(String),
    #[error("build failed: {0}")]
    BuildFailed(String),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("approval rejected: {0}")]
    ApprovalRejected(String),
    #[error("approval timed out after {0}s")]
    ApprovalTimedOut(u64),
    #[error("unresolved variable {namespace}.{key}")]
    VariableResolution { namespace: String, key: String },
    #[error("cancelled")]
    Cancelled,
}

impl ActionError {
    /// Sólo `ProviderUnavailable` es elegible para reintento automático.
    pub fn is_transient(&self) -> bool {
        matches!(self, ActionError::ProviderUnavailable(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ActionError::Cancelled)
    }
}

/// Violación de un invariante interno (escritura duplicada, estado
/// imposible). La validación debería hacerlos inalcanzables; si ocurren, el
/// run se detiene en el acto.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantFault {
    #[error("duplicate output: artifact {0} written twice")]
    DuplicateArtifact(String),
    #[error("duplicate output: variable {namespace}.{key} written twice")]
    DuplicateVariable { namespace: String, key: String },
    #[error("artifact {0} missing after its producer succeeded")]
    MissingArtifact(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Error devuelto por `PipelineEngine::run`. Los fallos ordinarios de
/// acciones no llegan aquí: terminan como records en el `RunReport`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid definition: {0}")]
    Definition(#[from] DefinitionError),
    #[error("invariant violated: {0}")]
    Fault(#[from] InvariantFault),
}
