//! Tipos de evento del run y estructura `RunEvent`.
//!
//! Rol en el motor:
//! - Cada run anexa eventos a un `RunEventStore` append-only.
//! - Los `ExecutionRecord` observables se reconstruyen por replay de estos
//!   eventos (ver `record`), sin estructuras mutables aparte.
//! - El enum `RunEventKind` es el contrato observable estable del motor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ActionError;
use crate::record::RunStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Primer evento de todo run: fija la definición y su tamaño.
    RunInitialized { definition_hash: String, stage_count: usize },
    /// Un stage comienza. Todas las olas anteriores terminaron en éxito.
    StageStarted { stage_index: usize, stage: String },
    /// Un intento de ejecución de una acción arranca. No implica éxito.
    ActionStarted { stage: String, action: String, attempt: u32 },
    /// Reintento programado tras un error transitorio del provider.
    RetryScheduled {
        stage: String,
        action: String,
        attempt: u32,
        delay_ms: u64,
    },
    /// Una aprobación manual queda pendiente de decisión externa. El texto
    /// ya lleva los tokens resueltos.
    ApprovalRequested {
        stage: String,
        action: String,
        summary: Option<String>,
        external_link: Option<String>,
    },
    /// Decisión externa entregada para una aprobación pendiente.
    ApprovalResolved {
        stage: String,
        action: String,
        approved: bool,
        justification: Option<String>,
    },
    /// La acción terminó bien; outputs por hash de contenido y variables
    /// exportadas por nombre.
    ActionFinished {
        stage: String,
        action: String,
        outputs: Vec<String>,
        variables: Vec<String>,
    },
    /// La acción terminó con error terminal.
    ActionFailed {
        stage: String,
        action: String,
        error: ActionError,
    },
    /// La acción se canceló (fallo en el stage, o stop externo) sin llegar
    /// a comprometer outputs.
    ActionCancelled { stage: String, action: String },
    /// Cierre del run con su estado terminal.
    RunFinished { status: RunStatus },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Orden de append dentro del run (asignado por el store).
    pub seq: u64,
    pub run_id: Uuid,
    pub kind: RunEventKind,
    /// Metadato de observabilidad; no participa en ningún hash.
    pub ts: DateTime<Utc>,
}
