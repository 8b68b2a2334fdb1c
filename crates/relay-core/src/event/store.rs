//! Almacenamiento de eventos append-only, por run.

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{RunEvent, RunEventKind};

/// Log de eventos de runs. Las acciones de una misma ola anexan de forma
/// concurrente, por eso el contrato es `&self`.
pub trait RunEventStore: Send + Sync {
    /// Anexa un evento a partir de su kind y devuelve el evento completo
    /// (con seq y ts asignados).
    fn append(&self, run_id: Uuid, kind: RunEventKind) -> RunEvent;
    /// Lista los eventos de un run en orden ascendente de seq.
    fn list(&self, run_id: Uuid) -> Vec<RunEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryRunEventStore {
    inner: DashMap<Uuid, Vec<RunEvent>>,
}

impl InMemoryRunEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunEventStore for InMemoryRunEventStore {
    fn append(&self, run_id: Uuid, kind: RunEventKind) -> RunEvent {
        let mut events = self.inner.entry(run_id).or_default();
        let ev = RunEvent { seq: events.len() as u64,
                            run_id,
                            kind,
                            ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<RunEvent> {
        self.inner.get(&run_id).map(|v| v.clone()).unwrap_or_default()
    }
}
