//! Gate de aprobaciones manuales: handles esperables por acción.
//!
//! Una acción ManualApproval queda suspendida sin ocupar worker: el
//! executor registra un handle y hace await del receiver; un canal externo
//! (consola, webhook, CLI) la resuelve por id con aprobación o rechazo.
//! Escala a muchas aprobaciones pendientes a la vez porque la espera es un
//! `oneshot`, no un thread bloqueado.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Decisión externa sobre una aprobación pendiente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved { justification: Option<String> },
    Rejected { justification: Option<String> },
}

impl Decision {
    pub fn approved(&self) -> bool {
        matches!(self, Decision::Approved { .. })
    }

    pub fn justification(&self) -> Option<&str> {
        match self {
            Decision::Approved { justification } | Decision::Rejected { justification } => justification.as_deref(),
        }
    }
}

/// Aprobación abierta, visible para los canales de entrega. El texto lleva
/// los tokens ya resueltos.
#[derive(Debug, Clone)]
pub struct PendingApproval {
    pub run_id: Uuid,
    pub stage: String,
    pub action: String,
    pub summary: Option<String>,
    pub external_link: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ApprovalGate {
    waiting: DashMap<(Uuid, String, String), (PendingApproval, oneshot::Sender<Decision>)>,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un handle esperable para la acción. El executor hace await
    /// del receiver devuelto.
    pub(crate) fn register(&self, pending: PendingApproval) -> oneshot::Receiver<Decision> {
        let (tx, rx) = oneshot::channel();
        let key = (pending.run_id, pending.stage.clone(), pending.action.clone());
        self.waiting.insert(key, (pending, tx));
        rx
    }

    /// Entrega la decisión externa. Devuelve `false` si no había nada
    /// pendiente con ese id (ya resuelta, expirada o cancelada).
    pub fn resolve(&self, run_id: Uuid, stage: &str, action: &str, decision: Decision) -> bool {
        match self.waiting.remove(&(run_id, stage.to_string(), action.to_string())) {
            Some((_, (_, tx))) => tx.send(decision).is_ok(),
            None => false,
        }
    }

    /// Lista las aprobaciones abiertas (para canales de entrega).
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.waiting.iter().map(|entry| entry.value().0.clone()).collect()
    }

    /// Retira un handle sin resolverlo (timeout o cancelación del run).
    pub(crate) fn discard(&self, run_id: Uuid, stage: &str, action: &str) {
        self.waiting.remove(&(run_id, stage.to_string(), action.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(run_id: Uuid) -> PendingApproval {
        PendingApproval { run_id,
                          stage: "Release".into(),
                          action: "review".into(),
                          summary: Some("2 errores".into()),
                          external_link: None,
                          requested_at: Utc::now() }
    }

    #[tokio::test]
    async fn resolve_delivers_the_decision() {
        let gate = ApprovalGate::new();
        let run_id = Uuid::new_v4();
        let rx = gate.register(pending(run_id));
        assert_eq!(gate.pending().len(), 1);

        let delivered = gate.resolve(run_id, "Release", "review",
                                     Decision::Approved { justification: Some("ok".into()) });
        assert!(delivered);
        let decision = rx.await.unwrap();
        assert!(decision.approved());
        assert_eq!(decision.justification(), Some("ok"));
        assert!(gate.pending().is_empty());
    }

    #[tokio::test]
    async fn resolving_unknown_id_is_a_noop() {
        let gate = ApprovalGate::new();
        assert!(!gate.resolve(Uuid::new_v4(), "Release", "review",
                              Decision::Rejected { justification: None }));
    }

    #[tokio::test]
    async fn discard_drops_the_handle() {
        let gate = ApprovalGate::new();
        let run_id = Uuid::new_v4();
        let rx = gate.register(pending(run_id));
        gate.discard(run_id, "Release", "review");
        assert!(gate.pending().is_empty());
        // el sender cayó: el receiver observa el cierre
        assert!(rx.await.is_err());
    }
}
