//! Canales de entrega de aprobaciones.
//!
//! El gate del motor sólo expone `pending()` y `resolve()`; estos canales
//! ponen la decisión externa encima: uno automático para simulación y
//! tests, y uno de consola para el runner interactivo.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

use relay_core::{ApprovalGate, Decision};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Resuelve automáticamente toda aprobación pendiente, siempre en el mismo
/// sentido. El task de fondo sondea el gate hasta que se aborta su handle.
pub struct AutoApprover {
    gate: Arc<ApprovalGate>,
    approve: bool,
    justification: Option<String>,
    delay: Duration,
}

impl AutoApprover {
    pub fn approve_all(gate: Arc<ApprovalGate>) -> Self {
        Self { gate,
               approve: true,
               justification: None,
               delay: Duration::ZERO }
    }

    pub fn reject_all(gate: Arc<ApprovalGate>) -> Self {
        Self { gate,
               approve: false,
               justification: None,
               delay: Duration::ZERO }
    }

    pub fn justification(mut self, text: &str) -> Self {
        self.justification = Some(text.to_string());
        self
    }

    /// Demora artificial antes de cada decisión (simula a la persona).
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                for pending in self.gate.pending() {
                    if !self.delay.is_zero() {
                        sleep(self.delay).await;
                    }
                    let decision = if self.approve {
                        Decision::Approved { justification: self.justification.clone() }
                    } else {
                        Decision::Rejected { justification: self.justification.clone() }
                    };
                    info!(stage = %pending.stage, action = %pending.action, approved = self.approve,
                          "auto-resolving approval");
                    self.gate.resolve(pending.run_id, &pending.stage, &pending.action, decision);
                }
                sleep(POLL_INTERVAL).await;
            }
        })
    }
}

/// Canal de consola: muestra el contexto de cada aprobación pendiente y
/// pregunta por stdin.
pub struct ConsoleApprovals {
    gate: Arc<ApprovalGate>,
}

impl ConsoleApprovals {
    pub fn new(gate: Arc<ApprovalGate>) -> Self {
        Self { gate }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                for pending in self.gate.pending() {
                    println!();
                    println!("approval pending: {}/{}", pending.stage, pending.action);
                    if let Some(summary) = &pending.summary {
                        println!("  {summary}");
                    }
                    if let Some(link) = &pending.external_link {
                        println!("  see: {link}");
                    }
                    println!("  approve? [y/N]");
                    // la lectura bloqueante vive en un worker aparte; el
                    // resto del runtime sigue corriendo
                    let line = tokio::task::spawn_blocking(|| {
                                   let mut buf = String::new();
                                   let _ = std::io::stdin().read_line(&mut buf);
                                   buf
                               }).await
                                 .unwrap_or_default();
                    let approved = matches!(line.trim(), "y" | "Y" | "yes");
                    let decision = if approved {
                        Decision::Approved { justification: None }
                    } else {
                        Decision::Rejected { justification: Some("rejected at console".to_string()) }
                    };
                    self.gate.resolve(pending.run_id, &pending.stage, &pending.action, decision);
                }
                sleep(Duration::from_millis(200)).await;
            }
        })
    }
}
