//! Builder del motor.
//!
//! El provider es obligatorio (se pide al crear el builder); gate, log de
//! eventos y configuración tienen defaults en memoria razonables y se
//! sustituyen cuando el caller quiere compartirlos o persistirlos.

use std::sync::Arc;

use crate::approval::ApprovalGate;
use crate::config::EngineConfig;
use crate::event::{InMemoryRunEventStore, RunEventStore};
use crate::provider::ExecutionProvider;

use super::core::PipelineEngine;

pub struct EngineBuilder {
    provider: Arc<dyn ExecutionProvider>,
    gate: Arc<ApprovalGate>,
    events: Arc<dyn RunEventStore>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub(crate) fn new(provider: Arc<dyn ExecutionProvider>) -> Self {
        Self { provider,
               gate: Arc::new(ApprovalGate::new()),
               events: Arc::new(InMemoryRunEventStore::new()),
               config: EngineConfig::default() }
    }

    pub fn approval_gate(mut self, gate: Arc<ApprovalGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn event_store(mut self, events: Arc<dyn RunEventStore>) -> Self {
        self.events = events;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> PipelineEngine {
        PipelineEngine::from_parts(self.provider, self.gate, self.events, self.config)
    }
}
