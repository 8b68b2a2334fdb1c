//! Definición inmutable del pipeline: stages ordenados, acciones por ola.
//!
//! La definición se construye una vez y no cambia después; el motor la
//! valida completa antes de ejecutar nada. La configuración del provider es
//! JSON opaco para el motor y puede contener tokens `#{NS.KEY}` de
//! resolución diferida.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::hashing::hash_value;

/// Clase de acción soportada por el motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Source,
    Build,
    ManualApproval,
    Deploy,
}

/// Especificación declarativa de una acción dentro de un stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub kind: ActionKind,
    /// Ola dentro del stage (>= 1). Acciones con el mismo valor corren
    /// concurrentes; olas posteriores esperan el éxito de las anteriores.
    pub run_order: u32,
    /// Artifacts consumidos; deben producirse estrictamente antes.
    pub inputs: Vec<String>,
    /// Artifacts producidos (nombres únicos en todo el pipeline).
    pub outputs: Vec<String>,
    /// Namespace de export de variables (único en el pipeline).
    pub namespace: Option<String>,
    /// Variables que la acción declara exportar al completar con éxito.
    pub output_variables: Vec<String>,
    /// Configuración opaca para el provider; admite tokens `#{NS.KEY}`.
    pub config: Value,
    /// Sólo ManualApproval: texto mostrado al aprobador (admite tokens).
    pub summary: Option<String>,
    /// Sólo ManualApproval: enlace de contexto externo (admite tokens).
    pub external_link: Option<String>,
    /// Sólo ManualApproval: plazo en segundos antes de fallar por timeout.
    /// Sin plazo la acción espera indefinidamente.
    pub deadline_secs: Option<u64>,
}

impl ActionSpec {
    pub fn new(name: &str, kind: ActionKind) -> Self {
        Self { name: name.to_string(),
               kind,
               run_order: 1,
               inputs: Vec::new(),
               outputs: Vec::new(),
               namespace: None,
               output_variables: Vec::new(),
               config: Value::Null,
               summary: None,
               external_link: None,
               deadline_secs: None }
    }

    /// Acción fuente: sin inputs, exactamente un artifact de salida.
    pub fn source(name: &str, output: &str) -> Self {
        Self::new(name, ActionKind::Source).output(output)
    }

    pub fn build(name: &str) -> Self {
        Self::new(name, ActionKind::Build)
    }

    pub fn approval(name: &str) -> Self {
        Self::new(name, ActionKind::ManualApproval)
    }

    pub fn deploy(name: &str) -> Self {
        Self::new(name, ActionKind::Deploy)
    }

    pub fn run_order(mut self, order: u32) -> Self {
        self.run_order = order;
        self
    }

    pub fn input(mut self, artifact: &str) -> Self {
        self.inputs.push(artifact.to_string());
        self
    }

    pub fn output(mut self, artifact: &str) -> Self {
        self.outputs.push(artifact.to_string());
        self
    }

    pub fn namespace(mut self, ns: &str) -> Self {
        self.namespace = Some(ns.to_string());
        self
    }

    pub fn export(mut self, key: &str) -> Self {
        self.output_variables.push(key.to_string());
        self
    }

    pub fn config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn summary(mut self, text: &str) -> Self {
        self.summary = Some(text.to_string());
        self
    }

    pub fn external_link(mut self, link: &str) -> Self {
        self.external_link = Some(link.to_string());
        self
    }

    pub fn deadline_secs(mut self, secs: u64) -> Self {
        self.deadline_secs = Some(secs);
        self
    }
}

/// Grupo de acciones con gating todo-o-nada entre stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<ActionSpec>,
}

impl Stage {
    pub fn new(name: &str, actions: Vec<ActionSpec>) -> Self {
        Self { name: name.to_string(),
               actions }
    }
}

/// Secuencia ordenada de stages. Inmutable una vez entregada al motor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub stages: Vec<Stage>,
    /// Hash canónico de la estructura; identifica la definición en el
    /// evento inicial de cada run.
    pub definition_hash: String,
}

impl PipelineDefinition {
    pub fn new(name: &str, stages: Vec<Stage>) -> Self {
        let definition_hash = hash_value(&json!({
            "name": name,
            "stages": serde_json::to_value(&stages).unwrap_or(Value::Null),
        }));
        Self { name: name.to_string(),
               stages,
               definition_hash }
    }

    /// Número total de acciones del pipeline.
    pub fn action_count(&self) -> usize {
        self.stages.iter().map(|s| s.actions.len()).sum()
    }
}
