//! Provider determinista en memoria, guionado por acción.
//!
//! No toca IO externo: cada acción se guiona con un comportamiento fijo y
//! las invocaciones quedan en un journal consultable. Una acción sin guion
//! sintetiza sus outputs declarados, lo que permite simular un pipeline
//! entero sin preparar nada.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::sleep;
use tracing::debug;

use relay_core::{ActionError, ActionKind, ExecutionProvider, InvokeOutcome, InvokeRequest, ProducedArtifact};

/// Comportamiento guionado de una acción.
#[derive(Debug, Clone)]
pub enum Script {
    /// Éxito con artifacts (nombre, bytes) y variables (clave, valor).
    Succeed {
        artifacts: Vec<(String, Vec<u8>)>,
        variables: Vec<(String, String)>,
    },
    /// Fallo con el error indicado.
    Fail(ActionError),
    /// `ProviderUnavailable` las primeras `times` invocaciones; después
    /// aplica `then`.
    FlakyThen { times: u32, then: Box<Script> },
    /// Espera `ms` antes de aplicar `then` (útil para cancelaciones y
    /// solapamiento de olas).
    DelayMs { ms: u64, then: Box<Script> },
}

impl Script {
    pub fn succeed() -> Self {
        Script::Succeed { artifacts: Vec::new(),
                          variables: Vec::new() }
    }

    /// Añade un artifact al guion de éxito (ignorado en otros guiones).
    pub fn artifact(mut self, name: &str, bytes: &[u8]) -> Self {
        if let Script::Succeed { artifacts, .. } = &mut self {
            artifacts.push((name.to_string(), bytes.to_vec()));
        }
        self
    }

    /// Añade una variable exportada al guion de éxito.
    pub fn variable(mut self, key: &str, value: &str) -> Self {
        if let Script::Succeed { variables, .. } = &mut self {
            variables.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn flaky(times: u32, then: Script) -> Self {
        Script::FlakyThen { times,
                            then: Box::new(then) }
    }

    pub fn delayed(ms: u64, then: Script) -> Self {
        Script::DelayMs { ms,
                         then: Box::new(then) }
    }
}

/// Invocación observada por el provider, en orden de llegada.
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub stage: String,
    pub action: String,
    pub kind: ActionKind,
    /// Configuración tal como llegó (tokens ya resueltos por el motor).
    pub config: serde_json::Value,
    /// Nombres de los artifacts de entrada recibidos.
    pub inputs: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: DashMap<String, Script>,
    invocations: Mutex<Vec<InvocationRecord>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guiona una acción. Encadenable al construir el provider.
    pub fn script(self, action: &str, script: Script) -> Self {
        self.scripts.insert(action.to_string(), script);
        self
    }

    /// Journal completo, en orden de llegada.
    pub fn journal(&self) -> Vec<InvocationRecord> {
        self.invocations.lock().map(|j| j.clone()).unwrap_or_default()
    }

    pub fn invoked(&self, action: &str) -> bool {
        self.invocation_count(action) > 0
    }

    pub fn invocation_count(&self, action: &str) -> usize {
        self.journal().iter().filter(|r| r.action == action).count()
    }

    /// Outputs sintéticos para acciones sin guion: un blob estable por
    /// artifact declarado y un valor fijo por variable declarada.
    fn synthesize(req: &InvokeRequest<'_>) -> InvokeOutcome {
        let artifacts = req.outputs
                           .iter()
                           .map(|name| ProducedArtifact { name: name.clone(),
                                                          bytes: format!("{}::{}", req.action, name).into_bytes() })
                           .collect();
        let variables = req.output_variables
                           .iter()
                           .map(|key| (key.clone(), format!("sim-{key}")))
                           .collect();
        InvokeOutcome { artifacts,
                        variables }
    }
}

#[async_trait]
impl ExecutionProvider for ScriptedProvider {
    async fn invoke(&self, req: InvokeRequest<'_>) -> Result<InvokeOutcome, ActionError> {
        let seen_so_far = {
            let mut journal = match self.invocations.lock() {
                Ok(j) => j,
                Err(poisoned) => poisoned.into_inner(),
            };
            journal.push(InvocationRecord { stage: req.stage.to_string(),
                                            action: req.action.to_string(),
                                            kind: req.kind,
                                            config: req.config.clone(),
                                            inputs: req.inputs.iter().map(|a| a.name.clone()).collect() });
            journal.iter().filter(|r| r.action == req.action).count()
        };
        debug!(action = req.action, attempt = seen_so_far, "scripted invoke");

        let mut script = match self.scripts.get(req.action) {
            Some(s) => s.clone(),
            None => return Ok(Self::synthesize(&req)),
        };
        loop {
            match script {
                Script::DelayMs { ms, then } => {
                    sleep(Duration::from_millis(ms)).await;
                    script = *then;
                }
                Script::FlakyThen { times, then } => {
                    if seen_so_far <= times as usize {
                        return Err(ActionError::ProviderUnavailable(format!("scripted outage, attempt {seen_so_far}")));
                    }
                    script = *then;
                }
                Script::Succeed { artifacts, variables } => {
                    let artifacts = artifacts.into_iter()
                                             .map(|(name, bytes)| ProducedArtifact { name, bytes })
                                             .collect();
                    return Ok(InvokeOutcome { artifacts,
                                              variables });
                }
                Script::Fail(error) => return Err(error),
            }
        }
    }
}
