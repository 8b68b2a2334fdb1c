//! Seam hacia los colaboradores que ejecutan el trabajo real.
//!
//! El motor no sabe clonar repos, compilar ni desplegar: delega cada acción
//! Source/Build/Deploy en un `ExecutionProvider` con la configuración ya
//! resuelta (sin tokens) y los artifacts de entrada. Las aprobaciones
//! manuales no pasan por aquí; las atiende el `ApprovalGate`.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ActionError;
use crate::model::{ActionKind, Artifact};

/// Artifact producido por una invocación. El executor calcula el hash al
/// comprometerlo en el store.
#[derive(Debug, Clone)]
pub struct ProducedArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Resultado de una invocación exitosa.
#[derive(Debug, Clone, Default)]
pub struct InvokeOutcome {
    pub artifacts: Vec<ProducedArtifact>,
    /// Variables exportadas (clave, valor) bajo el namespace de la acción.
    pub variables: Vec<(String, String)>,
}

/// Petición que recibe el provider. Incluye los nombres declarados de
/// outputs y variables para que el colaborador pueda cumplir el contrato.
#[derive(Debug)]
pub struct InvokeRequest<'a> {
    pub kind: ActionKind,
    pub stage: &'a str,
    pub action: &'a str,
    /// Configuración opaca, con los tokens ya sustituidos.
    pub config: &'a Value,
    pub inputs: &'a [Artifact],
    pub outputs: &'a [String],
    pub output_variables: &'a [String],
}

#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    async fn invoke(&self, req: InvokeRequest<'_>) -> Result<InvokeOutcome, ActionError>;
}
