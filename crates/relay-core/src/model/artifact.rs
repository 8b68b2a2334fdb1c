//! Artifact inmutable intercambiado entre acciones.
//!
//! Un `Artifact` es un blob de bytes con nombre producido exactamente una
//! vez por su acción dueña. El `hash` blake3 del contenido es su identidad
//! en el store; el motor lo calcula al comprometer el blob, nunca el
//! provider.

use serde::{Deserialize, Serialize};

use crate::hashing::hash_bytes;

/// Blob con nombre producido por una acción.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    /// Hash blake3 hex del contenido.
    pub hash: String,
    pub bytes: Vec<u8>,
    /// Acción que lo produjo.
    pub produced_by: String,
}

impl Artifact {
    pub fn new(name: &str, bytes: Vec<u8>, produced_by: &str) -> Self {
        let hash = hash_bytes(&bytes);
        Self { name: name.to_string(),
               hash,
               bytes,
               produced_by: produced_by.to_string() }
    }
}

/// Entrada del índice nombre -> contenido del store (el blob vive aparte,
/// deduplicado por hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub hash: String,
    pub produced_by: String,
}
