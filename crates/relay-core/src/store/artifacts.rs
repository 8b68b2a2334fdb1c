//! Store de artifacts direccionado por contenido.
//!
//! Los blobs viven indexados por su hash blake3 (dos outputs con el mismo
//! contenido comparten blob); un índice aparte mapea nombre -> (hash,
//! productor). La escritura es única por nombre: repetir un nombre es
//! `InvariantFault::DuplicateArtifact`, no un error recuperable.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::errors::InvariantFault;
use crate::hashing::hash_bytes;
use crate::model::{Artifact, ArtifactMeta};

#[derive(Debug, Default)]
pub struct ArtifactStore {
    blobs: DashMap<String, Vec<u8>>,
    by_name: DashMap<String, ArtifactMeta>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compromete un blob producido y devuelve su hash de contenido.
    pub fn put(&self, name: &str, bytes: Vec<u8>, produced_by: &str) -> Result<String, InvariantFault> {
        let hash = hash_bytes(&bytes);
        match self.by_name.entry(name.to_string()) {
            Entry::Occupied(_) => Err(InvariantFault::DuplicateArtifact(name.to_string())),
            Entry::Vacant(slot) => {
                self.blobs.entry(hash.clone()).or_insert(bytes);
                slot.insert(ArtifactMeta { hash: hash.clone(),
                                           produced_by: produced_by.to_string() });
                Ok(hash)
            }
        }
    }

    /// Recupera un artifact completo por nombre.
    pub fn get(&self, name: &str) -> Option<Artifact> {
        let meta = self.by_name.get(name)?;
        let bytes = self.blobs.get(&meta.hash)?.clone();
        Some(Artifact { name: name.to_string(),
                        hash: meta.hash.clone(),
                        bytes,
                        produced_by: meta.produced_by.clone() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Cantidad de nombres comprometidos (no de blobs: puede haber menos
    /// blobs por deduplicación).
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
