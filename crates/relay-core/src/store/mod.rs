//! Stores compartidos de un run: artifacts y variables exportadas.
//!
//! Ambos son append-only con escritura única por clave; un lector ve o nada
//! o el valor completo ya comprometido. Se crean vacíos en cada run (sin
//! fuga de estado entre runs).

pub mod artifacts;
pub mod variables;

pub use artifacts::ArtifactStore;
pub use variables::VariableRegistry;
