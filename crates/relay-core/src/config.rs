//! Configuración del motor desde variables de entorno.
//! Convención `RELAY_*`, con defaults de código si no están definidas.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reintentos automáticos para errores transitorios del provider
    /// (intentos totales = max_retries + 1).
    pub max_retries: u32,
    /// Base lineal del backoff entre reintentos, en milisegundos: la espera
    /// del intento n es `retry_backoff_ms * n`.
    pub retry_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_retries: 2,
               retry_backoff_ms: 250 }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        let max_retries = env::var("RELAY_MAX_RETRIES").ok()
                                                       .and_then(|v| v.parse().ok())
                                                       .unwrap_or(defaults.max_retries);
        let retry_backoff_ms = env::var("RELAY_RETRY_BACKOFF_MS").ok()
                                                                 .and_then(|v| v.parse().ok())
                                                                 .unwrap_or(defaults.retry_backoff_ms);
        Self { max_retries,
               retry_backoff_ms }
    }
}
