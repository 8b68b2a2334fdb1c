//! relay-adapters: colaboradores en memoria detrás de los seams del motor.
//!
//! - `provider`: ExecutionProvider determinista y guionable, con journal de
//!   invocaciones para asserts.
//! - `document`: carga de un documento JSON de pipeline.
//! - `approvals`: canales de entrega de aprobaciones (automático y consola).

pub mod approvals;
pub mod document;
pub mod provider;

pub use approvals::{AutoApprover, ConsoleApprovals};
pub use document::DocumentError;
pub use provider::{InvocationRecord, Script, ScriptedProvider};
