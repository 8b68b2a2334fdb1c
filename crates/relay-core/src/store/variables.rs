//! Registro de variables exportadas: (namespace, clave) -> valor.
//!
//! Escrito por la acción dueña al completar con éxito; visible para
//! acciones posteriores vía tokens `#{NS.KEY}`. Escritura única por clave.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::errors::InvariantFault;

#[derive(Debug, Default)]
pub struct VariableRegistry {
    inner: DashMap<(String, String), String>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, namespace: &str, key: &str, value: &str) -> Result<(), InvariantFault> {
        match self.inner.entry((namespace.to_string(), key.to_string())) {
            Entry::Occupied(_) => Err(InvariantFault::DuplicateVariable { namespace: namespace.to_string(),
                                                                          key: key.to_string() }),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(())
            }
        }
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.inner
            .get(&(namespace.to_string(), key.to_string()))
            .map(|v| v.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_once_per_key() {
        let vars = VariableRegistry::new();
        vars.put("TFSEC", "BuildID", "b-1").unwrap();
        let err = vars.put("TFSEC", "BuildID", "b-2").unwrap_err();
        assert!(matches!(err, InvariantFault::DuplicateVariable { .. }));
        // el primer valor comprometido es el que queda
        assert_eq!(vars.get("TFSEC", "BuildID").as_deref(), Some("b-1"));
    }

    #[test]
    fn same_key_different_namespace_is_fine() {
        let vars = VariableRegistry::new();
        vars.put("TFSEC", "Region", "eu-west-1").unwrap();
        vars.put("TERRAFORM", "Region", "eu-west-1").unwrap();
        assert_eq!(vars.len(), 2);
    }
}
