//! Tokens de resolución diferida `#{NAMESPACE.KEY}`.
//!
//! Dos fases separadas a propósito:
//! - extracción en validación: a qué (namespace, clave) apunta cada token,
//!   sin valores todavía;
//! - sustitución en ejecución: justo antes de invocar al provider, contra
//!   el registro de variables del run.
//!
//! No hay interpolación dinámica en ningún otro punto.

use serde_json::Value;

use crate::errors::ActionError;
use crate::store::VariableRegistry;

/// Referencia (namespace, clave) extraída de un token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub namespace: String,
    pub key: String,
}

/// Extrae todas las referencias `#{NS.KEY}` de un texto. Devuelve el
/// fragmento ofensivo si un token abre sin cerrar, no tiene punto o deja
/// vacío alguno de los dos lados.
pub fn extract_refs(text: &str) -> Result<Vec<VariableRef>, String> {
    let mut refs = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("#{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(rest[start..].to_string());
        };
        let body = &after[..end];
        match body.split_once('.') {
            Some((ns, key)) if !ns.is_empty() && !key.is_empty() => {
                refs.push(VariableRef { namespace: ns.to_string(),
                                        key: key.to_string() });
            }
            _ => return Err(format!("#{{{body}}}")),
        }
        rest = &after[end + 1..];
    }
    Ok(refs)
}

/// Recorre un `Value` acumulando las referencias de cada cadena.
pub fn extract_refs_value(value: &Value) -> Result<Vec<VariableRef>, String> {
    let mut refs = Vec::new();
    collect_refs(value, &mut refs)?;
    Ok(refs)
}

fn collect_refs(value: &Value, refs: &mut Vec<VariableRef>) -> Result<(), String> {
    match value {
        Value::String(s) => refs.extend(extract_refs(s)?),
        Value::Array(items) => {
            for item in items {
                collect_refs(item, refs)?;
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_refs(item, refs)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Sustituye cada token por su valor registrado. La primera referencia sin
/// valor corta con `ActionError::VariableResolution`; el provider consumidor
/// nunca llega a invocarse.
pub fn substitute(text: &str, vars: &VariableRegistry) -> Result<String, ActionError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("#{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else { break };
        let body = &after[..end];
        match body.split_once('.') {
            Some((ns, key)) if !ns.is_empty() && !key.is_empty() => {
                let value = vars.get(ns, key)
                                .ok_or_else(|| ActionError::VariableResolution { namespace: ns.to_string(),
                                                                                 key: key.to_string() })?;
                out.push_str(&rest[..start]);
                out.push_str(&value);
            }
            // Token malformado: la validación lo impide antes de llegar aquí;
            // se copia tal cual.
            _ => out.push_str(&rest[..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Sustitución sobre un `Value` completo (cada cadena, a cualquier nivel).
pub fn substitute_value(value: &Value, vars: &VariableRegistry) -> Result<Value, ActionError> {
    Ok(match value {
        Value::String(s) => Value::String(substitute(s, vars)?),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(substitute_value(item, vars)?);
            }
            Value::Array(out)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), substitute_value(v, vars)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}
