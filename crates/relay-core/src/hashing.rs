//! Hashing blake3 + JSON canónico.
//!
//! El hash de contenido es la identidad de un blob en el store (permite
//! deduplicar artifacts idénticos); el hash de definición fija la identidad
//! del pipeline en el evento inicial del run.

use serde_json::Value;
use std::collections::BTreeMap;

/// Hash hex de un blob de bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hash hex de un `Value` sobre su forma canónica.
pub fn hash_value(value: &Value) -> String {
    hash_bytes(to_canonical_json(value).as_bytes())
}

/// JSON canónico: claves de objeto ordenadas, sin espacios. Dos valores
/// estructuralmente iguales producen siempre el mismo texto.
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let ordered: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let inner: Vec<String> = ordered.into_iter()
                                            .map(|(k, v)| {
                                                format!("{}:{}", serde_json::to_string(k).unwrap_or_default(), v)
                                            })
                                            .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_orders_keys() {
        let a = json!({"b": 1, "a": [true, null]});
        let b = json!({"a": [true, null], "b": 1});
        assert_eq!(to_canonical_json(&a), to_canonical_json(&b));
        assert_eq!(to_canonical_json(&a), r#"{"a":[true,null],"b":1}"#);
    }

    #[test]
    fn equal_values_hash_equal() {
        let a = json!({"x": {"y": 2}});
        let b = json!({"x": {"y": 2}});
        assert_eq!(hash_value(&a), hash_value(&b));
        assert_ne!(hash_value(&a), hash_value(&json!({"x": {"y": 3}})));
    }
}
