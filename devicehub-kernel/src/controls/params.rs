//! Lecture / écriture des paramètres d'une valeur de contrôle.
//!
//! Une valeur peut arriver sous trois formes :
//! - scalaire nu (`90`) pour les contrôles à un seul paramètre
//! - objet plat (`{"r": 10, "g": 10, ...}`)
//! - objet imbriqué (`{"values": {"n": 90}}`)
//!
//! L'écriture respecte toujours la forme de la valeur courante.

use serde_json::{Map, Value};

const NESTED_KEY: &str = "values";

/// Extrait la map des paramètres d'une valeur, quelle que soit sa forme
pub(crate) fn read_params(value: &Value, default_param: &str) -> Map<String, Value> {
    match value {
        Value::Object(obj) => match obj.get(NESTED_KEY) {
            Some(Value::Object(inner)) => inner.clone(),
            _ => obj.clone(),
        },
        scalar => {
            let mut params = Map::new();
            params.insert(default_param.to_string(), scalar.clone());
            params
        }
    }
}

/// Écrit des paramètres dans la valeur courante en conservant sa forme
pub(crate) fn write_params(current: &mut Value, default_param: &str, mut updates: Map<String, Value>) {
    if updates.is_empty() {
        return;
    }
    match current {
        Value::Object(obj) => {
            let nested = matches!(obj.get(NESTED_KEY), Some(Value::Object(_)));
            let target = if nested {
                obj.get_mut(NESTED_KEY).and_then(Value::as_object_mut)
            } else {
                Some(obj)
            };
            if let Some(target) = target {
                for (key, value) in updates {
                    target.insert(key, value);
                }
            }
        }
        Value::Null => {
            // Pas de valeur précédente : scalaire nu si un seul paramètre par défaut
            if updates.len() == 1 && updates.contains_key(default_param) {
                if let Some(value) = updates.remove(default_param) {
                    *current = value;
                }
            } else {
                *current = Value::Object(updates);
            }
        }
        _ => {
            if let Some(value) = updates.remove(default_param) {
                *current = value;
            }
        }
    }
}

/// Premier paramètre qui n'appartient pas à la liste connue
pub(crate) fn unknown_param<'a>(params: &'a Map<String, Value>, known: &[&str]) -> Option<&'a str> {
    params
        .keys()
        .map(String::as_str)
        .find(|key| !known.contains(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_all_shapes() {
        assert_eq!(read_params(&json!(90), "n"), json!({"n": 90}).as_object().unwrap().clone());
        assert_eq!(read_params(&json!({"n": 90}), "n")["n"], json!(90));
        assert_eq!(read_params(&json!({"values": {"n": 90}}), "n")["n"], json!(90));
    }

    #[test]
    fn test_write_keeps_shape() {
        let mut bare = json!(10);
        write_params(&mut bare, "n", json!({"n": 50}).as_object().unwrap().clone());
        assert_eq!(bare, json!(50));

        let mut nested = json!({"values": {"n": 10}, "label": "speed"});
        write_params(&mut nested, "n", json!({"n": 50}).as_object().unwrap().clone());
        assert_eq!(nested, json!({"values": {"n": 50}, "label": "speed"}));

        let mut flat = json!({"r": 1, "g": 2});
        write_params(&mut flat, "", json!({"g": 9}).as_object().unwrap().clone());
        assert_eq!(flat, json!({"r": 1, "g": 9}));
    }

    #[test]
    fn test_write_into_missing_value() {
        let mut missing = Value::Null;
        write_params(&mut missing, "on", json!({"on": true}).as_object().unwrap().clone());
        assert_eq!(missing, json!(true));

        let mut missing_color = Value::Null;
        write_params(&mut missing_color, "", json!({"r": 1, "g": 2}).as_object().unwrap().clone());
        assert_eq!(missing_color, json!({"r": 1, "g": 2}));
    }
}
