/*!
Builders pour les corps de requête des tests (schémas de contrôles, devices)
*/

use serde_json::{json, Map, Value};

/// Construit un `dataSchema` contrôle par contrôle
#[derive(Debug, Default, Clone)]
pub struct SchemaBuilder {
    controls: Map<String, Value>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric(mut self, name: &str, min: f64, max: f64) -> Self {
        self.controls.insert(name.into(), json!({ "type": "numeric", "min": min, "max": max }));
        self
    }

    pub fn boolean(mut self, name: &str) -> Self {
        self.controls.insert(name.into(), json!({ "type": "boolean" }));
        self
    }

    pub fn enumeration(mut self, name: &str, options: &[&str]) -> Self {
        self.controls.insert(name.into(), json!({ "type": "enum", "options": options }));
        self
    }

    pub fn color(mut self, name: &str) -> Self {
        self.controls.insert(name.into(), json!({ "type": "color" }));
        self
    }

    /// Verrouille un paramètre d'un contrôle déjà déclaré
    pub fn lock(mut self, name: &str, param: &str) -> Self {
        if let Some(Value::Object(control)) = self.controls.get_mut(name) {
            let locked = control.entry("lockedValues").or_insert_with(|| json!({}));
            if let Value::Object(locked) = locked {
                locked.insert(param.into(), Value::Bool(true));
            }
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.controls)
    }
}

/// Corps de `PUT /projects/{p}/devices/{mac}`
pub fn device_body(name: &str, version: &str, schema: Value, state: Value) -> Value {
    json!({
        "projectVersion": version,
        "deviceName": name,
        "dataSchema": schema,
        "currentState": state,
    })
}

/// Ventilateur : vitesse 0-100 (à 10) et LED à alpha verrouillé
pub fn fan_device() -> Value {
    device_body(
        "fan",
        "1.0",
        SchemaBuilder::new()
            .numeric("speed", 0.0, 100.0)
            .color("led")
            .lock("led", "a")
            .build(),
        json!({ "speed": 10, "led": { "r": 10, "g": 10, "b": 10, "a": 255 } }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_attached_to_control() {
        let schema = SchemaBuilder::new().color("led").lock("led", "a").lock("missing", "n").build();
        assert_eq!(schema, json!({ "led": { "type": "color", "lockedValues": { "a": true } } }));
    }
}
