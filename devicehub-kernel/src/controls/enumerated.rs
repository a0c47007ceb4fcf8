use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::{read_params, unknown_param, write_params};
use super::{check_locks, is_locked, Control, LockedValues, Validation};

pub const PARAM: &str = "selected";

/// Choix parmi une liste fermée d'options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumSchema {
    pub options: Vec<Value>,
    #[serde(default, skip_serializing_if = "LockedValues::is_empty")]
    pub locked_values: LockedValues,
}

impl EnumSchema {
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.options.is_empty() {
            return Err("options must list at least one value".into());
        }
        if let Some(bad) = self.options.iter().find(|o| !(o.is_string() || o.is_number())) {
            return Err(format!("option {bad} must be a string or a number"));
        }
        check_locks(&self.locked_values, &[PARAM])
    }

    fn describe_options(&self) -> String {
        self.options
            .iter()
            .map(|o| match o {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Control for EnumSchema {
    fn validate(&self, candidate: &Value) -> Validation {
        let params = read_params(candidate, PARAM);
        if let Some(unknown) = unknown_param(&params, &[PARAM]) {
            return Validation::fail(format!("unknown field '{unknown}'"));
        }
        let Some(selected) = params.get(PARAM) else {
            return Validation::fail("a selected option is required");
        };
        if self.options.iter().any(|option| same_option(option, selected)) {
            Validation::ok()
        } else {
            Validation::fail(format!(
                "{selected} is not one of the allowed options ({})",
                self.describe_options()
            ))
        }
    }

    fn apply(&self, current: &mut Value, candidate: &Value) {
        let mut params = read_params(candidate, PARAM);
        params.retain(|key, _| key == PARAM && !is_locked(&self.locked_values, key));
        write_params(current, PARAM, params);
    }
}

/// `3` et `3.0` désignent la même option
fn same_option(option: &Value, selected: &Value) -> bool {
    match (option.as_f64(), selected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => option == selected,
    }
}
