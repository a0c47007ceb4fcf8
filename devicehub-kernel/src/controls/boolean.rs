use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::{read_params, unknown_param, write_params};
use super::{check_locks, is_locked, Control, LockedValues, Validation};

pub const PARAM: &str = "on";

/// Interrupteur on/off
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanSchema {
    #[serde(default, skip_serializing_if = "LockedValues::is_empty")]
    pub locked_values: LockedValues,
}

impl BooleanSchema {
    pub(crate) fn check(&self) -> Result<(), String> {
        check_locks(&self.locked_values, &[PARAM])
    }
}

impl Control for BooleanSchema {
    fn validate(&self, candidate: &Value) -> Validation {
        let params = read_params(candidate, PARAM);
        if let Some(unknown) = unknown_param(&params, &[PARAM]) {
            return Validation::fail(format!("unknown field '{unknown}'"));
        }
        match params.get(PARAM) {
            Some(Value::Bool(_)) => Validation::ok(),
            Some(other) => Validation::fail(format!("value {other} is not true or false")),
            None => Validation::fail("a true/false value is required"),
        }
    }

    fn apply(&self, current: &mut Value, candidate: &Value) {
        let mut params = read_params(candidate, PARAM);
        params.retain(|key, _| key == PARAM && !is_locked(&self.locked_values, key));
        write_params(current, PARAM, params);
    }
}
