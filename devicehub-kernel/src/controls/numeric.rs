use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::{read_params, unknown_param, write_params};
use super::{is_locked, check_locks, Control, LockedValues, Validation};

/// Nom du paramètre porté par un contrôle numérique (`{"values": {"n": 90}}`)
pub const PARAM: &str = "n";

/// Valeur numérique bornée (bornes inclusives, pas optionnel)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "LockedValues::is_empty")]
    pub locked_values: LockedValues,
}

impl NumericSchema {
    pub(crate) fn check(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("min ({min}) is greater than max ({max})"));
            }
        }
        if let Some(step) = self.step {
            if !(step.is_finite() && step > 0.0) {
                return Err("step must be a positive number".into());
            }
        }
        check_locks(&self.locked_values, &[PARAM])
    }
}

impl Control for NumericSchema {
    fn validate(&self, candidate: &Value) -> Validation {
        let params = read_params(candidate, PARAM);
        if let Some(unknown) = unknown_param(&params, &[PARAM]) {
            return Validation::fail(format!("unknown field '{unknown}'"));
        }
        let Some(raw) = params.get(PARAM) else {
            return Validation::fail("a numeric value is required");
        };
        let Some(n) = raw.as_f64().filter(|n| n.is_finite()) else {
            return Validation::fail(format!("value {raw} is not a number"));
        };
        if let Some(min) = self.min {
            if n < min {
                return Validation::fail(format!("value {raw} is below the minimum of {min}"));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return Validation::fail(format!("value {raw} is above the maximum of {max}"));
            }
        }
        if let Some(step) = self.step {
            let steps = (n - self.min.unwrap_or(0.0)) / step;
            if (steps - steps.round()).abs() > 1e-9 {
                return Validation::fail(format!("value {raw} is not a multiple of {step}"));
            }
        }
        Validation::ok()
    }

    fn apply(&self, current: &mut Value, candidate: &Value) {
        let mut params = read_params(candidate, PARAM);
        params.retain(|key, _| key == PARAM && !is_locked(&self.locked_values, key));
        write_params(current, PARAM, params);
    }
}
