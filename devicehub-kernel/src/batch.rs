//! Traitement d'un lot d'updates sur l'état d'un device.
//!
//! Toutes les valeurs soumises sont validées d'abord et toutes les erreurs
//! sont collectées. L'état fusionné n'est produit que si le lot entier est
//! valide : pas d'application partielle.

use serde_json::Value;

use crate::controls::{Control, ControlState, DataSchema};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("There were error/s during data validation: {}.", .reasons.join(", "))]
pub struct BatchRejected {
    pub reasons: Vec<String>,
}

/// Valide puis applique `patch` sur une copie de `state`.
/// Retourne le nouvel état, `state` n'est jamais modifié.
pub fn process_batch(
    schema: &DataSchema,
    state: &ControlState,
    patch: &ControlState,
) -> Result<ControlState, BatchRejected> {
    if patch.is_empty() {
        return Err(BatchRejected { reasons: vec!["no control values were submitted".into()] });
    }

    let mut reasons = Vec::new();
    let mut accepted = Vec::with_capacity(patch.len());
    for (name, candidate) in patch {
        let Some(control) = schema.get(name) else {
            reasons.push(format!("'{name}' is not a control of this device"));
            continue;
        };
        let result = control.validate(candidate);
        if result.success {
            accepted.push((name, control, candidate));
        } else {
            reasons.push(format!("{name}: {}", result.reason.unwrap_or_default()));
        }
    }

    if !reasons.is_empty() {
        return Err(BatchRejected { reasons });
    }

    let mut next = state.clone();
    for (name, control, candidate) in accepted {
        let current = next.entry(name.clone()).or_insert(Value::Null);
        control.apply(current, candidate);
    }
    Ok(next)
}
