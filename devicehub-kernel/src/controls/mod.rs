/**
 * CONTROLS - Registre des types de contrôles d'un device
 *
 * RÔLE :
 * Chaque device décrit son état par un `dataSchema` : une map nom → schéma
 * de contrôle. Ce module résout ce schéma JSON en un ensemble fermé de
 * types (numeric, boolean, enum, color) au moment de l'enregistrement du
 * device, puis fournit pour chaque contrôle la paire `validate` / `apply`.
 *
 * FONCTIONNEMENT :
 * - `ControlSchema` = enum taggé par le champ `type` (résolu une seule fois)
 * - `Control` trait = validate (sans effet de bord) + apply (fusion avec verrous)
 * - `lockedValues` = sous-champs que le client ne peut jamais modifier
 * - Un type inconnu est une erreur d'enregistrement, jamais une erreur de requête
 *
 * EXEMPLE :
 * ```json
 * {
 *   "speed": { "type": "numeric", "min": 0, "max": 100 },
 *   "led":   { "type": "color", "lockedValues": { "a": true } }
 * }
 * ```
 */

pub mod boolean;
pub mod color;
pub mod enumerated;
pub mod numeric;
mod params;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use boolean::BooleanSchema;
pub use color::{ColorSchema, Rgba};
pub use enumerated::EnumSchema;
pub use numeric::NumericSchema;

/// État courant d'un device : nom du contrôle → valeur
pub type ControlState = Map<String, Value>;

/// Sous-champs verrouillés d'un contrôle (ex: `{"a": true}` fige l'alpha)
pub type LockedValues = BTreeMap<String, bool>;

/// Résultat d'une validation : jamais levé, toujours retourné
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub success: bool,
    pub reason: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self { success: true, reason: None }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self { success: false, reason: Some(reason.into()) }
    }
}

/// Capacités communes à tous les types de contrôles
pub trait Control {
    /// Vérifie une valeur candidate contre les contraintes du schéma.
    /// Ne modifie ni le schéma ni la valeur.
    fn validate(&self, candidate: &Value) -> Validation;

    /// Vérifie une valeur destinée à être stockée telle quelle dans l'état
    /// d'un device (enregistrement). Plus stricte que `validate` quand une
    /// mise à jour partielle est permise.
    fn validate_state(&self, value: &Value) -> Validation {
        self.validate(value)
    }

    /// Fusionne la valeur candidate dans la valeur courante.
    /// Un sous-champ verrouillé garde toujours sa valeur précédente.
    fn apply(&self, current: &mut Value, candidate: &Value);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlSchema {
    #[serde(alias = "range")]
    Numeric(NumericSchema),
    Boolean(BooleanSchema),
    #[serde(rename = "enum", alias = "enumerated")]
    Enumerated(EnumSchema),
    #[serde(alias = "colour")]
    Color(ColorSchema),
}

impl ControlSchema {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlSchema::Numeric(_) => "numeric",
            ControlSchema::Boolean(_) => "boolean",
            ControlSchema::Enumerated(_) => "enum",
            ControlSchema::Color(_) => "color",
        }
    }

    pub fn locked_values(&self) -> &LockedValues {
        match self {
            ControlSchema::Numeric(s) => &s.locked_values,
            ControlSchema::Boolean(s) => &s.locked_values,
            ControlSchema::Enumerated(s) => &s.locked_values,
            ControlSchema::Color(s) => &s.locked_values,
        }
    }

    fn control(&self) -> &dyn Control {
        match self {
            ControlSchema::Numeric(s) => s,
            ControlSchema::Boolean(s) => s,
            ControlSchema::Enumerated(s) => s,
            ControlSchema::Color(s) => s,
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            ControlSchema::Numeric(s) => s.check(),
            ControlSchema::Boolean(s) => s.check(),
            ControlSchema::Enumerated(s) => s.check(),
            ControlSchema::Color(s) => s.check(),
        }
    }
}

impl Control for ControlSchema {
    fn validate(&self, candidate: &Value) -> Validation {
        self.control().validate(candidate)
    }

    fn validate_state(&self, value: &Value) -> Validation {
        self.control().validate_state(value)
    }

    fn apply(&self, current: &mut Value, candidate: &Value) {
        self.control().apply(current, candidate)
    }
}

/// Erreurs de résolution d'un schéma ou d'un état initial (à l'enregistrement)
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("dataSchema must be an object of named controls")]
    NotAnObject,
    #[error("control '{name}': {reason}")]
    InvalidControl { name: String, reason: String },
    #[error("currentState must be an object")]
    StateNotAnObject,
    #[error("currentState is missing a value for control '{0}'")]
    MissingState(String),
    #[error("currentState has a value for unknown control '{0}'")]
    UnknownState(String),
    #[error("currentState value for '{name}' is invalid: {reason}")]
    InvalidState { name: String, reason: String },
}

/// Schéma complet d'un device, résolu en types de contrôles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSchema(BTreeMap<String, ControlSchema>);

impl DataSchema {
    /// Résout un `dataSchema` JSON brut : type connu + contraintes cohérentes
    pub fn resolve(raw: &Value) -> Result<Self, SchemaError> {
        let obj = raw.as_object().ok_or(SchemaError::NotAnObject)?;
        let mut controls = BTreeMap::new();
        for (name, raw_control) in obj {
            let control: ControlSchema = serde_json::from_value(raw_control.clone()).map_err(|e| {
                SchemaError::InvalidControl { name: name.clone(), reason: e.to_string() }
            })?;
            control
                .check()
                .map_err(|reason| SchemaError::InvalidControl { name: name.clone(), reason })?;
            controls.insert(name.clone(), control);
        }
        Ok(Self(controls))
    }

    /// Vérifie qu'un état initial couvre exactement les contrôles et reste valide
    pub fn check_state(&self, raw: &Value) -> Result<ControlState, SchemaError> {
        let state = raw.as_object().ok_or(SchemaError::StateNotAnObject)?;
        if let Some(unknown) = state.keys().find(|key| !self.0.contains_key(*key)) {
            return Err(SchemaError::UnknownState(unknown.clone()));
        }
        for (name, control) in &self.0 {
            let value = state
                .get(name)
                .ok_or_else(|| SchemaError::MissingState(name.clone()))?;
            let result = control.validate_state(value);
            if !result.success {
                return Err(SchemaError::InvalidState {
                    name: name.clone(),
                    reason: result.reason.unwrap_or_default(),
                });
            }
        }
        Ok(state.clone())
    }

    pub fn get(&self, name: &str) -> Option<&ControlSchema> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ControlSchema)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn is_locked(locked: &LockedValues, param: &str) -> bool {
    locked.get(param).copied().unwrap_or(false)
}

pub(crate) fn check_locks(locked: &LockedValues, known: &[&str]) -> Result<(), String> {
    match locked.keys().find(|key| !known.contains(&key.as_str())) {
        Some(key) => Err(format!("lockedValues refers to unknown field '{key}'")),
        None => Ok(()),
    }
}
