//! Contrôle couleur RGBA.
//!
//! En interne les quatre canaux sont des entiers 0-255 (alpha compris).
//! Les représentations externes (`#rrggbbaa`, `rgba(r, g, b, 0.5)`) portent
//! l'alpha en fraction 0-1 pour `rgba()`, en octet pour la forme hexadécimale.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::params::{read_params, unknown_param, write_params};
use super::{check_locks, is_locked, Control, LockedValues, Validation};

pub const CHANNELS: [&str; 4] = ["r", "g", "b", "a"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSchema {
    #[serde(default, skip_serializing_if = "LockedValues::is_empty")]
    pub locked_values: LockedValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Parse une couleur externe : `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(...)`, `rgba(...)`
    pub fn parse(raw: &str) -> Result<Self, String> {
        let text = raw.trim().to_ascii_lowercase();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::parse_hex(hex).ok_or_else(|| format!("'{raw}' is not a valid hex color"));
        }
        if let Some(body) = text.strip_prefix("rgba(").and_then(|s| s.strip_suffix(')')) {
            return Self::parse_functional(body, true)
                .ok_or_else(|| format!("'{raw}' is not a valid rgba() color"));
        }
        if let Some(body) = text.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
            return Self::parse_functional(body, false)
                .ok_or_else(|| format!("'{raw}' is not a valid rgb() color"));
        }
        Err(format!("'{raw}' is not a recognised color"))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
        match hex.len() {
            3 => Some(Self { r: nibble(0)?, g: nibble(1)?, b: nibble(2)?, a: 255 }),
            6 => Some(Self { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: 255 }),
            8 => Some(Self { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
            _ => None,
        }
    }

    fn parse_functional(body: &str, with_alpha: bool) -> Option<Self> {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let expected = if with_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return None;
        }
        let channel = |s: &str| s.parse::<u8>().ok();
        let a = if with_alpha { Self::alpha_from_fraction(parts[3].parse::<f64>().ok()?)? } else { 255 };
        Some(Self { r: channel(parts[0])?, g: channel(parts[1])?, b: channel(parts[2])?, a })
    }

    pub fn alpha_from_fraction(fraction: f64) -> Option<u8> {
        if !(0.0..=1.0).contains(&fraction) {
            return None;
        }
        Some((fraction * 255.0).round() as u8)
    }

    pub fn alpha_fraction(&self) -> f64 {
        f64::from(self.a) / 255.0
    }

    pub fn to_hex8(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Lit une couleur stockée (forme plate ou `{"values": {...}}`)
    pub fn from_value(value: &Value) -> Option<Self> {
        let params = read_params(value, "");
        let channel = |name: &str| params.get(name)?.as_u64().and_then(|v| u8::try_from(v).ok());
        Some(Self { r: channel("r")?, g: channel("g")?, b: channel("b")?, a: channel("a")? })
    }

    fn to_params(self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("r".into(), self.r.into());
        params.insert("g".into(), self.g.into());
        params.insert("b".into(), self.b.into());
        params.insert("a".into(), self.a.into());
        params
    }
}

impl ColorSchema {
    pub(crate) fn check(&self) -> Result<(), String> {
        check_locks(&self.locked_values, &CHANNELS)
    }

    /// Canaux proposés par la valeur candidate, avant application des verrous
    fn candidate_channels(candidate: &Value) -> Result<Map<String, Value>, String> {
        if let Value::String(text) = candidate {
            return Rgba::parse(text).map(Rgba::to_params);
        }
        if !candidate.is_object() {
            return Err(format!("value {candidate} is not a color"));
        }
        let params = read_params(candidate, "");
        if let Some(unknown) = unknown_param(&params, &CHANNELS) {
            return Err(format!("unknown channel '{unknown}'"));
        }
        if params.is_empty() {
            return Err("at least one color channel is required".into());
        }
        for (name, value) in &params {
            let in_range = value.as_u64().map(|v| v <= 255).unwrap_or(false);
            if !in_range {
                return Err(format!("channel '{name}' must be an integer between 0 and 255, got {value}"));
            }
        }
        Ok(params)
    }
}

impl Control for ColorSchema {
    fn validate(&self, candidate: &Value) -> Validation {
        match Self::candidate_channels(candidate) {
            Ok(_) => Validation::ok(),
            Err(reason) => Validation::fail(reason),
        }
    }

    fn validate_state(&self, value: &Value) -> Validation {
        if !value.is_object() {
            return Validation::fail(format!("value {value} is not an r, g, b, a color"));
        }
        let result = self.validate(value);
        if !result.success {
            return result;
        }
        match Rgba::from_value(value) {
            Some(_) => Validation::ok(),
            None => Validation::fail("a stored color needs all of r, g, b and a"),
        }
    }

    fn apply(&self, current: &mut Value, candidate: &Value) {
        let Ok(mut channels) = Self::candidate_channels(candidate) else {
            return;
        };
        channels.retain(|name, _| !is_locked(&self.locked_values, name));
        // Couleur stockée sous forme de texte : repasse en canaux avant fusion
        if let Value::String(text) = &*current {
            let channels_form = match Rgba::parse(text) {
                Ok(rgba) => Value::Object(rgba.to_params()),
                Err(_) => Value::Null,
            };
            *current = channels_form;
        }
        write_params(current, "", channels);
    }
}
