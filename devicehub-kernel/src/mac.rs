use serde::{Deserialize, Serialize};
use std::fmt;

/// Adresse MAC IEEE 802, normalisée en minuscules avec séparateur '-'
/// (ex: "01-23-45-67-89-ab"). Les formes avec ':' sont acceptées en entrée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

pub const MAC_FORMAT_HINT: &str =
    "Invalid MAC address format. Should be IEEE 802 format. (01-23-45-67-89-ab)";

impl MacAddress {
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let raw = raw.trim();
        let sep = if raw.contains('-') { '-' } else { ':' };
        let parts: Vec<&str> = raw.split(sep).collect();
        if parts.len() != 6 {
            return Err("bad mac len");
        }
        let mut out = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("bad mac hex");
            }
            out[i] = u8::from_str_radix(part, 16).map_err(|_| "bad mac hex")?;
        }
        Ok(Self(out))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}-{b:02x}-{c:02x}-{d:02x}-{e:02x}-{g:02x}")
    }
}

impl TryFrom<String> for MacAddress {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}
