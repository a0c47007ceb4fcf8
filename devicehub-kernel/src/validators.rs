//! Validateurs de champs utilisateur (noms, e-mails, projets).
//! Chaque validateur renvoie un message lisible en cas d'échec.

use regex::Regex;
use std::sync::LazyLock;

// Mots de lettres (latin étendu inclus) séparés par une apostrophe ou un tiret unique
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\u{00c0}-\u{01ff}a-zA-Z]+\b['\-]?)+\b$").expect("name pattern")
});

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

pub fn validate_name(field: &str, value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if !(3..=40).contains(&len) {
        return Err(format!("{field} should be between 3 and 40 characters"));
    }
    if !NAME_PATTERN.is_match(value) {
        return Err(format!(
            "{field} should only use valid characters (a-z, apostrophe, hyphen)"
        ));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), String> {
    if value.len() > 254 || !EMAIL_PATTERN.is_match(value) {
        return Err(format!("'{value}' is not a valid email address"));
    }
    Ok(())
}

pub fn validate_project_name(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if !(3..=50).contains(&len) {
        return Err("Project name should be between 3 and 50 characters".into());
    }
    Ok(())
}

pub fn validate_description(value: &str) -> Result<(), String> {
    if value.chars().count() > 300 {
        return Err("Description should be at most 300 characters".into());
    }
    Ok(())
}

pub fn is_non_empty(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert!(validate_name("firstName", "Anne").is_ok());
        assert!(validate_name("lastName", "O'Brien").is_ok());
        assert!(validate_name("lastName", "Jean-Luc").is_ok());
        assert!(validate_name("lastName", "Zoë").is_ok());
        assert!(validate_name("firstName", "Al").is_err());
        assert!(validate_name("firstName", "Anne-").is_err());
        assert!(validate_name("firstName", "An--ne").is_err());
        assert!(validate_name("firstName", "R2D2").is_err());
    }

    #[test]
    fn test_emails() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user@example").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert!(!is_non_empty(None));
        assert!(!is_non_empty(Some("   ")));
        assert!(is_non_empty(Some("abcd")));
    }
}
