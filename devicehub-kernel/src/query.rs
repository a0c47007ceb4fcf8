//! Pagination et tri des listes (`limit`, `offset`, `sort`).

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

/// Champs horodatés : triés comme instants, tous les autres textes comme texte
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "createdAt", "updatedAt", "lastAccess"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("limit must be an integer between 1 and {MAX_LIMIT}")]
    Limit,
    #[error("offset must be a non-negative integer")]
    Offset,
    #[error("cannot sort by '{0}'")]
    SortField(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), descending: false }
    }

    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), descending: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub limit: usize,
    pub offset: usize,
    pub sort: Vec<SortKey>,
}

impl ListQuery {
    /// Lit les paramètres d'URL ; les champs de tri doivent appartenir à `sortable`
    pub fn parse(
        params: &HashMap<String, String>,
        sortable: &[&str],
        default_sort: Vec<SortKey>,
    ) -> Result<Self, QueryError> {
        let limit = match params.get("limit") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|l| (1..=MAX_LIMIT).contains(l))
                .ok_or(QueryError::Limit)?,
            None => DEFAULT_LIMIT,
        };
        let offset = match params.get("offset") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| QueryError::Offset)?,
            None => 0,
        };
        let sort = match params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .split(',')
                .map(|part| parse_sort_key(part.trim(), sortable))
                .collect::<Result<Vec<_>, _>>()?,
            None => default_sort,
        };
        Ok(Self { limit, offset, sort })
    }

    /// Trie puis découpe la page demandée
    pub fn apply<T: Serialize>(&self, docs: Vec<T>) -> Vec<T> {
        let mut keyed: Vec<(Value, T)> = docs
            .into_iter()
            .map(|doc| (serde_json::to_value(&doc).unwrap_or(Value::Null), doc))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| {
            for key in &self.sort {
                let as_instant = TIMESTAMP_FIELDS.contains(&key.field.as_str());
                let ord = compare_values(a.get(&key.field), b.get(&key.field), as_instant);
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        keyed
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .map(|(_, doc)| doc)
            .collect()
    }
}

fn parse_sort_key(part: &str, sortable: &[&str]) -> Result<SortKey, QueryError> {
    let (field, descending) = match part.strip_prefix('-') {
        Some(field) => (field, true),
        None => (part.strip_prefix('+').unwrap_or(part), false),
    };
    if !sortable.contains(&field) {
        return Err(QueryError::SortField(field.to_string()));
    }
    Ok(SortKey { field: field.to_string(), descending })
}

/// Ordre total : absent/null < booléens < nombres < textes < le reste
fn compare_values(a: Option<&Value>, b: Option<&Value>, as_instant: bool) -> Ordering {
    let (a, b) = (a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null));
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().unwrap_or(0.0).total_cmp(&y.as_f64().unwrap_or(0.0))
        }
        (Value::String(x), Value::String(y)) if as_instant => {
            // Les dates illisibles passent après les dates valides
            match (OffsetDateTime::parse(x, &Rfc3339), OffsetDateTime::parse(y, &Rfc3339)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => x.cmp(y),
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) | Value::Object(_) => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    const SORTABLE: &[&str] = &["name", "createdAt", "version"];

    #[test]
    fn test_defaults() {
        let query = ListQuery::parse(&HashMap::new(), SORTABLE, vec![SortKey::asc("name")]).unwrap();
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.offset, 0);
        assert_eq!(query.sort, vec![SortKey::asc("name")]);
    }

    #[test]
    fn test_rejects_bad_params() {
        let bad = [
            (params(&[("limit", "0")]), QueryError::Limit),
            (params(&[("limit", "101")]), QueryError::Limit),
            (params(&[("limit", "abc")]), QueryError::Limit),
            (params(&[("offset", "-1")]), QueryError::Offset),
            (params(&[("sort", "name,-password")]), QueryError::SortField("password".into())),
        ];
        for (input, expected) in bad {
            assert_eq!(ListQuery::parse(&input, SORTABLE, vec![]), Err(expected));
        }
    }

    #[test]
    fn test_multi_key_sort_and_page() {
        let docs = vec![
            json!({"name": "b", "version": 1}),
            json!({"name": "a", "version": 2}),
            json!({"name": "a", "version": 1}),
            json!({"name": "c", "version": 3}),
        ];
        let query = ListQuery::parse(&params(&[("sort", "name,-version"), ("limit", "2"), ("offset", "1")]), SORTABLE, vec![]).unwrap();
        let page = query.apply(docs);
        assert_eq!(page, vec![json!({"name": "a", "version": 1}), json!({"name": "b", "version": 1})]);
    }

    #[test]
    fn test_dates_compare_as_instants() {
        let docs = vec![
            json!({"createdAt": "2024-05-01T12:00:00+02:00"}),
            json!({"createdAt": "2024-05-01T11:00:00Z"}),
        ];
        let query = ListQuery::parse(&params(&[("sort", "createdAt")]), SORTABLE, vec![]).unwrap();
        let sorted = query.apply(docs);
        assert_eq!(sorted[0]["createdAt"], json!("2024-05-01T12:00:00+02:00"));
    }

    #[test]
    fn test_text_fields_never_compare_as_dates() {
        let docs = vec![
            json!({"name": "b"}),
            json!({"name": "2024-05-01T12:00:00+02:00"}),
            json!({"name": "2024-05-01T11:00:00Z"}),
        ];
        let query = ListQuery::parse(&params(&[("sort", "name")]), SORTABLE, vec![]).unwrap();
        let names: Vec<Value> = query.apply(docs).into_iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("2024-05-01T11:00:00Z"), json!("2024-05-01T12:00:00+02:00"), json!("b")]);
    }

    #[test]
    fn test_mixed_types_have_a_stable_order() {
        let docs = vec![json!({"version": "x"}), json!({"version": 2}), json!({}), json!({"version": true})];
        let query = ListQuery::parse(&params(&[("sort", "version")]), SORTABLE, vec![]).unwrap();
        let versions: Vec<Value> = query.apply(docs).into_iter().map(|d| d["version"].clone()).collect();
        assert_eq!(versions, vec![Value::Null, json!(true), json!(2), json!("x")]);
    }
}
