/*!
Test Harness pour le kernel DeviceHub

Facilite l'écriture de tests bout-en-bout avec:
- Routeur Axum complet sur un store en mémoire, sans réseau
- Utilisateurs pré-enregistrés (clé d'API connue)
- Capture des événements publiés et assertions dessus
*/

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use devicehub_kernel::config::{KernelConfig, SeedUser};
use devicehub_kernel::events::{HubEvent, MemoryEvents};
use devicehub_kernel::health::HealthTracker;
use devicehub_kernel::http::{build_router, API_KEY_HEADER};
use devicehub_kernel::state::AppState;
use devicehub_kernel::store::Store;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const ALICE: &str = "alice@devicehub.test";
pub const ALICE_KEY: &str = "alice-api-key";
pub const BOB: &str = "bob@devicehub.test";
pub const BOB_KEY: &str = "bob-api-key";
pub const CAROL: &str = "carol@devicehub.test";
pub const CAROL_KEY: &str = "carol-api-key";

/// Réponse décodée : statut + corps JSON (`Null` si vide, chaîne si pas du JSON)
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }

    /// Lecture d'un champ imbriqué, ex: `"control.totalRecords"`
    pub fn field(&self, path: &str) -> Option<&Value> {
        get_nested_field(&self.body, path)
    }
}

#[derive(Debug)]
struct Expectation {
    event: String,
    expected_count: usize,
}

/// Harness de test complet pour le kernel
pub struct TestHarness {
    pub state: AppState,
    pub events: Arc<MemoryEvents>,
    router: Router,
    expectations: Vec<Expectation>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Kernel en mémoire avec les extensions de test actives
    pub fn new() -> Self {
        Self::with_config(KernelConfig { enable_test_exts: true, ..KernelConfig::default() })
    }

    pub fn with_config(mut cfg: KernelConfig) -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        cfg.users.extend(seed_users());
        let events = Arc::new(MemoryEvents::new());
        let state = AppState::new(cfg.clone(), Arc::new(Store::in_memory()), events.clone(), HealthTracker::new());
        if let Err(e) = state.users.seed(&cfg.users) {
            log::error!("seeding test users failed: {e}");
        }
        let router = build_router(state.clone());

        Self { state, events, router, expectations: Vec::new() }
    }

    /// Envoie une requête à travers le routeur complet (middlewares compris)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        api_key: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        log::debug!("{method} {uri} -> {status}");
        Ok(TestResponse { status, body })
    }

    pub async fn get(&self, uri: &str, api_key: &str) -> Result<TestResponse> {
        self.send(Method::GET, uri, Some(api_key), None).await
    }

    pub async fn post(&self, uri: &str, api_key: &str, body: Value) -> Result<TestResponse> {
        self.send(Method::POST, uri, Some(api_key), Some(body)).await
    }

    pub async fn put(&self, uri: &str, api_key: &str, body: Value) -> Result<TestResponse> {
        self.send(Method::PUT, uri, Some(api_key), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, api_key: &str) -> Result<TestResponse> {
        self.send(Method::DELETE, uri, Some(api_key), None).await
    }

    /// Crée un projet dont `api_key` est admin et `members` sont membres
    pub async fn create_project(&self, api_key: &str, name: &str, members: &[&str]) -> Result<String> {
        let response = self
            .post("/projects", api_key, json!({ "name": name, "users": members }))
            .await?;
        if response.status != StatusCode::OK {
            anyhow::bail!("project creation failed: {} {}", response.status, response.body);
        }
        response
            .field("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("project id missing in {}", response.body))
    }

    pub async fn register_device(
        &self,
        api_key: &str,
        project_id: &str,
        mac: &str,
        body: Value,
    ) -> Result<TestResponse> {
        self.put(&format!("/projects/{project_id}/devices/{mac}"), api_key, body).await
    }

    pub fn device_path(project_id: &str, mac: &str) -> String {
        format!("/projects/{project_id}/devices/{mac}")
    }

    /// Noms des événements publiés depuis le début du test
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.snapshot().iter().map(HubEvent::name).collect()
    }

    /// Ajoute une expectation: on s'attend à N événements de ce nom
    pub fn expect_events(&mut self, event: &str, count: usize) -> &mut Self {
        self.expectations.push(Expectation { event: event.to_string(), expected_count: count });
        self
    }

    /// Vérifie toutes les expectations configurées
    pub fn verify_expectations(&self) -> Result<()> {
        let names = self.event_names();
        for expectation in &self.expectations {
            let actual = names.iter().filter(|n| **n == expectation.event).count();
            if actual != expectation.expected_count {
                anyhow::bail!(
                    "Expectation failed for event '{}': expected {}, got {}",
                    expectation.event,
                    expectation.expected_count,
                    actual
                );
            }
        }
        Ok(())
    }
}

fn seed_users() -> Vec<SeedUser> {
    [(ALICE, ALICE_KEY, "Alice", "Martin"), (BOB, BOB_KEY, "Bob", "Durand"), (CAROL, CAROL_KEY, "Carol", "Petit")]
        .into_iter()
        .map(|(email, key, first, last)| SeedUser {
            email: email.into(),
            first_name: first.into(),
            last_name: last.into(),
            api_key: key.into(),
        })
        .collect()
}

fn get_nested_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_field() {
        let value = json!({"data": [{"_id": "x"}], "control": {"totalRecords": 1}});
        assert_eq!(get_nested_field(&value, "control.totalRecords"), Some(&json!(1)));
        assert_eq!(get_nested_field(&value, "data.0._id"), Some(&json!("x")));
        assert_eq!(get_nested_field(&value, "data.1"), None);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let harness = TestHarness::new();
        let response = harness.send(Method::GET, "/health", None, None).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!("ok"));
    }
}
