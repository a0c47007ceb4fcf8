/**
 * API REST DEVICEHUB - Serveur HTTP du kernel
 *
 * RÔLE :
 * Expose les utilisateurs, projets, devices (sessions, updates) et profils.
 * Chaque ressource a son fichier de handlers, ce module assemble le routeur.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum avec middleware d'authentification par clé d'API
 * - Erreurs métier traduites par `ApiError` en `{ "detail": "..." }`
 * - Spans de requête via `TraceLayer`
 *
 * SÉCURITÉ :
 * - Header `x-api-key` obligatoire sauf sur `GET /health` et `POST /users`
 * - La clé désigne un utilisateur, injecté dans la requête (`CurrentUser`)
 * - Routes `/test/...` montées uniquement si `enable_test_exts` est actif
 */

mod devices;
mod profiles;
mod projects;
mod system;
mod users;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Utilisateur authentifié de la requête courante
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Corps JSON déjà lu → type attendu, 400 si la forme ne correspond pas
fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}

fn is_public(method: &Method, path: &str) -> bool {
    (method == Method::GET && path == "/health") || (method == Method::POST && path == "/users")
}

async fn require_api_key(
    State(app): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public(req.method(), req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let user = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|key| app.users.authenticate(key.trim()));

    let Some(user) = user else {
        tracing::warn!(path = %req.uri().path(), "[http] rejected request without valid api key");
        return Err(ApiError::Unauthorized("Not logged in".into()));
    };
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(system::get_system_health))
        .route("/users", post(users::register_user).get(users::list_users))
        .route("/users/{user_id}", get(users::get_user).delete(users::delete_user))
        .route("/projects", post(projects::create_project).get(projects::list_projects))
        .route(
            "/projects/{project_id}",
            get(projects::get_project).put(projects::update_project).delete(projects::delete_project),
        )
        .route("/projects/{project_id}/devices", get(devices::list_devices))
        .route(
            "/projects/{project_id}/devices/{mac}",
            put(devices::register_device).get(devices::get_device).delete(devices::deregister_device),
        )
        .route("/projects/{project_id}/devices/{mac}/schema", get(devices::get_schema))
        .route(
            "/projects/{project_id}/devices/{mac}/session",
            post(devices::start_session).delete(devices::stop_session),
        )
        .route("/projects/{project_id}/devices/{mac}/session/revoke", post(devices::revoke_session))
        .route(
            "/projects/{project_id}/devices/{mac}/updates",
            post(devices::queue_update).get(devices::get_updates),
        )
        .route("/projects/{project_id}/profiles", put(profiles::save_profile).get(profiles::list_profiles))
        .route(
            "/projects/{project_id}/profiles/{profile_id}",
            get(profiles::get_profile).delete(profiles::delete_profile),
        );

    if app_state.cfg.lock().enable_test_exts {
        tracing::warn!("[http] test extensions enabled");
        router = router
            .route("/test/device_api/reset", post(system::reset_devices))
            .route("/test/profile_api/reset", post(system::reset_profiles));
    }

    router
        .layer(middleware::from_fn_with_state(app_state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert!(is_public(&Method::GET, "/health"));
        assert!(is_public(&Method::POST, "/users"));
        assert!(!is_public(&Method::GET, "/users"));
        assert!(!is_public(&Method::GET, "/system/health"));
        assert!(!is_public(&Method::POST, "/health"));
    }
}
