/**
 * ERREURS API - Taxonomie HTTP commune à toutes les routes du kernel
 *
 * RÔLE :
 * Traduit les erreurs métier (validation, session, store...) en réponses
 * HTTP `{ "detail": "..." }` avec le bon code de statut.
 *
 * CORRESPONDANCE :
 * - 400 : paramètres de requête invalides (pagination, tri)
 * - 401 : pas connecté, pas membre du projet, pas détenteur de la session
 * - 404 : projet / device / profil / utilisateur absent
 * - 409 : doublon, session déjà prise, lot de contrôles invalide
 * - 500 : infrastructure (store), message générique sans détail
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::batch::BatchRejected;
use crate::controls::SchemaError;
use crate::query::QueryError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Message renvoyé au client pour toute erreur d'infrastructure
pub const GENERIC_ERROR: &str = "There was an error processing your request.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn project_not_found() -> Self {
        ApiError::NotFound("Project not found".into())
    }

    pub fn device_not_found() -> Self {
        ApiError::NotFound("Device not found".into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // Un doublon de clé unique est une erreur utilisateur, pas d'infra
            StoreError::Duplicate(what) => ApiError::Conflict(what),
            other => ApiError::Store(other),
        }
    }
}

impl From<BatchRejected> for ApiError {
    fn from(err: BatchRejected) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::HeldByOther => ApiError::Conflict(err.to_string()),
            SessionError::NotHolder | SessionError::CannotStop => {
                ApiError::Unauthorized(err.to_string())
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::Store(err) => {
                tracing::error!(error = %err, "[http] infrastructure error");
                GENERIC_ERROR.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err: ApiError = StoreError::Duplicate("already exists".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "already exists");
    }

    #[test]
    fn test_session_errors_map_to_status() {
        assert_eq!(ApiError::from(SessionError::HeldByOther).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(SessionError::NotHolder).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(SessionError::CannotStop).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_store_failure_hides_detail() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err: ApiError = StoreError::Io(io).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
