use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{parse_body, CurrentUser};
use crate::error::ApiError;
use crate::profiles::NewProfile;
use crate::query::{ListQuery, SortKey};
use crate::state::AppState;

const SORTABLE: &[&str] = &["profileName", "projectVersion", "createdAt", "updatedAt"];

// PUT /projects/{project_id}/profiles?deviceId=...
pub(super) async fn save_profile(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let input: NewProfile = parse_body(body)?;
    let device_id = params.get("deviceId").map(String::as_str);
    let profile = app.profiles.save(&project, device_id, &user, input)?;
    Ok(Json(json!({ "data": { "_id": profile.id } })))
}

// GET /projects/{project_id}/profiles
pub(super) async fn list_profiles(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let query = ListQuery::parse(&params, SORTABLE, vec![SortKey::asc("profileName")])?;
    let profiles = app.profiles.list(&project, params.get("projectVersion").map(String::as_str));
    let total = profiles.len();
    let page = query.apply(profiles);
    Ok(Json(json!({
        "data": page,
        "control": { "recordsSent": page.len(), "totalRecords": total },
    })))
}

// GET /projects/{project_id}/profiles/{profile_id}
pub(super) async fn get_profile(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, profile_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let profile = app.profiles.get(&project, &profile_id)?;
    Ok(Json(json!({ "data": profile })))
}

// DELETE /projects/{project_id}/profiles/{profile_id}
pub(super) async fn delete_profile(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, profile_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    app.profiles.delete(&project, &profile_id, &user)?;
    Ok(StatusCode::OK)
}
