use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::Value;
use std::collections::HashMap;

use super::{parse_body, CurrentUser};
use crate::error::ApiError;
use crate::models::Project;
use crate::projects::{NewProject, ProjectChanges};
use crate::query::{ListQuery, SortKey};
use crate::state::AppState;

const SORTABLE: &[&str] = &["name", "sortingName", "createdAt", "updatedAt", "deviceCount"];

// POST /projects
pub(super) async fn create_project(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Json<Project>, ApiError> {
    let input: NewProject = parse_body(body)?;
    Ok(Json(app.projects.create(input, &user)?))
}

// GET /projects
pub(super) async fn list_projects(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let query = ListQuery::parse(&params, SORTABLE, vec![SortKey::asc("sortingName")])?;
    Ok(Json(query.apply(app.projects.list_for(&user))))
}

// GET /projects/{project_id}
pub(super) async fn get_project(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(app.projects.load_for(&project_id, &user)?))
}

// PUT /projects/{project_id}
pub(super) async fn update_project(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Project>, ApiError> {
    let changes: ProjectChanges = parse_body(body)?;
    Ok(Json(app.projects.update(&project_id, &user, changes)?))
}

// DELETE /projects/{project_id}
pub(super) async fn delete_project(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app.projects.delete(&project_id, &user)?;
    Ok(StatusCode::OK)
}
