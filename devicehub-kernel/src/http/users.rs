use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{parse_body, CurrentUser};
use crate::error::ApiError;
use crate::query::{ListQuery, SortKey};
use crate::state::AppState;
use crate::users::{NewUser, UserView};

const SORTABLE: &[&str] = &["_id", "firstName", "lastName", "createdAt"];

// POST /users (public)
pub(super) async fn register_user(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let input: NewUser = parse_body(body)?;
    let user = app.users.register(input)?;
    Ok(Json(json!({ "_id": user.id, "apiKey": user.api_key })))
}

// GET /users
pub(super) async fn list_users(
    State(app): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let query = ListQuery::parse(&params, SORTABLE, vec![SortKey::asc("_id")])?;
    let views: Vec<UserView> = app.users.list().iter().map(UserView::from).collect();
    Ok(Json(query.apply(views)))
}

// GET /users/{user_id}
pub(super) async fn get_user(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    Ok(Json(UserView::from(&app.users.get(&user_id)?)))
}

// DELETE /users/{user_id}
pub(super) async fn delete_user(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app.users.delete(&user_id, &user)?;
    Ok(StatusCode::OK)
}
