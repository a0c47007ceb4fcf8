use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use time::OffsetDateTime;

use super::{parse_body, CurrentUser};
use crate::controls::{ControlState, DataSchema};
use crate::devices::DeviceRegistration;
use crate::error::ApiError;
use crate::mac::MacAddress;
use crate::models::{Device, Update};
use crate::query::{ListQuery, SortKey};
use crate::state::AppState;

const SORTABLE: &[&str] = &["timestamp", "createdAt", "lastAccess", "projectVersion", "deviceName", "macAddress"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeviceView {
    #[serde(rename = "_id")]
    id: String,
    mac_address: MacAddress,
    device_name: String,
    project_id: String,
    project_version: String,
    data_schema: DataSchema,
    current_state: ControlState,
    session_user: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    last_access: OffsetDateTime,
}

impl From<Device> for DeviceView {
    fn from(device: Device) -> Self {
        Self {
            session_user: device.session_user().map(str::to_string),
            id: device.id,
            mac_address: device.mac_address,
            device_name: device.device_name,
            project_id: device.project_id,
            project_version: device.project_version,
            data_schema: device.data_schema,
            current_state: device.current_state,
            timestamp: device.timestamp,
            created_at: device.created_at,
            last_access: device.last_access,
        }
    }
}

#[derive(Serialize)]
pub(super) struct UpdateView {
    #[serde(rename = "_id")]
    id: String,
    seq: u64,
    data: ControlState,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

impl From<Update> for UpdateView {
    fn from(update: Update) -> Self {
        Self { id: update.id, seq: update.seq, data: update.data, timestamp: update.timestamp }
    }
}

// PUT /projects/{project_id}/devices/{mac}
pub(super) async fn register_device(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let input: DeviceRegistration = parse_body(body)?;
    let registration = app.devices.register(&project, &mac, input)?;
    Ok(Json(json!({ "_id": registration.device().id })))
}

// DELETE /projects/{project_id}/devices/{mac}
pub(super) async fn deregister_device(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    app.devices.deregister(&project, &mac)?;
    Ok(StatusCode::OK)
}

// GET /projects/{project_id}/devices/{mac}
pub(super) async fn get_device(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
) -> Result<Json<DeviceView>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    Ok(Json(app.devices.get(&project, &mac)?.into()))
}

// GET /projects/{project_id}/devices
pub(super) async fn list_devices(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<DeviceView>>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let query = ListQuery::parse(
        &params,
        SORTABLE,
        vec![SortKey::desc("timestamp"), SortKey::asc("projectVersion")],
    )?;
    let views: Vec<DeviceView> = app.devices.list(&project).into_iter().map(DeviceView::from).collect();
    Ok(Json(query.apply(views)))
}

// GET /projects/{project_id}/devices/{mac}/schema
pub(super) async fn get_schema(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
) -> Result<Json<DataSchema>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    Ok(Json(app.devices.get(&project, &mac)?.data_schema))
}

// POST /projects/{project_id}/devices/{mac}/session
pub(super) async fn start_session(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let device = app.devices.start_session(&project, &mac, &user)?;
    let lease = device.session.as_ref().and_then(|s| s.lease_expires_at);
    Ok(Json(json!({
        "_id": device.id,
        "dataSchema": device.data_schema,
        "currentState": device.current_state,
        "sessionUser": device.session_user(),
        "leaseExpiresAt": lease.and_then(|at| at.format(&time::format_description::well_known::Rfc3339).ok()),
    })))
}

// DELETE /projects/{project_id}/devices/{mac}/session
pub(super) async fn stop_session(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    app.devices.stop_session(&project, &mac, &user)?;
    Ok(StatusCode::OK)
}

// POST /projects/{project_id}/devices/{mac}/session/revoke
pub(super) async fn revoke_session(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    app.devices.revoke_session(&project, &mac, &user)?;
    Ok(StatusCode::OK)
}

// POST /projects/{project_id}/devices/{mac}/updates
pub(super) async fn queue_update(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let update = app.devices.queue_update(&project, &mac, &user, &patch)?;
    Ok(Json(json!({ "_id": update.id, "seq": update.seq })))
}

// GET /projects/{project_id}/devices/{mac}/updates
pub(super) async fn get_updates(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((project_id, mac)): Path<(String, String)>,
) -> Result<Json<Vec<UpdateView>>, ApiError> {
    let project = app.projects.load_for(&project_id, &user)?;
    let updates = app.devices.take_updates(&project, &mac)?;
    Ok(Json(updates.into_iter().map(UpdateView::from).collect()))
}
