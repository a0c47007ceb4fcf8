use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::error::ApiError;
use crate::health::KernelHealth;
use crate::state::AppState;

// GET /system/health (état du kernel)
pub(super) async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.store))
}

// POST /test/device_api/reset
pub(super) async fn reset_devices(State(app): State<AppState>) -> Result<StatusCode, ApiError> {
    app.devices.reset()?;
    Ok(StatusCode::OK)
}

// POST /test/profile_api/reset
pub(super) async fn reset_profiles(State(app): State<AppState>) -> Result<StatusCode, ApiError> {
    app.profiles.reset()?;
    Ok(StatusCode::OK)
}
