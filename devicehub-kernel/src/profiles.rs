use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Profile, Project, User};
use crate::session::{is_holder, SessionError};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    #[serde(default)]
    pub profile_name: String,
}

/// Instantanés nommés de l'état des devices d'un projet
#[derive(Clone)]
pub struct ProfileBook {
    store: Arc<Store>,
}

impl ProfileBook {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Enregistre un profil pour le device `device_id`, réservé au détenteur de sa session
    pub fn save(
        &self,
        project: &Project,
        device_id: Option<&str>,
        user: &User,
        input: NewProfile,
    ) -> Result<Profile, ApiError> {
        let device_id = device_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Conflict("A deviceId query parameter is required".into()))?;
        let device = self
            .store
            .devices
            .get(device_id)
            .filter(|d| d.project_id == project.id)
            .ok_or_else(|| ApiError::Conflict("Device not found".into()))?;
        if !is_holder(&device.session, &user.id) {
            return Err(SessionError::NotHolder.into());
        }
        let profile_name = input.profile_name.trim().to_string();
        if profile_name.is_empty() {
            return Err(ApiError::Conflict("Profile name is required".into()));
        }

        let now = OffsetDateTime::now_utc();
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            project_version: device.project_version.clone(),
            profile_name,
            profile_data: Value::Object(device.current_state),
            owner: user.id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.store.profiles.save(profile.clone())?;
        tracing::info!(profile = %profile.id, project = %project.id, user = %user.id, "[profiles] saved '{}'", profile.profile_name);
        Ok(profile)
    }

    pub fn get(&self, project: &Project, id: &str) -> Result<Profile, ApiError> {
        // Un identifiant qui n'est pas un UUID ne peut désigner aucun profil
        Uuid::parse_str(id).map_err(|_| profile_not_found())?;
        self.store
            .profiles
            .find_one(|p| p.id == id && p.project_id == project.id)
            .ok_or_else(profile_not_found)
    }

    pub fn list(&self, project: &Project, project_version: Option<&str>) -> Vec<Profile> {
        self.store.profiles.find(|p| {
            p.project_id == project.id && project_version.map(|v| p.project_version == v).unwrap_or(true)
        })
    }

    /// Suppression par le propriétaire du profil ou un admin du projet
    pub fn delete(&self, project: &Project, id: &str, user: &User) -> Result<(), ApiError> {
        let profile = self.get(project, id)?;
        if profile.owner != user.id && !project.is_admin(&user.id) {
            return Err(ApiError::Unauthorized(
                "Only the owner or a project admin can delete this profile".into(),
            ));
        }
        self.store.profiles.remove(|p| p.id == profile.id)?;
        tracing::info!(profile = %profile.id, user = %user.id, "[profiles] deleted");
        Ok(())
    }

    pub fn reset(&self) -> Result<usize, StoreError> {
        let removed = self.store.profiles.remove(|_| true)?;
        tracing::warn!("[profiles] reset, {} profiles removed", removed.len());
        Ok(removed.len())
    }
}

fn profile_not_found() -> ApiError {
    ApiError::NotFound("Profile not found".into())
}
