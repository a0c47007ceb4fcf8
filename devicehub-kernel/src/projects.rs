/**
 * PROJECTS - Espaces de travail regroupant devices et profils
 *
 * RÔLE :
 * Un projet a des admins et des membres (e-mails). Toute route sous
 * `/projects/{id}` passe d'abord par `load_for` : projet absent → 404,
 * appelant ni admin ni membre → 401.
 *
 * RÈGLES :
 * - le créateur devient admin
 * - nom unique sans tenir compte de la casse (`sortingName` = nom en majuscules)
 * - modification / suppression réservées aux admins, il reste toujours un admin
 * - `deviceCount` est tenu à jour par le registre des devices
 */

use serde::Deserialize;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Project, User};
use crate::store::{Store, StoreError};
use crate::validators::{validate_description, validate_email, validate_project_name};

const DUPLICATE_NAME: &str = "A project with this name already exists";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub admins: Option<Vec<String>>,
    pub users: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct ProjectRegistry {
    store: Arc<Store>,
}

impl ProjectRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, input: NewProject, creator: &User) -> Result<Project, ApiError> {
        let name = input.name.trim().to_string();
        validate_project_name(&name).map_err(ApiError::Conflict)?;
        let description = clean_description(input.description)?;

        let mut admins = normalize_members(input.admins)?;
        if !admins.contains(&creator.id) {
            admins.insert(0, creator.id.clone());
        }
        let mut users = normalize_members(input.users)?;
        users.retain(|u| !admins.contains(u));

        let now = OffsetDateTime::now_utc();
        let sorting_name = name.to_uppercase();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name,
            sorting_name: sorting_name.clone(),
            description,
            admins,
            users,
            device_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store
            .projects
            .insert_unique(project.clone(), |p| p.sorting_name == sorting_name, DUPLICATE_NAME)?;
        tracing::info!(project = %project.id, user = %creator.id, "[projects] created '{}'", project.name);
        Ok(project)
    }

    /// Projet visible par `user` : 404 s'il n'existe pas, 401 s'il n'en est pas membre
    pub fn load_for(&self, id: &str, user: &User) -> Result<Project, ApiError> {
        let project = self.store.projects.get(id).ok_or_else(ApiError::project_not_found)?;
        if !project.is_member(&user.id) {
            return Err(ApiError::Unauthorized("You are not a member of this project".into()));
        }
        Ok(project)
    }

    pub fn list_for(&self, user: &User) -> Vec<Project> {
        self.store.projects.find(|p| p.is_member(&user.id))
    }

    pub fn update(&self, id: &str, user: &User, changes: ProjectChanges) -> Result<Project, ApiError> {
        let project = self.load_for(id, user)?;
        require_admin(&project, user, "Only project admins can modify this project")?;

        let name = match changes.name {
            Some(name) => {
                let name = name.trim().to_string();
                validate_project_name(&name).map_err(ApiError::Conflict)?;
                let sorting_name = name.to_uppercase();
                let taken = self
                    .store
                    .projects
                    .find_one(|p| p.sorting_name == sorting_name && p.id != project.id)
                    .is_some();
                if taken {
                    return Err(ApiError::Conflict(DUPLICATE_NAME.into()));
                }
                Some(name)
            }
            None => None,
        };
        let description = match changes.description {
            Some(description) => Some(clean_description(Some(description))?),
            None => None,
        };
        let admins = changes.admins.map(normalize_members).transpose()?;
        if admins.as_ref().map(Vec::is_empty).unwrap_or(false) {
            return Err(ApiError::Conflict("A project needs at least one admin".into()));
        }
        let users = changes.users.map(normalize_members).transpose()?;

        let updated = self
            .store
            .projects
            .modify_one(
                |p| p.id == project.id,
                |p| {
                    if let Some(name) = name {
                        p.sorting_name = name.to_uppercase();
                        p.name = name;
                    }
                    if let Some(description) = description {
                        p.description = description;
                    }
                    if let Some(admins) = admins {
                        p.admins = admins;
                    }
                    if let Some(users) = users {
                        p.users = users;
                    }
                    let admins = p.admins.clone();
                    p.users.retain(|u| !admins.contains(u));
                    p.updated_at = OffsetDateTime::now_utc();
                    Ok::<_, ApiError>(p.clone())
                },
            )?
            .ok_or_else(ApiError::project_not_found)?;
        tracing::info!(project = %updated.id, user = %user.id, "[projects] updated");
        Ok(updated)
    }

    /// Supprime le projet avec ses devices, leurs updates en attente et ses profils
    pub fn delete(&self, id: &str, user: &User) -> Result<(), ApiError> {
        let project = self.load_for(id, user)?;
        require_admin(&project, user, "Only project admins can delete this project")?;

        let devices = self.store.devices.remove(|d| d.project_id == project.id)?;
        let macs: Vec<_> = devices.iter().map(|d| d.mac_address).collect();
        self.store
            .updates
            .update_many(|u| !u.received && macs.contains(&u.target_mac_address), |u| u.received = true)?;
        let profiles = self.store.profiles.remove(|p| p.project_id == project.id)?;
        self.store.projects.remove(|p| p.id == project.id)?;
        tracing::info!(
            project = %project.id,
            user = %user.id,
            "[projects] deleted with {} devices and {} profiles",
            devices.len(),
            profiles.len()
        );
        Ok(())
    }
}

/// Ajuste `deviceCount` d'un projet ; sans effet si le projet n'existe plus
pub(crate) fn adjust_device_count(store: &Store, project_id: &str, delta: i64) -> Result<(), StoreError> {
    store.projects.modify_one(
        |p| p.id == project_id,
        |p| {
            let count = (i64::from(p.device_count) + delta).max(0);
            p.device_count = u32::try_from(count).unwrap_or(u32::MAX);
            Ok::<_, StoreError>(())
        },
    )?;
    Ok(())
}

fn require_admin(project: &Project, user: &User, message: &str) -> Result<(), ApiError> {
    if project.is_admin(&user.id) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(message.into()))
    }
}

fn clean_description(description: Option<String>) -> Result<Option<String>, ApiError> {
    let description = description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
    if let Some(d) = &description {
        validate_description(d).map_err(ApiError::Conflict)?;
    }
    Ok(description)
}

fn normalize_members(members: Vec<String>) -> Result<Vec<String>, ApiError> {
    let mut out: Vec<String> = Vec::with_capacity(members.len());
    for member in members {
        let email = member.trim().to_lowercase();
        validate_email(&email).map_err(ApiError::Conflict)?;
        if !out.contains(&email) {
            out.push(email);
        }
    }
    Ok(out)
}
