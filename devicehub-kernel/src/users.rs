use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::SeedUser;
use crate::error::ApiError;
use crate::models::User;
use crate::store::{Store, StoreError};
use crate::validators::{validate_email, validate_name};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Vue publique d'un utilisateur, sans sa clé d'API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<Store>,
}

impl UserDirectory {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn register(&self, input: NewUser) -> Result<User, ApiError> {
        let email = input.email.trim().to_lowercase();
        validate_email(&email).map_err(ApiError::Conflict)?;
        validate_name("firstName", input.first_name.trim()).map_err(ApiError::Conflict)?;
        validate_name("lastName", input.last_name.trim()).map_err(ApiError::Conflict)?;

        let user = User {
            id: email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            api_key: Uuid::new_v4().to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.store
            .users
            .insert_unique(user.clone(), |_| false, "A user with this email already exists")?;
        tracing::info!(user = %user.id, "[users] registered");
        Ok(user)
    }

    pub fn authenticate(&self, api_key: &str) -> Option<User> {
        if api_key.is_empty() {
            return None;
        }
        self.store.users.find_one(|u| u.api_key == api_key)
    }

    pub fn get(&self, id: &str) -> Result<User, ApiError> {
        self.store
            .users
            .get(&id.to_lowercase())
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    pub fn list(&self) -> Vec<User> {
        self.store.users.all()
    }

    /// Un utilisateur ne peut supprimer que son propre compte
    pub fn delete(&self, id: &str, caller: &User) -> Result<(), ApiError> {
        let id = id.to_lowercase();
        let target = self.get(&id)?;
        if target.id != caller.id {
            return Err(ApiError::Unauthorized("You can only delete your own account".into()));
        }
        self.store.users.remove(|u| u.id == id)?;
        // L'utilisateur disparaît des listes de membres ; les projets dont il
        // était le dernier admin gardent leur liste d'admins intacte
        self.store.projects.update_many(
            |p| p.users.contains(&id),
            |p| p.users.retain(|u| *u != id),
        )?;
        tracing::info!(user = %id, "[users] deleted");
        Ok(())
    }

    /// Crée les utilisateurs de la config qui n'existent pas encore
    pub fn seed(&self, seeds: &[SeedUser]) -> Result<usize, StoreError> {
        let mut created = 0;
        for seed in seeds {
            let email = seed.email.trim().to_lowercase();
            if let Err(reason) = validate_email(&email) {
                tracing::warn!("[users] seed user skipped: {reason}");
                continue;
            }
            let user = User {
                id: email,
                first_name: seed.first_name.clone(),
                last_name: seed.last_name.clone(),
                api_key: seed.api_key.clone(),
                created_at: OffsetDateTime::now_utc(),
            };
            match self.store.users.insert_unique(user, |u| u.api_key == seed.api_key, "seed") {
                Ok(()) => created += 1,
                Err(StoreError::Duplicate(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if created > 0 {
            tracing::info!("[users] seeded {created} users");
        }
        Ok(created)
    }
}
