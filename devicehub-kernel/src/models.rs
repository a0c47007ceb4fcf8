use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::controls::{ControlState, DataSchema};
use crate::mac::MacAddress;
use crate::session::DeviceSession;
use crate::store::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// L'email sert d'identifiant
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub api_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub sorting_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub admins: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub device_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Project {
    pub fn is_admin(&self, user: &str) -> bool {
        self.admins.iter().any(|a| a == user)
    }

    pub fn is_member(&self, user: &str) -> bool {
        self.is_admin(user) || self.users.iter().any(|u| u == user)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "_id")]
    pub id: String,
    pub project_id: String,
    pub project_version: String,
    pub mac_address: MacAddress,
    pub device_name: String,
    pub data_schema: DataSchema,
    pub current_state: ControlState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<DeviceSession>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_access: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Device {
    pub fn session_user(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.as_str())
    }
}

/// Lot de valeurs accepté et mis en file pour le device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: u64,
    pub target_mac_address: MacAddress,
    pub data: ControlState,
    pub submitted_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub received: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    pub project_id: String,
    pub project_version: String,
    pub profile_name: String,
    pub profile_data: Value,
    pub owner: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for Project {
    const COLLECTION: &'static str = "projects";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for Device {
    const COLLECTION: &'static str = "devices";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for Update {
    const COLLECTION: &'static str = "updates";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for Profile {
    const COLLECTION: &'static str = "profiles";
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_device_wire_shape() {
        let device = Device {
            id: "d1".into(),
            project_id: "p1".into(),
            project_version: "1.0".into(),
            mac_address: MacAddress::parse("01:23:45:67:89:AB").unwrap(),
            device_name: "fan".into(),
            data_schema: DataSchema::default(),
            current_state: ControlState::new(),
            session: None,
            last_access: datetime!(2024-05-01 12:00 UTC),
            created_at: datetime!(2024-05-01 12:00 UTC),
            timestamp: datetime!(2024-05-01 12:00 UTC),
        };
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["_id"], json!("d1"));
        assert_eq!(value["macAddress"], json!("01-23-45-67-89-ab"));
        assert_eq!(value["lastAccess"], json!("2024-05-01T12:00:00Z"));
        assert!(value.get("session").is_none());
        let back: Device = serde_json::from_value(value).unwrap();
        assert_eq!(back, device);
    }

    #[test]
    fn test_project_membership() {
        let project = Project {
            id: "p".into(),
            name: "Demo".into(),
            sorting_name: "DEMO".into(),
            description: None,
            admins: vec!["a@x.io".into()],
            users: vec!["b@x.io".into()],
            device_count: 0,
            created_at: datetime!(2024-05-01 12:00 UTC),
            updated_at: datetime!(2024-05-01 12:00 UTC),
        };
        assert!(project.is_admin("a@x.io"));
        assert!(project.is_member("a@x.io"));
        assert!(project.is_member("b@x.io"));
        assert!(!project.is_admin("b@x.io"));
        assert!(!project.is_member("c@x.io"));
    }
}
