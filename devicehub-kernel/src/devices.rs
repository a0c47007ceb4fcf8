/**
 * DEVICES - Registre des devices, sessions et file d'updates
 *
 * RÔLE :
 * Cycle de vie complet d'un device d'un projet : enregistrement avec son
 * schéma de contrôles, session exclusive d'un utilisateur, soumission de lots
 * de valeurs (validés en bloc), puis livraison des updates au device.
 *
 * FONCTIONNEMENT :
 * - Enregistrement : MAC IEEE 802, schéma résolu en types de contrôles, état
 *   initial validé contre le schéma. Un device déjà connu est mis à jour.
 * - Soumission : sous le verrou du document device → autorisation de session
 *   → validation de tout le lot → nouvel état + Update (seq monotone)
 * - Livraison : updates non reçus du device triés par seq, acquittés jusqu'au
 *   dernier seq livré, `lastAccess` rafraîchi à chaque appel
 * - Expiration : tâche de fond qui retire les devices inactifs
 */

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::batch::{process_batch, BatchRejected};
use crate::controls::DataSchema;
use crate::error::ApiError;
use crate::events::{HubEvent, SharedEvents};
use crate::mac::{MacAddress, MAC_FORMAT_HINT};
use crate::models::{Device, Project, Update, User};
use crate::projects::adjust_device_count;
use crate::session::{SessionGrant, SessionPolicy};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub project_version: String,
    pub device_name: String,
    pub data_schema: Value,
    pub current_state: Value,
}

#[derive(Debug, Clone)]
pub enum Registration {
    Created(Device),
    Updated(Device),
}

impl Registration {
    pub fn device(&self) -> &Device {
        match self {
            Registration::Created(d) | Registration::Updated(d) => d,
        }
    }
}

pub struct DeviceRegistry {
    store: Arc<Store>,
    events: SharedEvents,
    policy: SessionPolicy,
    device_timeout: Duration,
}

pub type SharedDeviceRegistry = Arc<DeviceRegistry>;

impl DeviceRegistry {
    pub fn new(store: Arc<Store>, events: SharedEvents, policy: SessionPolicy, device_timeout: Duration) -> Self {
        Self { store, events, policy, device_timeout }
    }

    pub fn register(
        &self,
        project: &Project,
        mac: &str,
        input: DeviceRegistration,
    ) -> Result<Registration, ApiError> {
        let mac = MacAddress::parse(mac).map_err(|_| ApiError::Conflict(MAC_FORMAT_HINT.into()))?;
        let project_version = required(&input.project_version, "projectVersion")?;
        let device_name = required(&input.device_name, "deviceName")?;
        let data_schema = DataSchema::resolve(&input.data_schema)?;
        let current_state = data_schema.check_state(&input.current_state)?;
        let now = OffsetDateTime::now_utc();

        let existing = self.store.devices.modify_one(
            |d| d.mac_address == mac,
            |d| {
                let previous_project = d.project_id.clone();
                if previous_project != project.id {
                    // Changement de projet : la session de l'ancien projet tombe
                    d.session = None;
                    d.project_id = project.id.clone();
                }
                d.project_version = project_version.clone();
                d.device_name = device_name.clone();
                d.data_schema = data_schema.clone();
                d.current_state = current_state.clone();
                d.timestamp = now;
                d.last_access = now;
                Ok::<_, ApiError>((d.clone(), previous_project))
            },
        )?;

        let registration = match existing {
            Some((device, previous_project)) => {
                if previous_project != project.id {
                    adjust_device_count(&self.store, &previous_project, -1)?;
                    adjust_device_count(&self.store, &project.id, 1)?;
                }
                Registration::Updated(device)
            }
            None => {
                let device = Device {
                    id: Uuid::new_v4().to_string(),
                    project_id: project.id.clone(),
                    project_version,
                    mac_address: mac,
                    device_name,
                    data_schema,
                    current_state,
                    session: None,
                    last_access: now,
                    created_at: now,
                    timestamp: now,
                };
                self.store.devices.insert_unique(
                    device.clone(),
                    |d| d.mac_address == mac,
                    "A device with this MAC address is already registered",
                )?;
                adjust_device_count(&self.store, &project.id, 1)?;
                Registration::Created(device)
            }
        };

        let created = matches!(registration, Registration::Created(_));
        tracing::info!(mac = %mac, project = %project.id, created, "[devices] registered");
        self.events.publish(&HubEvent::DeviceRegistered { mac, project_id: project.id.clone(), created });
        Ok(registration)
    }

    /// Device de `project` ; une MAC mal formée ne peut correspondre à aucun device
    pub fn get(&self, project: &Project, mac: &str) -> Result<Device, ApiError> {
        let mac = MacAddress::parse(mac).map_err(|_| ApiError::device_not_found())?;
        self.store
            .devices
            .find_one(|d| d.mac_address == mac && d.project_id == project.id)
            .ok_or_else(ApiError::device_not_found)
    }

    pub fn get_by_id(&self, id: &str) -> Option<Device> {
        self.store.devices.get(id)
    }

    pub fn list(&self, project: &Project) -> Vec<Device> {
        self.store.devices.find(|d| d.project_id == project.id)
    }

    pub fn deregister(&self, project: &Project, mac: &str) -> Result<Device, ApiError> {
        let device = self.get(project, mac)?;
        self.store.devices.remove(|d| d.id == device.id)?;
        self.drop_pending_updates(device.mac_address)?;
        adjust_device_count(&self.store, &project.id, -1)?;
        tracing::info!(mac = %device.mac_address, project = %project.id, "[devices] deregistered");
        self.events.publish(&HubEvent::DeviceDeregistered {
            mac: device.mac_address,
            project_id: project.id.clone(),
        });
        Ok(device)
    }

    pub fn start_session(&self, project: &Project, mac: &str, user: &User) -> Result<Device, ApiError> {
        let device = self.get(project, mac)?;
        let now = OffsetDateTime::now_utc();
        let (device, grant) = self
            .store
            .devices
            .modify_one(
                |d| d.id == device.id,
                |d| {
                    let grant = self.policy.start(&mut d.session, &user.id, now)?;
                    d.last_access = now;
                    Ok::<_, ApiError>((d.clone(), grant))
                },
            )?
            .ok_or_else(ApiError::device_not_found)?;

        let mac = device.mac_address;
        match grant {
            SessionGrant::Started => {
                tracing::info!(mac = %mac, user = %user.id, "[devices] session started");
                self.events.publish(&HubEvent::SessionStarted { mac, user: user.id.clone() });
            }
            SessionGrant::TakenOver { previous } => {
                tracing::info!(mac = %mac, user = %user.id, previous = %previous, "[devices] expired session taken over");
                self.events.publish(&HubEvent::SessionEnded { mac, user: previous });
                self.events.publish(&HubEvent::SessionStarted { mac, user: user.id.clone() });
            }
            SessionGrant::Renewed => {
                tracing::debug!(mac = %mac, user = %user.id, "[devices] session renewed");
            }
        }
        Ok(device)
    }

    pub fn stop_session(&self, project: &Project, mac: &str, user: &User) -> Result<(), ApiError> {
        let device = self.get(project, mac)?;
        let ended = self
            .store
            .devices
            .modify_one(
                |d| d.id == device.id,
                |d| Ok::<_, ApiError>(self.policy.stop(&mut d.session, &user.id)?),
            )?
            .flatten();
        if let Some(session) = ended {
            tracing::info!(mac = %device.mac_address, user = %session.user, "[devices] session stopped");
            self.events.publish(&HubEvent::SessionEnded { mac: device.mac_address, user: session.user });
        }
        Ok(())
    }

    /// Retrait forcé de la session par un admin du projet
    pub fn revoke_session(&self, project: &Project, mac: &str, admin: &User) -> Result<(), ApiError> {
        if !project.is_admin(&admin.id) {
            return Err(ApiError::Unauthorized("Only project admins can revoke a session".into()));
        }
        let device = self.get(project, mac)?;
        let revoked = self
            .store
            .devices
            .modify_one(|d| d.id == device.id, |d| Ok::<_, StoreError>(self.policy.revoke(&mut d.session)))?
            .flatten();
        if let Some(session) = revoked {
            tracing::warn!(mac = %device.mac_address, user = %session.user, by = %admin.id, "[devices] session revoked");
            self.events.publish(&HubEvent::SessionRevoked {
                mac: device.mac_address,
                user: session.user,
                by: admin.id.clone(),
            });
        }
        Ok(())
    }

    /// Valide et applique un lot de valeurs, puis met l'update en file.
    /// Rien n'est écrit si le lot est refusé. L'update n'est enregistré
    /// qu'une fois le nouvel état du device écrit, et l'état est annulé si
    /// l'update ne peut pas l'être.
    pub fn queue_update(
        &self,
        project: &Project,
        mac: &str,
        user: &User,
        patch: &Value,
    ) -> Result<Update, ApiError> {
        let device = self.get(project, mac)?;
        let now = OffsetDateTime::now_utc();
        let update = self
            .store
            .devices
            .modify_one_then(
                |d| d.id == device.id,
                |d| {
                    self.policy.authorize(&mut d.session, &user.id, now)?;
                    let patch = patch.as_object().ok_or_else(|| BatchRejected {
                        reasons: vec!["the update body must map control names to values".into()],
                    })?;
                    let next_state = process_batch(&d.data_schema, &d.current_state, patch)?;
                    let update = Update {
                        id: Uuid::new_v4().to_string(),
                        seq: self.store.next_update_seq(),
                        target_mac_address: d.mac_address,
                        data: patch.clone(),
                        submitted_by: user.id.clone(),
                        timestamp: now,
                        received: false,
                    };
                    d.current_state = next_state;
                    d.timestamp = now;
                    Ok::<_, ApiError>(update)
                },
                |update| Ok(self.store.updates.save(update.clone())?),
            )?
            .ok_or_else(ApiError::device_not_found)?;

        tracing::info!(mac = %update.target_mac_address, seq = update.seq, user = %user.id, "[devices] update queued");
        self.events.publish(&HubEvent::UpdateQueued {
            mac: update.target_mac_address,
            seq: update.seq,
            user: user.id.clone(),
        });
        Ok(update)
    }

    /// Retourne les updates non reçus du device (ordre de seq) et les acquitte
    pub fn take_updates(&self, project: &Project, mac: &str) -> Result<Vec<Update>, ApiError> {
        let device = self.get(project, mac)?;
        let mac = device.mac_address;

        let mut pending = self.store.updates.find(|u| u.target_mac_address == mac && !u.received);
        pending.sort_by_key(|u| u.seq);

        if let Some(last_seq) = pending.last().map(|u| u.seq) {
            self.store.updates.update_many(
                |u| u.target_mac_address == mac && !u.received && u.seq <= last_seq,
                |u| u.received = true,
            )?;
            tracing::debug!(mac = %mac, count = pending.len(), last_seq, "[devices] updates delivered");
            self.events.publish(&HubEvent::UpdatesDelivered { mac, count: pending.len(), last_seq });
        }

        // Chaque interrogation compte comme une activité du device
        let now = OffsetDateTime::now_utc();
        self.store.devices.modify_one(
            |d| d.id == device.id,
            |d| {
                d.last_access = now;
                Ok::<_, StoreError>(())
            },
        )?;
        Ok(pending)
    }

    /// Retire les devices dont le dernier accès est plus vieux que le timeout
    pub fn expire_stale(&self, now: OffsetDateTime) -> Result<Vec<Device>, StoreError> {
        let Some(cutoff) = now.checked_sub(self.device_timeout) else {
            return Ok(Vec::new());
        };
        let expired = self.store.devices.remove(|d| d.last_access < cutoff)?;
        for device in &expired {
            self.drop_pending_updates(device.mac_address)?;
            adjust_device_count(&self.store, &device.project_id, -1)?;
            tracing::info!(
                mac = %device.mac_address,
                project = %device.project_id,
                "[devices] expired (last access {})",
                device.last_access
            );
            self.events.publish(&HubEvent::DeviceExpired {
                mac: device.mac_address,
                project_id: device.project_id.clone(),
            });
        }
        Ok(expired)
    }

    /// Vide le registre : plus aucun device, plus aucune update en attente
    pub fn reset(&self) -> Result<(), StoreError> {
        let removed = self.store.devices.remove(|_| true)?;
        self.store.updates.update_many(|u| !u.received, |u| u.received = true)?;
        self.store.projects.update_many(|p| p.device_count > 0, |p| p.device_count = 0)?;
        tracing::warn!("[devices] reset, {} devices removed", removed.len());
        Ok(())
    }

    pub fn start_expiry_monitoring(registry: SharedDeviceRegistry, every: std::time::Duration) {
        tracing::info!(
            "[devices] starting expiry monitoring (timeout: {}s, sweep: {}s)",
            registry.device_timeout.whole_seconds(),
            every.as_secs()
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = registry.expire_stale(OffsetDateTime::now_utc()) {
                    tracing::error!("[devices] expiry sweep failed: {e}");
                }
            }
        });
    }

    fn drop_pending_updates(&self, mac: MacAddress) -> Result<usize, StoreError> {
        self.store
            .updates
            .update_many(|u| u.target_mac_address == mac && !u.received, |u| u.received = true)
    }
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::Conflict(format!("{field} is required")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemoryEvents;
    use crate::projects::{NewProject, ProjectRegistry};
    use crate::session::SessionError;
    use serde_json::json;

    const MAC: &str = "01-23-45-67-89-ab";

    struct Fixture {
        store: Arc<Store>,
        events: Arc<MemoryEvents>,
        devices: DeviceRegistry,
        project: Project,
        alice: User,
        bob: User,
    }

    fn user(email: &str) -> User {
        User {
            id: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            api_key: format!("key-{email}"),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn fixture() -> Fixture {
        fixture_on(Arc::new(Store::in_memory()))
    }

    fn fixture_on(store: Arc<Store>) -> Fixture {
        let events = Arc::new(MemoryEvents::new());
        let alice = user("alice@x.io");
        let bob = user("bob@x.io");
        let project = ProjectRegistry::new(store.clone())
            .create(
                NewProject {
                    name: "Greenhouse".into(),
                    description: None,
                    admins: vec![],
                    users: vec![bob.id.clone()],
                },
                &alice,
            )
            .unwrap();
        let devices = DeviceRegistry::new(
            store.clone(),
            events.clone(),
            SessionPolicy::new(Some(Duration::minutes(10))),
            Duration::hours(1),
        );
        Fixture { store, events, devices, project, alice, bob }
    }

    fn registration() -> DeviceRegistration {
        DeviceRegistration {
            project_version: "1.0".into(),
            device_name: "fan".into(),
            data_schema: json!({
                "speed": {"type": "numeric", "min": 0, "max": 100},
                "led": {"type": "color", "lockedValues": {"a": true}}
            }),
            current_state: json!({"speed": 10, "led": {"r": 10, "g": 10, "b": 10, "a": 255}}),
        }
    }

    #[test]
    fn test_register_then_reregister() {
        let f = fixture();
        let first = f.devices.register(&f.project, MAC, registration()).unwrap();
        assert!(matches!(first, Registration::Created(_)));
        let again = f.devices.register(&f.project, "01:23:45:67:89:AB", registration()).unwrap();
        assert!(matches!(again, Registration::Updated(_)));
        assert_eq!(again.device().id, first.device().id);
        assert_eq!(f.store.devices.len(), 1);
        assert_eq!(f.store.projects.get(&f.project.id).unwrap().device_count, 1);
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let f = fixture();
        let err = f.devices.register(&f.project, "01-23-45", registration()).unwrap_err();
        assert_eq!(err.to_string(), MAC_FORMAT_HINT);

        let mut unknown_type = registration();
        unknown_type.data_schema = json!({"speed": {"type": "dimmer"}});
        assert!(matches!(f.devices.register(&f.project, MAC, unknown_type), Err(ApiError::Conflict(_))));

        let mut bad_state = registration();
        bad_state.current_state = json!({"speed": 500, "led": {"r": 1, "g": 1, "b": 1, "a": 1}});
        assert!(matches!(f.devices.register(&f.project, MAC, bad_state), Err(ApiError::Conflict(_))));
        assert!(f.store.devices.is_empty());
    }

    #[test]
    fn test_rejected_batch_leaves_state_untouched() {
        let f = fixture();
        f.devices.register(&f.project, MAC, registration()).unwrap();
        f.devices.start_session(&f.project, MAC, &f.alice).unwrap();

        let err = f.devices.queue_update(&f.project, MAC, &f.alice, &json!({"speed": 150})).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(f.devices.get(&f.project, MAC).unwrap().current_state["speed"], json!(10));
        assert!(f.store.updates.is_empty());

        let update = f.devices.queue_update(&f.project, MAC, &f.alice, &json!({"speed": 50})).unwrap();
        assert!(!update.received);
        assert_eq!(f.devices.get(&f.project, MAC).unwrap().current_state["speed"], json!(50));
        assert_eq!(f.store.updates.count(|u| !u.received), 1);
    }

    #[test]
    fn test_only_session_holder_submits() {
        let f = fixture();
        f.devices.register(&f.project, MAC, registration()).unwrap();
        let err = f.devices.queue_update(&f.project, MAC, &f.alice, &json!({"speed": 50})).unwrap_err();
        assert_eq!(err.to_string(), SessionError::NotHolder.to_string());

        f.devices.start_session(&f.project, MAC, &f.alice).unwrap();
        let conflict = f.devices.start_session(&f.project, MAC, &f.bob).unwrap_err();
        assert!(matches!(conflict, ApiError::Conflict(_)));
        assert_eq!(f.devices.get(&f.project, MAC).unwrap().session_user(), Some("alice@x.io"));
        assert!(matches!(
            f.devices.queue_update(&f.project, MAC, &f.bob, &json!({"speed": 50})),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(f.devices.stop_session(&f.project, MAC, &f.bob), Err(ApiError::Unauthorized(_))));
        f.devices.stop_session(&f.project, MAC, &f.alice).unwrap();
        assert!(f.devices.get(&f.project, MAC).unwrap().session.is_none());
    }

    #[test]
    fn test_revoke_requires_admin() {
        let f = fixture();
        f.devices.register(&f.project, MAC, registration()).unwrap();
        f.devices.start_session(&f.project, MAC, &f.bob).unwrap();
        assert!(matches!(
            f.devices.revoke_session(&f.project, MAC, &f.bob),
            Err(ApiError::Unauthorized(_))
        ));
        f.devices.revoke_session(&f.project, MAC, &f.alice).unwrap();
        assert!(f.devices.start_session(&f.project, MAC, &f.alice).is_ok());
        assert!(f
            .events
            .snapshot()
            .iter()
            .any(|e| matches!(e, HubEvent::SessionRevoked { by, .. } if by == "alice@x.io")));
    }

    #[test]
    fn test_delivery_is_ordered_and_acknowledged_once() {
        let f = fixture();
        f.devices.register(&f.project, MAC, registration()).unwrap();
        f.devices.start_session(&f.project, MAC, &f.alice).unwrap();
        for speed in [20, 30, 40] {
            f.devices.queue_update(&f.project, MAC, &f.alice, &json!({"speed": speed})).unwrap();
        }
        let delivered = f.devices.take_updates(&f.project, MAC).unwrap();
        let speeds: Vec<_> = delivered.iter().map(|u| u.data["speed"].clone()).collect();
        assert_eq!(speeds, vec![json!(20), json!(30), json!(40)]);
        assert!(delivered.windows(2).all(|w| w[0].seq < w[1].seq));
        assert!(f.devices.take_updates(&f.project, MAC).unwrap().is_empty());
    }

    #[test]
    fn test_acknowledgement_is_scoped_to_device() {
        let f = fixture();
        let other = "aa-bb-cc-dd-ee-ff";
        f.devices.register(&f.project, MAC, registration()).unwrap();
        f.devices.register(&f.project, other, registration()).unwrap();
        f.devices.start_session(&f.project, MAC, &f.alice).unwrap();
        f.devices.start_session(&f.project, other, &f.alice).unwrap();
        f.devices.queue_update(&f.project, MAC, &f.alice, &json!({"speed": 20})).unwrap();
        f.devices.queue_update(&f.project, other, &f.alice, &json!({"speed": 30})).unwrap();

        assert_eq!(f.devices.take_updates(&f.project, MAC).unwrap().len(), 1);
        assert_eq!(f.devices.take_updates(&f.project, other).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_fetch_refreshes_last_access() {
        let f = fixture();
        f.devices.register(&f.project, MAC, registration()).unwrap();
        let old = OffsetDateTime::now_utc() - Duration::hours(2);
        f.store
            .devices
            .modify_one(|_| true, |d| {
                d.last_access = old;
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert!(f.devices.take_updates(&f.project, MAC).unwrap().is_empty());
        assert!(f.devices.get(&f.project, MAC).unwrap().last_access > old);
        assert!(f.devices.expire_stale(OffsetDateTime::now_utc()).unwrap().is_empty());
    }

    #[test]
    fn test_expiry_removes_idle_devices() {
        let f = fixture();
        f.devices.register(&f.project, MAC, registration()).unwrap();
        let later = OffsetDateTime::now_utc() + Duration::hours(2);
        let expired = f.devices.expire_stale(later).unwrap();
        assert_eq!(expired.len(), 1);
        assert!(f.store.devices.is_empty());
        assert_eq!(f.store.projects.get(&f.project.id).unwrap().device_count, 0);
        assert!(f.events.snapshot().iter().any(|e| matches!(e, HubEvent::DeviceExpired { .. })));
    }

    #[test]
    fn test_timeout_beyond_the_calendar_expires_nothing() {
        let f = fixture();
        let devices = DeviceRegistry::new(
            f.store.clone(),
            f.events.clone(),
            SessionPolicy::new(None),
            Duration::MAX,
        );
        devices.register(&f.project, MAC, registration()).unwrap();
        assert!(devices.expire_stale(OffsetDateTime::now_utc()).unwrap().is_empty());
        assert_eq!(f.store.devices.len(), 1);
    }

    /// Remplace un fichier de collection par un répertoire : toute écriture échoue
    fn break_collection_file(dir: &std::path::Path, collection: &str) {
        let path = dir.join(format!("{collection}.json"));
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
    }

    #[test]
    fn test_update_write_failure_rolls_back_state() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture_on(Arc::new(Store::open(dir.path()).unwrap()));
        f.devices.register(&f.project, MAC, registration()).unwrap();
        f.devices.start_session(&f.project, MAC, &f.alice).unwrap();
        let devices_on_disk = std::fs::read_to_string(dir.path().join("devices.json")).unwrap();
        break_collection_file(dir.path(), "updates");

        let err = f.devices.queue_update(&f.project, MAC, &f.alice, &json!({"speed": 50})).unwrap_err();
        assert!(matches!(err, ApiError::Store(_)));
        assert_eq!(f.devices.get(&f.project, MAC).unwrap().current_state["speed"], json!(10));
        assert_eq!(std::fs::read_to_string(dir.path().join("devices.json")).unwrap(), devices_on_disk);
        assert!(f.store.updates.is_empty());
    }

    #[test]
    fn test_device_write_failure_queues_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture_on(Arc::new(Store::open(dir.path()).unwrap()));
        f.devices.register(&f.project, MAC, registration()).unwrap();
        f.devices.start_session(&f.project, MAC, &f.alice).unwrap();
        break_collection_file(dir.path(), "devices");

        let err = f.devices.queue_update(&f.project, MAC, &f.alice, &json!({"speed": 50})).unwrap_err();
        assert!(matches!(err, ApiError::Store(_)));
        assert_eq!(f.devices.get(&f.project, MAC).unwrap().current_state["speed"], json!(10));
        assert!(f.store.updates.is_empty());
        assert!(!f.events.snapshot().iter().any(|e| matches!(e, HubEvent::UpdateQueued { .. })));
    }
}
