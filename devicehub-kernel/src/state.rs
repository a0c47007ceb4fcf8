use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::KernelConfig;
use crate::devices::{DeviceRegistry, SharedDeviceRegistry};
use crate::events::SharedEvents;
use crate::health::HealthTracker;
use crate::profiles::ProfileBook;
use crate::projects::ProjectRegistry;
use crate::session::SessionPolicy;
use crate::store::Store;
use crate::users::UserDirectory;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// État unique partagé par toutes les routes Axum
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub users: UserDirectory,
    pub projects: ProjectRegistry,
    pub devices: SharedDeviceRegistry,
    pub profiles: ProfileBook,
    pub health_tracker: HealthTracker,
    pub cfg: Shared<KernelConfig>,
}

impl AppState {
    pub fn new(cfg: KernelConfig, store: Arc<Store>, events: SharedEvents, health_tracker: HealthTracker) -> Self {
        let devices = DeviceRegistry::new(
            store.clone(),
            events,
            SessionPolicy::new(cfg.session_lease()),
            cfg.device_timeout(),
        );
        Self {
            users: UserDirectory::new(store.clone()),
            projects: ProjectRegistry::new(store.clone()),
            devices: Arc::new(devices),
            profiles: ProfileBook::new(store.clone()),
            store,
            health_tracker,
            cfg: new_state(cfg),
        }
    }
}
