use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct KernelConfig {
    pub listen: String,
    pub data_dir: Option<PathBuf>,
    pub device_timeout_seconds: u64,
    /// `null` : les sessions n'expirent jamais
    pub session_lease_seconds: Option<u64>,
    pub expiry_sweep_seconds: u64,
    pub enable_test_exts: bool,
    pub mqtt: Option<MqttConf>,
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MqttConf {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
}

/// Utilisateur créé au démarrage s'il n'existe pas encore
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SeedUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub api_key: String,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_topic_prefix() -> String {
    "devicehub".into()
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".into(),
            data_dir: None,
            device_timeout_seconds: 3600,
            session_lease_seconds: Some(600),
            expiry_sweep_seconds: 60,
            enable_test_exts: false,
            mqtt: None,
            users: Vec::new(),
        }
    }
}

impl KernelConfig {
    pub fn device_timeout(&self) -> Duration {
        clamped_seconds(self.device_timeout_seconds)
    }

    pub fn session_lease(&self) -> Option<Duration> {
        self.session_lease_seconds.map(clamped_seconds)
    }

    pub fn expiry_sweep(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expiry_sweep_seconds.max(1))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(listen) = std::env::var("DEVICEHUB_LISTEN") {
            if !listen.trim().is_empty() {
                self.listen = listen;
            }
        }
        if let Ok(dir) = std::env::var("DEVICEHUB_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }
    }
}

/// Charge la config depuis `DEVICEHUB_CONFIG` (défaut `kernel.yaml`) puis
/// applique les surcharges d'environnement
/// Au-delà d'un siècle une durée ne change plus rien ; l'horloge, elle, déborderait
const MAX_DURATION_SECONDS: u64 = 100 * 365 * 24 * 3600;

fn clamped_seconds(seconds: u64) -> Duration {
    Duration::seconds(i64::try_from(seconds.min(MAX_DURATION_SECONDS)).unwrap_or(i64::MAX))
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("DEVICEHUB_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    let mut cfg = load_config_from(Path::new(&path)).await;
    cfg.apply_env_overrides();
    cfg
}

/// Fichier absent, vide ou invalide → config par défaut
pub async fn load_config_from(path: &Path) -> KernelConfig {
    if !path.exists() {
        tracing::info!("[config] no {:?}, using defaults", path);
        return KernelConfig::default();
    }
    let txt = tokio::fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }
    serde_yaml::from_str(&txt).unwrap_or_else(|e| {
        tracing::warn!("[config] invalid {:?}: {e}", path);
        KernelConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.yaml")).await;
        assert_eq!(cfg, KernelConfig::default());
        assert_eq!(cfg.session_lease(), Some(Duration::minutes(10)));
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kernel.yaml");
        std::fs::write(
            &path,
            "listen: 127.0.0.1:4000\nsession_lease_seconds: null\nmqtt:\n  host: broker\nusers:\n  - email: a@x.io\n    first_name: Alice\n    last_name: Martin\n    api_key: key-a\n",
        )
        .unwrap();
        let cfg = load_config_from(&path).await;
        assert_eq!(cfg.listen, "127.0.0.1:4000");
        assert_eq!(cfg.session_lease(), None);
        assert_eq!(cfg.device_timeout_seconds, 3600);
        let mqtt = cfg.mqtt.unwrap();
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.topic_prefix, "devicehub");
        assert_eq!(cfg.users.len(), 1);
    }

    #[test]
    fn test_huge_durations_are_clamped() {
        let cfg = KernelConfig {
            device_timeout_seconds: u64::MAX,
            session_lease_seconds: Some(u64::MAX),
            ..KernelConfig::default()
        };
        let ceiling = Duration::seconds(MAX_DURATION_SECONDS as i64);
        assert_eq!(cfg.device_timeout(), ceiling);
        assert_eq!(cfg.session_lease(), Some(ceiling));
        assert!(cfg.device_timeout().is_positive());
    }

    #[tokio::test]
    async fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kernel.yaml");
        std::fs::write(&path, "listen: [not, a, string").unwrap();
        assert_eq!(load_config_from(&path).await, KernelConfig::default());
    }
}
