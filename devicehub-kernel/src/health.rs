use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;

use crate::store::Store;

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub projects_tracked: u32,
    pub devices_tracked: u32,
    pub active_sessions: u32,
    pub pending_updates: u32,
    pub memory_usage_mb: f32,
    pub event_bus_status: String,
    pub event_bus_reconnects: u32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    bus_reconnects: Arc<AtomicU32>,
    bus_status: Arc<Mutex<String>>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            bus_reconnects: Arc::new(AtomicU32::new(0)),
            bus_status: Arc::new(Mutex::new("disabled".to_string())),
        }
    }

    pub fn mark_bus_connecting(&self) {
        *self.bus_status.lock() = "connecting".to_string();
    }

    pub fn mark_bus_connected(&self) {
        *self.bus_status.lock() = "connected".to_string();
    }

    pub fn increment_reconnects(&self) {
        self.bus_reconnects.fetch_add(1, Ordering::Relaxed);
        *self.bus_status.lock() = "reconnecting".to_string();
    }

    pub fn bus_status(&self) -> String {
        self.bus_status.lock().clone()
    }

    pub fn get_health(&self, store: &Store) -> KernelHealth {
        let now = OffsetDateTime::now_utc();
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            projects_tracked: store.projects.len() as u32,
            devices_tracked: store.devices.len() as u32,
            active_sessions: store
                .devices
                .count(|d| d.session.as_ref().map(|s| !s.is_expired(now)).unwrap_or(false))
                as u32,
            pending_updates: store.updates.count(|u| !u.received) as u32,
            memory_usage_mb: get_memory_usage_mb(),
            event_bus_status: self.bus_status(),
            event_bus_reconnects: self.bus_reconnects.load(Ordering::Relaxed),
        }
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return kb as f32 / 1024.0;
            }
        }
    }
    0.0
}
