//! DeviceHub kernel : projets, devices pilotés à distance et leurs profils.

pub mod batch;
pub mod config;
pub mod controls;
pub mod devices;
pub mod error;
pub mod events;
pub mod health;
pub mod http;
pub mod mac;
pub mod models;
pub mod profiles;
pub mod projects;
pub mod query;
pub mod session;
pub mod state;
pub mod store;
pub mod users;
pub mod validators;
