//! Persisted state: `modes.json` and `agents.yaml`, plus the
//! `~/.dagctl` directory layout both live under.

pub mod config;
pub mod modes;
pub mod paths;

pub use config::{AppConfig, ConfigLoader, ServerConfig};
pub use modes::ModesStore;
