//! Persistence for [`dagctl_core::ModeConfig`] to `modes.json` (spec §6).

use dagctl_core::{ModeConfig, OrchestratorError};
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct ModesStore {
    path: PathBuf,
}

impl ModesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load modes from disk, falling back to defaults if the file is
    /// missing or unreadable (logged, never fatal — a corrupt modes.json
    /// should not prevent startup).
    pub fn load(&self) -> ModeConfig {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "modes.json is unreadable, using defaults");
                    ModeConfig::default()
                }
            },
            Err(_) => ModeConfig::default(),
        }
    }

    /// Save modes to disk, writing to a temp file first so a crash
    /// mid-write never leaves a truncated `modes.json`.
    pub fn save(&self, config: &ModeConfig) -> Result<(), OrchestratorError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OrchestratorError::ConfigError(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(config).map_err(|e| OrchestratorError::ConfigError(e.to_string()))?;
        write_atomic(&self.path, &json).map_err(|e| OrchestratorError::ConfigError(e.to_string()))
    }
}

fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)
}
