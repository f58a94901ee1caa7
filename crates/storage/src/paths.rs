//! Filesystem layout under the user's state directory (spec §6).
//! Grounded on `original_source/session/manager.py`'s `BASE_DIR =
//! ~/.data_agent` convention.

use std::path::PathBuf;

pub const BASE_DIR_NAME: &str = ".dagctl";
pub const SESSIONS_DIR_NAME: &str = "sessions";
pub const MODES_FILE_NAME: &str = "modes.json";
pub const CONFIG_FILE_NAME: &str = "agents.yaml";
pub const CONFIG_ENV_VAR: &str = "DAGCTL_CONFIG";

pub fn base_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(BASE_DIR_NAME)
}

pub fn sessions_dir() -> PathBuf {
    base_dir().join(SESSIONS_DIR_NAME)
}

pub fn modes_path() -> PathBuf {
    base_dir().join(MODES_FILE_NAME)
}

/// Resolve the config file path: `$DAGCTL_CONFIG` if set, otherwise the
/// default path under the base directory.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR).map(PathBuf::from).unwrap_or_else(|_| base_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_lives_under_base_dir() {
        std::env::remove_var(CONFIG_ENV_VAR);
        assert_eq!(config_path(), base_dir().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn config_env_var_overrides_default_path() {
        std::env::set_var(CONFIG_ENV_VAR, "/tmp/custom-agents.yaml");
        assert_eq!(config_path(), PathBuf::from("/tmp/custom-agents.yaml"));
        std::env::remove_var(CONFIG_ENV_VAR);
    }
}
