//! `agents.yaml` loading: environment-variable expansion and hot reload
//! (spec §6). Grounded on `original_source/config/loader.py`'s
//! `ConfigLoader` (`_find_config_file`, `_load_yaml`,
//! `_substitute_env_vars`) and `oj-cli`/`lanegrid-agtrace`'s use of
//! `notify` for filesystem watching.

use dagctl_core::{ModeConfig, OrchestratorError};
use dagctl_tools::ToolsConfig;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub default_modes: ModeConfig,
}

/// Substitutes `${VAR}` and `${VAR:default}` occurrences with the
/// matching environment variable, or the fallback if unset. A reference
/// to a genuinely unset variable with no fallback is left untouched, so
/// a missing secret fails loudly in the YAML value itself rather than
/// silently becoming an empty string.
fn substitute_env_vars(raw: &str) -> String {
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:([^}]*))?\}").expect("static regex is valid");
    pattern
        .replace_all(raw, |caps: &regex::Captures| {
            let var = &caps[1];
            match std::env::var(var) {
                Ok(value) => value,
                Err(_) => caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}

fn load_yaml(path: &Path) -> Result<AppConfig, OrchestratorError> {
    let raw = std::fs::read_to_string(path).map_err(|e| OrchestratorError::ConfigError(format!("{}: {e}", path.display())))?;
    let expanded = substitute_env_vars(&raw);
    serde_yaml::from_str(&expanded).map_err(|e| OrchestratorError::ConfigError(format!("{}: {e}", path.display())))
}

/// Loads `agents.yaml`, holding the most recently loaded config for
/// cheap concurrent reads, and can watch the file for changes.
pub struct ConfigLoader {
    path: PathBuf,
    current: RwLock<Arc<AppConfig>>,
}

impl ConfigLoader {
    /// Load once at the given path. Falls back to default config if the
    /// file does not exist at all (first run, no `agents.yaml` written
    /// yet); a present-but-invalid file is still an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, OrchestratorError> {
        let path = path.into();
        let config = if path.exists() {
            load_yaml(&path)?
        } else {
            AppConfig::default()
        };
        Ok(Self { path, current: RwLock::new(Arc::new(config)) })
    }

    pub fn current(&self) -> Arc<AppConfig> {
        self.current.read().clone()
    }

    pub fn reload(&self) -> Result<Arc<AppConfig>, OrchestratorError> {
        let config = if self.path.exists() { load_yaml(&self.path)? } else { AppConfig::default() };
        let config = Arc::new(config);
        *self.current.write() = config.clone();
        Ok(config)
    }

    /// Watch the config file for writes, reloading and invoking
    /// `on_change` on success. Reload errors are logged and leave the
    /// previously loaded config in place. The returned watcher must be
    /// kept alive for watching to continue.
    pub fn watch(self: &Arc<Self>, on_change: impl Fn(Arc<AppConfig>) + Send + 'static) -> Result<RecommendedWatcher, OrchestratorError> {
        let loader = self.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) if event.kind.is_modify() => match loader.reload() {
                Ok(config) => {
                    info!(path = %loader.path.display(), "reloaded agents.yaml");
                    on_change(config);
                }
                Err(e) => error!(path = %loader.path.display(), error = %e, "failed to reload agents.yaml, keeping previous config"),
            },
            Ok(_) => {}
            Err(e) => warn!(error = %e, "config file watcher error"),
        })
        .map_err(|e| OrchestratorError::ConfigError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .map_err(|e| OrchestratorError::ConfigError(e.to_string()))?;
        }

        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_var_with_fallback_when_unset() {
        std::env::remove_var("DAGCTL_TEST_UNSET_VAR");
        let out = substitute_env_vars("url: ${DAGCTL_TEST_UNSET_VAR:postgres://localhost/default}");
        assert_eq!(out, "url: postgres://localhost/default");
    }

    #[test]
    fn substitutes_var_with_actual_value_when_set() {
        std::env::set_var("DAGCTL_TEST_SET_VAR", "hello");
        let out = substitute_env_vars("x: ${DAGCTL_TEST_SET_VAR}");
        assert_eq!(out, "x: hello");
        std::env::remove_var("DAGCTL_TEST_SET_VAR");
    }

    #[test]
    fn unset_var_without_fallback_is_left_untouched() {
        std::env::remove_var("DAGCTL_TEST_NO_FALLBACK");
        let out = substitute_env_vars("x: ${DAGCTL_TEST_NO_FALLBACK}");
        assert_eq!(out, "x: ${DAGCTL_TEST_NO_FALLBACK}");
    }

    #[test]
    fn missing_file_loads_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::load(tmp.path().join("agents.yaml")).unwrap();
        assert_eq!(loader.current().server.port, 8787);
    }

    #[test]
    fn load_parses_yaml_and_reload_reflects_edits() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agents.yaml");
        std::fs::write(&path, "server:\n  host: 0.0.0.0\n  port: 9000\n").unwrap();

        let loader = ConfigLoader::load(&path).unwrap();
        assert_eq!(loader.current().server.port, 9000);

        std::fs::write(&path, "server:\n  host: 0.0.0.0\n  port: 9100\n").unwrap();
        let reloaded = loader.reload().unwrap();
        assert_eq!(reloaded.server.port, 9100);
    }

    #[test]
    fn invalid_yaml_in_existing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agents.yaml");
        std::fs::write(&path, "not: [valid: yaml").unwrap();
        assert!(ConfigLoader::load(&path).is_err());
    }
}
