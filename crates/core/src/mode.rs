//! Runtime modes: user-togglable behaviour switches persisted to
//! `modes.json` (spec §4.E, §6). Grounded on
//! `original_source/config/modes.py`'s `MODE_DEFINITIONS` table and
//! `ModeManager` singleton.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewLimit {
    Small,
    Medium,
    Large,
    Full,
}

crate::simple_display! {
    PreviewLimit {
        Small => "small", Medium => "medium", Large => "large", Full => "full",
    }
}

impl PreviewLimit {
    /// Maximum rows shown in a tabular preview for this setting.
    pub fn row_limit(self) -> usize {
        match self {
            Self::Small => 10,
            Self::Medium => 50,
            Self::Large => 100,
            Self::Full => usize::MAX,
        }
    }
}

/// The live set of mode values. Field names match the keys used in
/// `modes.json` and the `/api/modes` HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModeConfig {
    pub plan_mode: bool,
    pub auto_execute: bool,
    pub safe_mode: bool,
    pub verbose: bool,
    pub preview_limit: PreviewLimit,
    pub export_mode: bool,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            plan_mode: false,
            auto_execute: true,
            safe_mode: true,
            verbose: false,
            preview_limit: PreviewLimit::Medium,
            export_mode: false,
        }
    }
}

impl ModeConfig {
    /// Apply an environment-variable override table, keyed by the
    /// per-field env key declared in [`MODE_DEFINITIONS`]. Unparseable
    /// values are ignored rather than raised, matching the original's
    /// lenient env loading.
    pub fn apply_env_overrides(&mut self, env: &HashMap<String, String>) {
        for def in MODE_DEFINITIONS {
            let Some(raw) = env.get(def.env_key) else { continue };
            match def.field {
                "plan_mode" => self.plan_mode = parse_bool(raw).unwrap_or(self.plan_mode),
                "auto_execute" => self.auto_execute = parse_bool(raw).unwrap_or(self.auto_execute),
                "safe_mode" => self.safe_mode = parse_bool(raw).unwrap_or(self.safe_mode),
                "verbose" => self.verbose = parse_bool(raw).unwrap_or(self.verbose),
                "preview_limit" => {
                    if let Some(limit) = parse_preview_limit(raw) {
                        self.preview_limit = limit;
                    }
                }
                "export_mode" => self.export_mode = parse_bool(raw).unwrap_or(self.export_mode),
                _ => {}
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_preview_limit(raw: &str) -> Option<PreviewLimit> {
    match raw.to_ascii_lowercase().as_str() {
        "small" => Some(PreviewLimit::Small),
        "medium" => Some(PreviewLimit::Medium),
        "large" => Some(PreviewLimit::Large),
        "full" => Some(PreviewLimit::Full),
        _ => None,
    }
}

/// Static metadata describing one mode field: display name, description,
/// and the environment variable that can override it at startup.
pub struct ModeDefinition {
    pub field: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub env_key: &'static str,
}

pub static MODE_DEFINITIONS: &[ModeDefinition] = &[
    ModeDefinition {
        field: "plan_mode",
        display_name: "Plan Mode",
        description: "Require an approved step-by-step plan before executing a DAG",
        env_key: "DAGCTL_PLAN_MODE",
    },
    ModeDefinition {
        field: "auto_execute",
        display_name: "Auto Execute",
        description: "Automatically execute tool calls without per-step approval",
        env_key: "DAGCTL_AUTO_EXECUTE",
    },
    ModeDefinition {
        field: "safe_mode",
        display_name: "Safe Mode",
        description: "Require confirmation before data-modifying SQL statements",
        env_key: "DAGCTL_SAFE_MODE",
    },
    ModeDefinition {
        field: "verbose",
        display_name: "Verbose",
        description: "Emit thinking and intermediate tool-call detail to the client",
        env_key: "DAGCTL_VERBOSE",
    },
    ModeDefinition {
        field: "preview_limit",
        display_name: "Preview Limit",
        description: "Row cap applied to tabular data previews",
        env_key: "DAGCTL_PREVIEW_LIMIT",
    },
    ModeDefinition {
        field: "export_mode",
        display_name: "Export Mode",
        description: "Automatically save tool results to the session export directory",
        env_key: "DAGCTL_EXPORT_MODE",
    },
];

/// Toggles and persists [`ModeConfig`], notifying registered callbacks on
/// change (e.g. so an open WebSocket can push a `modes_changed` event).
pub struct ModeManager {
    config: parking_lot::Mutex<ModeConfig>,
    callbacks: parking_lot::Mutex<Vec<Box<dyn Fn(&ModeConfig) + Send + Sync>>>,
}

impl ModeManager {
    pub fn new(initial: ModeConfig) -> Self {
        Self { config: parking_lot::Mutex::new(initial), callbacks: parking_lot::Mutex::new(Vec::new()) }
    }

    pub fn get_all(&self) -> ModeConfig {
        self.config.lock().clone()
    }

    pub fn toggle_plan_mode(&self) {
        let mut cfg = self.config.lock();
        cfg.plan_mode = !cfg.plan_mode;
        self.notify(&cfg);
    }

    pub fn toggle_safe_mode(&self) {
        let mut cfg = self.config.lock();
        cfg.safe_mode = !cfg.safe_mode;
        self.notify(&cfg);
    }

    pub fn toggle_verbose(&self) {
        let mut cfg = self.config.lock();
        cfg.verbose = !cfg.verbose;
        self.notify(&cfg);
    }

    pub fn toggle_auto_execute(&self) {
        let mut cfg = self.config.lock();
        cfg.auto_execute = !cfg.auto_execute;
        self.notify(&cfg);
    }

    pub fn toggle_export_mode(&self) {
        let mut cfg = self.config.lock();
        cfg.export_mode = !cfg.export_mode;
        self.notify(&cfg);
    }

    pub fn set_plan_mode(&self, value: bool) {
        let mut cfg = self.config.lock();
        cfg.plan_mode = value;
        self.notify(&cfg);
    }

    pub fn set_safe_mode(&self, value: bool) {
        let mut cfg = self.config.lock();
        cfg.safe_mode = value;
        self.notify(&cfg);
    }

    pub fn set_verbose(&self, value: bool) {
        let mut cfg = self.config.lock();
        cfg.verbose = value;
        self.notify(&cfg);
    }

    pub fn set_auto_execute(&self, value: bool) {
        let mut cfg = self.config.lock();
        cfg.auto_execute = value;
        self.notify(&cfg);
    }

    pub fn set_preview_limit(&self, limit: PreviewLimit) {
        let mut cfg = self.config.lock();
        cfg.preview_limit = limit;
        self.notify(&cfg);
    }

    pub fn set_export_mode(&self, value: bool) {
        let mut cfg = self.config.lock();
        cfg.export_mode = value;
        self.notify(&cfg);
    }

    pub fn reset_to_defaults(&self) {
        let mut cfg = self.config.lock();
        *cfg = ModeConfig::default();
        self.notify(&cfg);
    }

    pub fn on_change(&self, callback: impl Fn(&ModeConfig) + Send + Sync + 'static) {
        self.callbacks.lock().push(Box::new(callback));
    }

    fn notify(&self, cfg: &ModeConfig) {
        for cb in self.callbacks.lock().iter() {
            cb(cfg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_safe_mode_on_plan_mode_off() {
        let cfg = ModeConfig::default();
        assert!(cfg.safe_mode);
        assert!(!cfg.plan_mode);
        assert!(cfg.auto_execute);
        assert!(!cfg.export_mode);
    }

    #[test]
    fn export_mode_env_override_applies() {
        let mut cfg = ModeConfig::default();
        let mut env = HashMap::new();
        env.insert("DAGCTL_EXPORT_MODE".to_string(), "on".to_string());
        env.insert("DAGCTL_AUTO_EXECUTE".to_string(), "off".to_string());
        cfg.apply_env_overrides(&env);
        assert!(cfg.export_mode);
        assert!(!cfg.auto_execute);
    }

    #[test]
    fn env_overrides_apply_per_field() {
        let mut cfg = ModeConfig::default();
        let mut env = HashMap::new();
        env.insert("DAGCTL_PLAN_MODE".to_string(), "true".to_string());
        env.insert("DAGCTL_PREVIEW_LIMIT".to_string(), "full".to_string());
        cfg.apply_env_overrides(&env);

        assert!(cfg.plan_mode);
        assert_eq!(cfg.preview_limit, PreviewLimit::Full);
    }

    #[test]
    fn unparseable_env_value_is_ignored() {
        let mut cfg = ModeConfig::default();
        let mut env = HashMap::new();
        env.insert("DAGCTL_SAFE_MODE".to_string(), "maybe".to_string());
        cfg.apply_env_overrides(&env);
        assert!(cfg.safe_mode);
    }

    #[test]
    fn toggle_and_reset_round_trip() {
        let manager = ModeManager::new(ModeConfig::default());
        manager.toggle_plan_mode();
        assert!(manager.get_all().plan_mode);
        manager.reset_to_defaults();
        assert!(!manager.get_all().plan_mode);
    }

    #[test]
    fn explicit_setters_do_not_depend_on_prior_value() {
        let manager = ModeManager::new(ModeConfig::default());
        manager.set_safe_mode(false);
        manager.set_safe_mode(false);
        assert!(!manager.get_all().safe_mode);
        manager.set_export_mode(true);
        assert!(manager.get_all().export_mode);
    }

    #[test]
    fn callback_fires_on_change() {
        let manager = ModeManager::new(ModeConfig::default());
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(false));
        let seen2 = seen.clone();
        manager.on_change(move |cfg| *seen2.lock() = cfg.verbose);
        manager.toggle_verbose();
        assert!(*seen.lock());
    }
}
