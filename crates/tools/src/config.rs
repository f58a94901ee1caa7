//! The `tools:` section of `agents.yaml` (spec §6), applied to a
//! [`crate::registry::ToolRegistry`] at startup and on config reload.

use crate::registry::ToolRegistry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<ToolAlias>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAlias {
    pub alias: String,
    pub canonical: String,
}

impl ToolsConfig {
    pub fn apply(&self, registry: &ToolRegistry) {
        registry.apply_config(&self.disabled);
        for a in &self.aliases {
            registry.alias(a.alias.clone(), a.canonical.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::test_support::EchoTool;
    use std::sync::Arc;

    #[test]
    fn apply_disables_and_aliases() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let cfg = ToolsConfig {
            disabled: vec!["echo".to_string()],
            aliases: vec![ToolAlias { alias: "repeat".into(), canonical: "echo".into() }],
        };
        cfg.apply(&registry);

        assert!(registry.resolve("echo").is_err());
        assert!(registry.resolve("repeat").is_err());
    }
}
