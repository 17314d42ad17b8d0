// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `registerOpenWith` / `listOpenWithNames` / `unregisterOpenWith`
//! (§4.8). No teacher or original-source analogue — these are
//! MoleQueue's own "open this file type with that program" client
//! registrations, kept in memory only for the life of the process.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenWithPattern {
    pub pattern: String,
    pub pattern_type: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenWithHandler {
    pub name: String,
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub rpc_server: Option<String>,
    pub patterns: Vec<OpenWithPattern>,
}

/// Registered handlers, keyed by name. Registering an existing name
/// replaces it, matching the registry's general "last write wins"
/// posture for named configuration (queues, programs).
#[derive(Default)]
pub struct OpenWithRegistry {
    handlers: RwLock<HashMap<String, OpenWithHandler>>,
}

impl OpenWithRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: OpenWithHandler) {
        self.handlers.write().insert(handler.name.clone(), handler);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.write().remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> OpenWithHandler {
        OpenWithHandler {
            name: name.to_string(),
            executable: Some("/usr/bin/avogadro".to_string()),
            rpc_server: None,
            patterns: vec![OpenWithPattern { pattern: "*.xyz".into(), pattern_type: "wildcard".into(), case_sensitive: false }],
        }
    }

    #[test]
    fn register_then_list_then_unregister() {
        let registry = OpenWithRegistry::new();
        registry.register(sample("Avogadro"));
        assert_eq!(registry.names(), vec!["Avogadro".to_string()]);
        assert!(registry.unregister("Avogadro"));
        assert!(registry.names().is_empty());
    }

    #[test]
    fn unregister_unknown_name_reports_false() {
        let registry = OpenWithRegistry::new();
        assert!(!registry.unregister("missing"));
    }

    #[test]
    fn re_registering_same_name_replaces() {
        let registry = OpenWithRegistry::new();
        registry.register(sample("Avogadro"));
        let mut replacement = sample("Avogadro");
        replacement.executable = Some("/usr/local/bin/avogadro".into());
        registry.register(replacement);
        assert_eq!(registry.names().len(), 1);
    }
}
