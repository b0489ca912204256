// LogScope - app/store.rs
//
// Read-only lookup of stored backend connections and filter presets.
// The coordinator only sees the `ConfigStore` trait; the process wires in
// `MemoryConfigStore` built from the validated config.toml.

use crate::core::model::{ConnectionConfig, Preset};
use std::collections::BTreeMap;

/// Key-value lookup of stored configuration by id.
pub trait ConfigStore: Send + Sync {
    fn connection(&self, id: i64) -> Option<ConnectionConfig>;

    fn preset(&self, id: i64) -> Option<Preset>;

    /// All presets, newest (highest id) first.
    fn presets(&self) -> Vec<Preset>;
}

/// In-memory store loaded once at startup.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigStore {
    connections: BTreeMap<i64, ConnectionConfig>,
    presets: BTreeMap<i64, Preset>,
}

impl MemoryConfigStore {
    /// Build the store. Later entries with a duplicate id replace earlier ones.
    ///
    /// Preset values are trimmed, blank ones dropped, and the rest
    /// deduplicated and sorted. Blank labels are replaced by the key.
    pub fn new(connections: Vec<ConnectionConfig>, presets: Vec<Preset>) -> Self {
        let mut store = Self::default();

        for conn in connections {
            if store.connections.insert(conn.id, conn.clone()).is_some() {
                tracing::warn!(id = conn.id, "Duplicate connection id; keeping the later entry");
            }
        }

        for preset in presets {
            let preset = normalize_preset(preset);
            let id = preset.id;
            if store.presets.insert(id, preset).is_some() {
                tracing::warn!(id, "Duplicate preset id; keeping the later entry");
            }
        }

        tracing::debug!(
            connections = store.connections.len(),
            presets = store.presets.len(),
            "Config store loaded"
        );
        store
    }
}

fn normalize_preset(mut preset: Preset) -> Preset {
    preset.key = preset.key.trim().to_string();
    let mut values: Vec<String> = preset
        .values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    preset.values = values;

    if preset.label.trim().is_empty() {
        preset.label = preset.key.clone();
    }
    preset
}

impl ConfigStore for MemoryConfigStore {
    fn connection(&self, id: i64) -> Option<ConnectionConfig> {
        self.connections.get(&id).cloned()
    }

    fn preset(&self, id: i64) -> Option<Preset> {
        self.presets.get(&id).cloned()
    }

    fn presets(&self) -> Vec<Preset> {
        self.presets.values().rev().cloned().collect()
    }
}
