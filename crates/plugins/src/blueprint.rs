//! Blueprint connections table: one row per data connection with its chosen scopes.

#![forbid(unsafe_code)]

use std::path::Path;

use anyhow::{Context, Result};
use lakescope_core::columns::{Align, ColumnDef};
use lakescope_core::{ConnectionId, ScopeId};
use serde::{Deserialize, Serialize};

use crate::{builtin_registry, PluginKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintConnection {
    pub plugin: PluginKey,
    pub id: ConnectionId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub scope_ids: Vec<ScopeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub name: String,
    #[serde(default)]
    pub connections: Vec<BlueprintConnection>,
}

impl Blueprint {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("reading blueprint {}", path.display()))?;
        let mut bp: Blueprint = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing blueprint {}", path.display()))?;
        for c in bp.connections.iter_mut() {
            if c.icon.is_empty() {
                if let Some(cfg) = builtin_registry().get(c.plugin) { c.icon = cfg.icon.clone(); }
            }
        }
        Ok(bp)
    }
}

/// Scope list cell: `jira/conn-1: 1, 2`, or a hint when nothing is chosen yet.
pub fn data_scope_list(plugin: PluginKey, connection_id: &ConnectionId, scope_ids: &[ScopeId]) -> String {
    if scope_ids.is_empty() {
        return "no data scope".to_string();
    }
    let ids: Vec<String> = scope_ids.iter().map(|s| s.to_string()).collect();
    format!("{}/{}: {}", plugin, connection_id, ids.join(", "))
}

pub fn blueprint_connection_columns() -> Vec<ColumnDef<BlueprintConnection>> {
    vec![
        ColumnDef::new("connection", "Data Connections", 28)
            .index(&["icon", "name"])
            .render(|c: &BlueprintConnection| {
                let plugin = builtin_registry().get(c.plugin).map(|p| p.name.as_str()).unwrap_or(c.plugin.as_str());
                format!("{} ({})", c.name, plugin)
            }),
        ColumnDef::new("unique", "Data Scope", 40)
            .index(&["plugin", "id", "scopeIds"])
            .render(|c: &BlueprintConnection| data_scope_list(c.plugin, &c.id, &c.scope_ids)),
        ColumnDef::new("action", "", 11)
            .align(Align::Center)
            .render(|_: &BlueprintConnection| "Add Scope".to_string()),
    ]
}
