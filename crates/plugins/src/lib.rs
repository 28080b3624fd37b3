//! lakescope plugins: declarative connection forms, collected entities and default
//! transformation settings per data source, kept as plain data.

#![forbid(unsafe_code)]

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod blueprint;
pub mod form;

pub use form::{initial_values, validate_connection, FieldIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKey {
    Jira,
    GitHub,
    GitLab,
    Bitbucket,
    Tapd,
}

impl PluginKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKey::Jira => "jira",
            PluginKey::GitHub => "github",
            PluginKey::GitLab => "gitlab",
            PluginKey::Bitbucket => "bitbucket",
            PluginKey::Tapd => "tapd",
        }
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for PluginKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jira" => Ok(PluginKey::Jira),
            "github" => Ok(PluginKey::GitHub),
            "gitlab" => Ok(PluginKey::GitLab),
            "bitbucket" => Ok(PluginKey::Bitbucket),
            "tapd" => Ok(PluginKey::Tapd),
            other => Err(anyhow::anyhow!("unknown plugin: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Connection,
    Pipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    #[serde(rename = "TICKET")]
    Ticket,
    #[serde(rename = "CODE")]
    Code,
    #[serde(rename = "CODEREVIEW")]
    CodeReview,
    #[serde(rename = "CROSS")]
    Cross,
    #[serde(rename = "CICD")]
    Cicd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Password,
    Switch,
    Numeric,
    RateLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSchema {
    #[serde(default)]
    pub initial_values: serde_json::Map<String, serde_json::Value>,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    pub plugin: PluginKey,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PluginType,
    #[serde(default)]
    pub is_beta: bool,
    #[serde(default)]
    pub icon: String,
    pub connection: ConnectionSchema,
    #[serde(default)]
    pub entities: SmallVec<[Entity; 5]>,
    /// Default transformation settings, opaque to the form layer.
    #[serde(default)]
    pub transformation: serde_json::Value,
}

impl PluginConfig {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.connection.fields.iter().find(|f| f.key == key)
    }
}

/// Lookup table from plugin key to its config.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<PluginConfig>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn builtin() -> Self {
        let mut r = Self::new();
        for cfg in [jira(), github(), gitlab(), bitbucket(), tapd()] {
            r.register(cfg);
        }
        r
    }

    /// Add a config, replacing any existing entry for the same plugin.
    pub fn register(&mut self, cfg: PluginConfig) {
        match self.entries.iter_mut().find(|e| e.plugin == cfg.plugin) {
            Some(slot) => {
                tracing::debug!(plugin = %cfg.plugin, "plugins: replacing config");
                *slot = cfg;
            }
            None => self.entries.push(cfg),
        }
    }

    pub fn get(&self, key: PluginKey) -> Option<&PluginConfig> {
        self.entries.iter().find(|e| e.plugin == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginConfig> { self.entries.iter() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

static BUILTIN: Lazy<Registry> = Lazy::new(Registry::builtin);

/// Shared built-in registry.
pub fn builtin_registry() -> &'static Registry { &BUILTIN }

// ---------------- Built-in configs ----------------

fn field(key: &str, label: &str, kind: FieldKind, required: bool, placeholder: Option<&str>) -> FieldSpec {
    FieldSpec {
        key: key.into(),
        label: label.into(),
        kind,
        required,
        placeholder: placeholder.map(Into::into),
        tooltip: None,
    }
}

fn name_field(example: &str) -> FieldSpec {
    field("name", "Connection Name", FieldKind::Text, true, Some(format!("eg. {}", example).as_str()))
}

fn endpoint_field(example: &str) -> FieldSpec {
    field("endpoint", "Endpoint URL", FieldKind::Text, true, Some(format!("eg. {}", example).as_str()))
}

fn proxy_field(source: &str) -> FieldSpec {
    FieldSpec {
        tooltip: Some(format!("Add a proxy if your network can not access {} directly.", source)),
        ..field("proxy", "Proxy URL", FieldKind::Text, false, Some("eg. http://proxy.localhost:8080"))
    }
}

fn rate_limit_field() -> FieldSpec {
    FieldSpec {
        tooltip: Some("Rate Limit requests per hour,\nEnter a numeric value > 0 to enable.".into()),
        ..field("rateLimitPerHour", "Fixed Rate Limit (per hour)", FieldKind::RateLimit, false, None)
    }
}

fn initial(rate_limit: u64) -> serde_json::Map<String, serde_json::Value> {
    let mut m = serde_json::Map::new();
    m.insert("rateLimitPerHour".into(), serde_json::Value::from(rate_limit));
    m
}

fn jira() -> PluginConfig {
    PluginConfig {
        plugin: PluginKey::Jira,
        name: "Jira".into(),
        kind: PluginType::Connection,
        is_beta: false,
        icon: "jira/assets/icon.svg".into(),
        connection: ConnectionSchema {
            initial_values: initial(3000),
            fields: vec![
                name_field("JIRA"),
                endpoint_field("https://your-domain.atlassian.net/rest/"),
                field("username", "Username / E-mail", FieldKind::Text, true, Some("eg. admin")),
                field("password", "Password", FieldKind::Password, true, Some("eg. ************")),
                proxy_field("Jira"),
                rate_limit_field(),
            ],
        },
        entities: [Entity::Ticket, Entity::Cross].into_iter().collect(),
        transformation: serde_json::json!({
            "epicKeyField": "",
            "storyPointField": "",
            "remotelinkCommitShaPattern": "",
            "typeMappings": {}
        }),
    }
}

fn github() -> PluginConfig {
    PluginConfig {
        plugin: PluginKey::GitHub,
        name: "GitHub".into(),
        kind: PluginType::Connection,
        is_beta: false,
        icon: "github/assets/icon.svg".into(),
        connection: ConnectionSchema {
            initial_values: {
                let mut m = initial(4500);
                m.insert("endpoint".into(), "https://api.github.com/".into());
                m
            },
            fields: vec![
                name_field("GitHub"),
                endpoint_field("https://api.github.com/"),
                field("token", "Basic Auth Token", FieldKind::Password, true, Some("eg. ghp_************")),
                proxy_field("GitHub"),
                rate_limit_field(),
            ],
        },
        entities: [Entity::Code, Entity::Ticket, Entity::CodeReview, Entity::Cross, Entity::Cicd]
            .into_iter()
            .collect(),
        transformation: serde_json::json!({
            "issueSeverity": "",
            "issueComponent": "",
            "issuePriority": "",
            "issueTypeRequirement": "",
            "issueTypeBug": "",
            "issueTypeIncident": "",
            "prType": "",
            "prComponent": "",
            "prBodyClosePattern": "",
            "deploymentPattern": "",
            "productionPattern": ""
        }),
    }
}

fn gitlab() -> PluginConfig {
    PluginConfig {
        plugin: PluginKey::GitLab,
        name: "GitLab".into(),
        kind: PluginType::Connection,
        is_beta: false,
        icon: "gitlab/assets/icon.svg".into(),
        connection: ConnectionSchema {
            initial_values: {
                let mut m = initial(0);
                m.insert("endpoint".into(), "https://gitlab.com/api/v4/".into());
                m
            },
            fields: vec![
                name_field("GitLab"),
                endpoint_field("https://gitlab.com/api/v4/"),
                field("token", "Access Token", FieldKind::Password, true, Some("eg. ff9d1ad0e5c04f1f98fa")),
                proxy_field("GitLab"),
                rate_limit_field(),
            ],
        },
        entities: [Entity::Code, Entity::Ticket, Entity::CodeReview, Entity::Cross, Entity::Cicd]
            .into_iter()
            .collect(),
        transformation: serde_json::json!({
            "deploymentPattern": "",
            "productionPattern": ""
        }),
    }
}

fn bitbucket() -> PluginConfig {
    PluginConfig {
        plugin: PluginKey::Bitbucket,
        name: "BitBucket".into(),
        kind: PluginType::Connection,
        is_beta: true,
        icon: "bitbucket/assets/icon.svg".into(),
        connection: ConnectionSchema {
            initial_values: {
                let mut m = initial(10000);
                m.insert("endpoint".into(), "https://api.bitbucket.org/2.0/".into());
                m
            },
            fields: vec![
                name_field("BitBucket"),
                endpoint_field("https://api.bitbucket.org/2.0/"),
                field("username", "Username", FieldKind::Text, true, Some("eg. admin")),
                field("password", "App Password", FieldKind::Password, true, Some("eg. ************")),
                proxy_field("BitBucket"),
                rate_limit_field(),
            ],
        },
        entities: [Entity::Ticket, Entity::Code, Entity::CodeReview, Entity::Cross].into_iter().collect(),
        transformation: serde_json::json!({
            "issueStatusTodo": [],
            "issueStatusInProgress": [],
            "issueStatusDone": [],
            "issueStatusOther": []
        }),
    }
}

fn tapd() -> PluginConfig {
    PluginConfig {
        plugin: PluginKey::Tapd,
        name: "TAPD".into(),
        kind: PluginType::Connection,
        is_beta: true,
        icon: "tapd/assets/icon.svg".into(),
        connection: ConnectionSchema {
            initial_values: initial(3000),
            fields: vec![
                name_field("TAPD"),
                endpoint_field("https://api.tapd.cn/"),
                field("username", "Username", FieldKind::Text, true, Some("eg. admin")),
                field("password", "Password", FieldKind::Password, true, Some("eg. ************")),
                proxy_field("TAPD"),
                rate_limit_field(),
            ],
        },
        entities: [Entity::Ticket].into_iter().collect(),
        transformation: serde_json::json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_every_plugin_once() {
        let r = builtin_registry();
        assert_eq!(r.len(), 5);
        for key in [PluginKey::Jira, PluginKey::GitHub, PluginKey::GitLab, PluginKey::Bitbucket, PluginKey::Tapd] {
            assert_eq!(r.get(key).map(|c| c.plugin), Some(key));
        }
    }

    #[test]
    fn tapd_matches_declared_form() {
        let cfg = builtin_registry().get(PluginKey::Tapd).unwrap();
        assert!(cfg.is_beta);
        assert_eq!(cfg.connection.initial_values.get("rateLimitPerHour"), Some(&serde_json::json!(3000)));
        let keys: Vec<&str> = cfg.connection.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "endpoint", "username", "password", "proxy", "rateLimitPerHour"]);
        assert_eq!(cfg.field("password").map(|f| f.kind), Some(FieldKind::Password));
        assert_eq!(cfg.entities.as_slice(), &[Entity::Ticket]);
    }

    #[test]
    fn register_replaces_by_key() {
        let mut r = Registry::builtin();
        let mut cfg = r.get(PluginKey::Jira).unwrap().clone();
        cfg.name = "Jira Server".into();
        r.register(cfg);
        assert_eq!(r.len(), 5);
        assert_eq!(r.get(PluginKey::Jira).unwrap().name, "Jira Server");
    }

    #[test]
    fn config_round_trips_through_wire_names() {
        let cfg = builtin_registry().get(PluginKey::GitHub).unwrap();
        let v = serde_json::to_value(cfg).unwrap();
        assert_eq!(v["type"], "connection");
        assert_eq!(v["isBeta"], false);
        assert_eq!(v["entities"][2], "CODEREVIEW");
        assert_eq!(v["connection"]["fields"][4]["type"], "rateLimit");
        let back: PluginConfig = serde_json::from_value(v).unwrap();
        assert_eq!(&back, cfg);
    }

    #[test]
    fn plugin_key_parses_case_insensitively() {
        assert_eq!("GitLab".parse::<PluginKey>().unwrap(), PluginKey::GitLab);
        assert!("svn".parse::<PluginKey>().is_err());
    }
}
