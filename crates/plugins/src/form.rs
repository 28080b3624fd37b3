//! Connection form helpers: seed values for a blank form and report
//! human-friendly issues for a filled one.

#![forbid(unsafe_code)]

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FieldKind, FieldSpec, PluginConfig};

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("static url pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub key: String,
    pub error: String,
    pub hint: Option<String>,
}

impl FieldIssue {
    fn new(key: &str, error: impl Into<String>, hint: Option<String>) -> Self {
        Self { key: key.to_string(), error: error.into(), hint }
    }
}

fn blank(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Text | FieldKind::Password => Value::String(String::new()),
        FieldKind::Switch => Value::Bool(false),
        FieldKind::Numeric | FieldKind::RateLimit => Value::Null,
    }
}

/// Form values for a new connection: declared initial values first, a blank per
/// field kind for everything else.
pub fn initial_values(cfg: &PluginConfig) -> Map<String, Value> {
    let mut out = cfg.connection.initial_values.clone();
    for f in cfg.connection.fields.iter() {
        if !out.contains_key(&f.key) {
            out.insert(f.key.clone(), blank(f.kind));
        }
    }
    out
}

fn is_empty(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn check_field(f: &FieldSpec, v: Option<&Value>, out: &mut Vec<FieldIssue>) {
    if is_empty(v) {
        if f.required {
            out.push(FieldIssue::new(&f.key, format!("{} is required", f.label), f.placeholder.clone()));
        }
        return;
    }
    let Some(v) = v else { return };
    match f.kind {
        FieldKind::Text | FieldKind::Password => {
            let Some(s) = v.as_str() else {
                out.push(FieldIssue::new(&f.key, "expected text", None));
                return;
            };
            if (f.key == "endpoint" || f.key == "proxy") && !URL_RE.is_match(s.trim()) {
                out.push(FieldIssue::new(&f.key, "expected an http(s) URL", f.placeholder.clone()));
            }
        }
        FieldKind::Switch => {
            if !v.is_boolean() {
                out.push(FieldIssue::new(&f.key, "expected true or false", None));
            }
        }
        FieldKind::Numeric => {
            if as_integer(v).is_none() {
                out.push(FieldIssue::new(&f.key, "expected a number", None));
            }
        }
        FieldKind::RateLimit => match as_integer(v) {
            Some(n) if n >= 0 => {}
            _ => out.push(FieldIssue::new(&f.key, "expected a non-negative integer", f.tooltip.clone())),
        },
    }
}

/// Validate filled connection values against the plugin's form. Empty result means OK.
pub fn validate_connection(cfg: &PluginConfig, values: &Value) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    let Some(obj) = values.as_object() else {
        issues.push(FieldIssue::new("", "expected an object of field values", None));
        return issues;
    };
    for f in cfg.connection.fields.iter() {
        check_field(f, obj.get(&f.key), &mut issues);
    }
    for k in obj.keys() {
        if cfg.field(k).is_none() {
            issues.push(FieldIssue::new(k, "unknown field", Some(format!("not part of the {} connection form", cfg.name))));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builtin_registry, PluginKey};
    use serde_json::json;

    fn tapd() -> &'static PluginConfig { builtin_registry().get(PluginKey::Tapd).unwrap() }

    #[test]
    fn initial_values_fill_every_field() {
        let v = initial_values(tapd());
        assert_eq!(v.get("rateLimitPerHour"), Some(&json!(3000)));
        assert_eq!(v.get("name"), Some(&json!("")));
        assert_eq!(v.get("password"), Some(&json!("")));
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn valid_form_has_no_issues() {
        let values = json!({
            "name": "TAPD",
            "endpoint": "https://api.tapd.cn/",
            "username": "admin",
            "password": "secret",
            "proxy": "",
            "rateLimitPerHour": "3000"
        });
        assert!(validate_connection(tapd(), &values).is_empty());
    }

    #[test]
    fn reports_missing_bad_and_unknown_fields() {
        let values = json!({
            "name": " ",
            "endpoint": "api.tapd.cn",
            "username": "admin",
            "password": "x",
            "proxy": "socks://proxy",
            "rateLimitPerHour": -1,
            "token": "abc"
        });
        let issues = validate_connection(tapd(), &values);
        let keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "endpoint", "proxy", "rateLimitPerHour", "token"]);
        assert_eq!(issues[0].hint.as_deref(), Some("eg. TAPD"));
        assert_eq!(issues[1].error, "expected an http(s) URL");
    }

    #[test]
    fn non_object_input_is_rejected() {
        let issues = validate_connection(tapd(), &json!([1, 2]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "");
    }
}
