//! Declarative field rules, usable as the local schema validator.
//!
//! ```toml
//! [[rules]]
//! path = "name"
//! required = true
//! kind = "string"
//!
//! [[rules]]
//! path = "peers.0.endpoint"
//! format = "hostname"
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;
use crate::local::{FieldViolation, SchemaValidator};

/// Code for a missing or null required field.
pub const REQUIRED: &str = "REQUIRED";
/// Code for a value of the wrong JSON type.
pub const TYPE_MISMATCH: &str = "TYPE_MISMATCH";
/// Code for a value that does not match its format.
pub const INVALID_FORMAT: &str = "INVALID_FORMAT";

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A whole JSON number.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Value format of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    /// Dotted-quad IPv4 address.
    Ipv4,
    /// IPv6 address.
    Ipv6,
    /// Either address family.
    Ip,
    /// `address/prefix`, either family.
    Cidr,
    /// TCP/UDP port, 1 to 65535, as a number or numeric string.
    Port,
    /// RFC 1123 host name.
    Hostname,
}

impl FieldFormat {
    fn matches(self, value: &Value) -> bool {
        if self == Self::Port {
            return match value {
                Value::Number(n) => n.as_u64().is_some_and(valid_port),
                Value::String(s) => s.parse::<u64>().is_ok_and(valid_port),
                _ => false,
            };
        }

        let Some(s) = value.as_str() else {
            return false;
        };
        match self {
            Self::Ipv4 => s.parse::<Ipv4Addr>().is_ok(),
            Self::Ipv6 => s.parse::<Ipv6Addr>().is_ok(),
            Self::Ip => s.parse::<IpAddr>().is_ok(),
            Self::Cidr => valid_cidr(s),
            Self::Hostname => valid_hostname(s),
            Self::Port => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Ipv4 => "an IPv4 address",
            Self::Ipv6 => "an IPv6 address",
            Self::Ip => "an IP address",
            Self::Cidr => "a CIDR prefix",
            Self::Port => "a port between 1 and 65535",
            Self::Hostname => "a host name",
        }
    }
}

fn valid_port(port: u64) -> bool {
    (1..=65_535).contains(&port)
}

fn valid_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => prefix <= 32,
        Ok(IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

fn valid_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

/// A rule for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Dotted path; numeric segments index arrays.
    pub path: String,
    /// The field must be present and not null.
    #[serde(default)]
    pub required: bool,
    /// Expected JSON type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
    /// Expected value format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
}

impl FieldRule {
    /// An optional field with no constraints yet.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required: false,
            kind: None,
            format: None,
        }
    }

    /// Mark the field required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Expect a JSON type.
    #[must_use]
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Expect a value format.
    #[must_use]
    pub fn format(mut self, format: FieldFormat) -> Self {
        self.format = Some(format);
        self
    }

    fn check(&self, data: &Value) -> Option<FieldViolation> {
        let value = match lookup(data, &self.path) {
            Some(Value::Null) | None if self.required => {
                return Some(
                    FieldViolation::at(&self.path, format!("{} is required", self.path))
                        .with_code(REQUIRED),
                );
            }
            Some(Value::Null) | None => return None,
            Some(value) => value,
        };

        if let Some(kind) = self.kind.filter(|kind| !kind.matches(value)) {
            return Some(
                FieldViolation::at(
                    &self.path,
                    format!("{} must be of type {}", self.path, kind.as_str()),
                )
                .with_code(TYPE_MISMATCH),
            );
        }

        if let Some(format) = self.format.filter(|format| !format.matches(value)) {
            return Some(
                FieldViolation::at(
                    &self.path,
                    format!("{} must be {}", self.path, format.describe()),
                )
                .with_code(INVALID_FORMAT),
            );
        }

        None
    }
}

/// Resolve a dotted path inside `data`.
fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

/// A set of [`FieldRule`]s, checked in order.
///
/// # Examples
///
/// ```
/// use nasnet_validation::{FieldRules, SchemaValidator};
///
/// let rules = FieldRules::from_toml_str(r#"
///     [[rules]]
///     path = "address"
///     required = true
///     format = "cidr"
/// "#).unwrap();
///
/// assert!(rules.validate(&serde_json::json!({ "address": "192.168.88.1/24" })).is_ok());
///
/// let violations = rules
///     .validate(&serde_json::json!({ "address": "192.168.88.1/33" }))
///     .unwrap_err();
/// assert_eq!(violations[0].code.as_deref(), Some("INVALID_FORMAT"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    /// The rules.
    #[serde(default)]
    pub rules: Vec<FieldRule>,
}

impl FieldRules {
    /// Wrap a list of rules.
    #[must_use]
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// Parse a TOML document with a `[[rules]]` array.
    pub fn from_toml_str(s: &str) -> Result<Self, PipelineError> {
        toml::from_str(s).map_err(|e| PipelineError::Rules(e.to_string()))
    }

    /// Parse a JSON document of the form `{ "rules": [...] }`.
    pub fn from_json_str(s: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(s).map_err(|e| PipelineError::Rules(e.to_string()))
    }

    /// Load rules from a file; `.json` files are JSON, anything else TOML.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Rules(format!("{}: {e}", path.display())))?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

impl SchemaValidator for FieldRules {
    fn validate(&self, data: &Value) -> Result<(), Vec<FieldViolation>> {
        let violations: Vec<_> = self.rules.iter().filter_map(|rule| rule.check(data)).collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::ipv4(FieldFormat::Ipv4, json!("10.0.0.1"), true)]
    #[case::ipv4_bad(FieldFormat::Ipv4, json!("not-an-ip"), false)]
    #[case::ipv6(FieldFormat::Ipv6, json!("fe80::1"), true)]
    #[case::ip_any(FieldFormat::Ip, json!("::1"), true)]
    #[case::cidr(FieldFormat::Cidr, json!("192.168.1.0/24"), true)]
    #[case::cidr_prefix_too_long(FieldFormat::Cidr, json!("192.168.1.0/33"), false)]
    #[case::cidr_v6(FieldFormat::Cidr, json!("2001:db8::/64"), true)]
    #[case::cidr_no_prefix(FieldFormat::Cidr, json!("192.168.1.0"), false)]
    #[case::port_number(FieldFormat::Port, json!(51820), true)]
    #[case::port_string(FieldFormat::Port, json!("8291"), true)]
    #[case::port_zero(FieldFormat::Port, json!(0), false)]
    #[case::port_too_big(FieldFormat::Port, json!(70000), false)]
    #[case::hostname(FieldFormat::Hostname, json!("vpn.example.com"), true)]
    #[case::hostname_trailing_dot(FieldFormat::Hostname, json!("router.lan."), true)]
    #[case::hostname_bad_label(FieldFormat::Hostname, json!("-bad.example"), false)]
    #[case::hostname_not_string(FieldFormat::Hostname, json!(42), false)]
    fn formats(#[case] format: FieldFormat, #[case] value: Value, #[case] ok: bool) {
        assert_eq!(format.matches(&value), ok);
    }

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let data = json!({ "peers": [{ "endpoint": "a.example" }, { "endpoint": "b.example" }] });
        assert_eq!(lookup(&data, "peers.1.endpoint"), Some(&json!("b.example")));
        assert_eq!(lookup(&data, "peers.2.endpoint"), None);
        assert_eq!(lookup(&data, "peers.x"), None);
    }

    #[test]
    fn required_rejects_missing_and_null() {
        let rules = FieldRules::new(vec![FieldRule::new("name").required()]);
        for data in [json!({}), json!({ "name": null })] {
            let violations = rules.validate(&data).unwrap_err();
            assert_eq!(violations[0].code.as_deref(), Some(REQUIRED));
            assert_eq!(violations[0].path.as_deref(), Some("name"));
        }
    }

    #[test]
    fn optional_missing_field_is_fine() {
        let rules = FieldRules::new(vec![FieldRule::new("comment").kind(FieldKind::String)]);
        assert!(rules.validate(&json!({})).is_ok());
    }

    #[test]
    fn type_mismatch_stops_format_check() {
        let rules = FieldRules::new(vec![
            FieldRule::new("vlan-id").kind(FieldKind::Integer),
            FieldRule::new("address").kind(FieldKind::String).format(FieldFormat::Ipv4),
        ]);
        let violations = rules
            .validate(&json!({ "vlan-id": "ten", "address": 10 }))
            .unwrap_err();

        let codes: Vec<_> = violations.iter().map(|v| v.code.as_deref()).collect();
        assert_eq!(codes, vec![Some(TYPE_MISMATCH), Some(TYPE_MISMATCH)]);
        assert_eq!(violations[0].message, "vlan-id must be of type integer");
    }

    #[test]
    fn loads_from_json_and_toml() {
        let from_json = FieldRules::from_json_str(
            r#"{ "rules": [{ "path": "port", "required": true, "format": "port" }] }"#,
        )
        .unwrap();
        let from_toml = FieldRules::from_toml_str(
            "[[rules]]\npath = \"port\"\nrequired = true\nformat = \"port\"\n",
        )
        .unwrap();
        assert_eq!(from_json, from_toml);
        assert_eq!(
            from_json.rules[0],
            FieldRule::new("port").required().format(FieldFormat::Port)
        );
    }

    #[test]
    fn bad_documents_are_rules_errors() {
        let err = FieldRules::from_toml_str("[[rules]]\nkind = \"string\"\n").unwrap_err();
        assert!(matches!(err, PipelineError::Rules(_)));

        let err = FieldRules::from_json_str(r#"{ "rules": [{ "path": "a", "format": "mac" }] }"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("field rules:"));
    }

    #[test]
    fn from_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("rules.json");
        std::fs::write(
            &json_path,
            r#"{ "rules": [{ "path": "name", "required": true }] }"#,
        )
        .unwrap();

        let rules = FieldRules::from_file(&json_path).unwrap();
        assert!(rules.rules[0].required);

        let missing = FieldRules::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, PipelineError::Rules(_)));
    }
}
