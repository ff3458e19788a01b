//! A pipeline backed by `StageEngine` and `FieldRules`, with no network hop.

use std::sync::Arc;

use nasnet_validation::{
    FieldFormat, FieldKind, FieldRule, FieldRules, PipelineConfig, RiskLevel, Severity, StageEngine,
    StageName, StageStatus, ValidationError, ValidationInput, ValidationPipeline,
    ValidationRequest,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn route_needs_nexthop(request: &ValidationRequest) -> Vec<ValidationError> {
    if request.resource_type != "route" {
        return Vec::new();
    }
    let has = |key: &str| request.data.get(key).is_some_and(|v| !v.is_null());
    if has("gateway") || has("interface") {
        Vec::new()
    } else {
        vec![
            ValidationError::new(
                StageName::Dependencies,
                "ROUTE_NO_NEXTHOP",
                "route needs a gateway or an interface",
            )
            .with_field("gateway")
                .with_suggestion("Set a gateway address or an outgoing interface"),
        ]
    }
}

fn default_vlan(request: &ValidationRequest) -> Vec<ValidationError> {
    if request.data.get("vlan-id") == Some(&json!(1)) {
        vec![
            ValidationError::warning(
                StageName::Network,
                "VLAN_DEFAULT_ID",
                "VLAN 1 is usually the default VLAN",
            )
            .with_field("vlan-id"),
        ]
    } else {
        Vec::new()
    }
}

fn pipeline(level: RiskLevel) -> ValidationPipeline {
    let mut engine = StageEngine::new();
    engine
        .register(StageName::Dependencies, Arc::new(route_needs_nexthop))
        .register(StageName::Network, Arc::new(default_vlan));

    let rules = FieldRules::new(vec![
        FieldRule::new("dst-address").format(FieldFormat::Cidr),
        FieldRule::new("gateway").format(FieldFormat::Ipv4),
        FieldRule::new("vlan-id").kind(FieldKind::Integer),
    ]);

    ValidationPipeline::builder(Arc::new(engine))
        .config(PipelineConfig::new(level))
        .schema(Arc::new(rules))
        .build()
}

#[tokio::test]
async fn route_without_nexthop_fails_dependencies() {
    let result = pipeline(RiskLevel::Medium)
        .validate(ValidationInput::new("route", json!({ "dst-address": "10.0.0.0/8" })))
        .await;

    assert!(!result.is_valid);
    assert_eq!(result.failed_stages(), vec![StageName::Dependencies]);
    let issue = &result.field_errors["gateway"][0];
    assert_eq!(issue.code, "ROUTE_NO_NEXTHOP");
    assert_eq!(issue.suggestions, vec!["Set a gateway address or an outgoing interface"]);

    let unchecked = result.stage(StageName::CrossResource).unwrap();
    assert_eq!(unchecked.status, StageStatus::Passed);
    assert_eq!(unchecked.metadata.as_ref().unwrap()["checked"], json!(false));
}

#[tokio::test]
async fn bad_cidr_is_caught_locally() {
    let result = pipeline(RiskLevel::Low)
        .validate(ValidationInput::new(
            "route",
            json!({ "dst-address": "192.168.1.0/33", "gateway": "10.0.0.1" }),
        ))
        .await;

    assert!(!result.is_valid);
    let issue = &result.field_errors["dst-address"][0];
    assert_eq!(issue.stage, StageName::Schema);
    assert_eq!(issue.code, "INVALID_FORMAT");
    assert_eq!(result.stage(StageName::Syntax).unwrap().status, StageStatus::Skipped);
}

#[tokio::test]
async fn default_vlan_warns_without_failing() {
    let result = pipeline(RiskLevel::High)
        .validate(ValidationInput::new("vlan", json!({ "vlan-id": 1, "interface": "ether1" })))
        .await;

    assert!(result.is_valid);
    assert_eq!(result.warning_count(), 1);
    assert_eq!(
        result
            .field_issues("vlan-id", Severity::Warning)
            .map(|issue| issue.code.as_str())
            .collect::<Vec<_>>(),
        vec!["VLAN_DEFAULT_ID"]
    );
    assert_eq!(
        result.summary(),
        "validation passed: 6 stages run, 1 warning"
    );
}
