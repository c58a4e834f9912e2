use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://openapi.tuyaeu.com";

pub const PROP_SWITCH_POWER: &str = "switch_power";
pub const PROP_FAN: &str = "fan";
pub const PROP_MODE: &str = "mode";
pub const PROP_TEMPERATURE: &str = "temperature";

/// Property codes fetched on every reconciliation, comma-joined for the
/// `codes` query parameter.
pub const PROPERTY_CODES: &str = "switch_power,fan,mode,temperature";

/// Command codes understood by the IR blaster backing the unit.
pub const CMD_POWER_ON: &str = "PowerOn";
pub const CMD_POWER_OFF: &str = "PowerOff";
pub const CMD_TEMPERATURE: &str = "T";
pub const CMD_FAN: &str = "F";
pub const CMD_MODE: &str = "M";

/// Flat code -> value map as reported by the device shadow.
pub type Properties = BTreeMap<String, Value>;

pub fn thing_path(device_id: &str) -> String {
    format!("/v2.0/cloud/thing/{device_id}")
}

pub fn properties_path(device_id: &str) -> String {
    format!("/v2.0/cloud/thing/{device_id}/shadow/properties")
}

pub fn commands_path(device_id: &str) -> String {
    format!("/v1.0/devices/{device_id}/commands")
}

pub fn command_body(code: &str, value: &Value) -> Value {
    json!({
        "commands": [{
            "code": code,
            "value": value
        }]
    })
}

/// Every OpenAPI response carries a `success` flag; `false` means the call
/// was transported fine but rejected (bad command, unknown device, ...).
pub fn check_success(body: &Value) -> Result<()> {
    if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }
    Err(Error::Api {
        code: body.get("code").and_then(Value::as_i64),
        msg: body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string(),
    })
}

pub fn parse_online(body: &Value) -> bool {
    body.pointer("/result/is_online")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Flatten `result.properties` into a code -> value map. An empty array is a
/// valid (empty) result; a missing array is a malformed envelope.
pub fn parse_properties(body: &Value) -> Result<Properties> {
    let entries = match body.pointer("/result/properties") {
        Some(Value::Array(entries)) => entries,
        _ => return Err(Error::Protocol("missing properties array".to_string())),
    };
    let mut properties = Properties::new();
    for entry in entries {
        if let Some(code) = entry.get("code").and_then(Value::as_str)
            && let Some(value) = entry.get("value")
        {
            properties.insert(code.to_string(), value.clone());
        }
    }
    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_body_structure() {
        let body = command_body("T", &json!(24));
        let commands = body["commands"].as_array().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["code"], "T");
        assert_eq!(commands[0]["value"], 24);
    }

    #[test]
    fn command_body_string_value() {
        let body = command_body("PowerOn", &json!("PowerOn"));
        assert_eq!(body["commands"][0]["value"], "PowerOn");
    }

    #[test]
    fn paths_embed_device_id() {
        assert_eq!(thing_path("dev1"), "/v2.0/cloud/thing/dev1");
        assert_eq!(
            properties_path("dev1"),
            "/v2.0/cloud/thing/dev1/shadow/properties"
        );
        assert_eq!(commands_path("dev1"), "/v1.0/devices/dev1/commands");
    }

    #[test]
    fn check_success_ok() {
        assert!(check_success(&json!({"success": true, "result": {}})).is_ok());
    }

    #[test]
    fn check_success_failure_carries_code_and_msg() {
        let body = json!({"success": false, "code": 1106, "msg": "permission deny"});
        let err = check_success(&body).unwrap_err();
        match err {
            Error::Api { code, msg } => {
                assert_eq!(code, Some(1106));
                assert_eq!(msg, "permission deny");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn parse_online_variants() {
        assert!(parse_online(
            &json!({"success": true, "result": {"is_online": true}})
        ));
        assert!(!parse_online(
            &json!({"success": true, "result": {"is_online": false}})
        ));
        assert!(!parse_online(&json!({"success": true, "result": {}})));
        assert!(!parse_online(&json!({})));
    }

    #[test]
    fn parse_properties_builds_map() {
        let body = json!({
            "success": true,
            "result": {
                "properties": [
                    {"code": "switch_power", "value": true},
                    {"code": "temperature", "value": 24},
                    {"code": "fan", "value": 2},
                    {"code": "mode", "value": 1}
                ]
            }
        });
        let props = parse_properties(&body).unwrap();
        assert_eq!(props.len(), 4);
        assert_eq!(props["switch_power"], true);
        assert_eq!(props["temperature"], 24);
    }

    #[test]
    fn parse_properties_empty_array_is_ok() {
        let body = json!({"success": true, "result": {"properties": []}});
        let props = parse_properties(&body).unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn parse_properties_missing_array_is_error() {
        let body = json!({"success": true, "result": {}});
        assert!(matches!(
            parse_properties(&body),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn parse_properties_skips_malformed_entries() {
        let body = json!({
            "success": true,
            "result": {
                "properties": [
                    {"code": "temperature", "value": 22},
                    {"value": 9},
                    {"code": "fan"}
                ]
            }
        });
        let props = parse_properties(&body).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props["temperature"], 22);
    }
}
