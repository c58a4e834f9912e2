use std::env;

use crate::protocol::DEFAULT_BASE_URL;
use crate::{Error, Result};

const DEFAULT_PORT: u16 = 65535;

/// Environment configuration surface. Missing or malformed values are the
/// only fatal errors in the process, raised before anything is started.
#[derive(Debug, Clone)]
pub struct Config {
    pub access_id: String,
    pub access_secret: String,
    pub base_url: String,
    pub device_id: String,
    pub pairing_username: String,
    pub pairing_code: String,
    pub port: u16,
    /// Optional NDJSON message log path.
    pub message_log: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("HOMEKIT_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("HOMEKIT_PORT is not a port number: {raw}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            access_id: require(&lookup, "TUYA_ACCESS_ID")?,
            access_secret: require(&lookup, "TUYA_ACCESS_SECRET")?,
            base_url: lookup("TUYA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            device_id: require(&lookup, "TUYA_DEVICE_ID")?,
            pairing_username: require(&lookup, "HOMEKIT_USERNAME")?,
            pairing_code: require(&lookup, "HOMEKIT_PIN")?,
            port,
            message_log: lookup("AC_MESSAGE_LOG"),
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        env(&[
            ("TUYA_ACCESS_ID", "id"),
            ("TUYA_ACCESS_SECRET", "secret"),
            ("TUYA_DEVICE_ID", "dev1"),
            ("HOMEKIT_USERNAME", "AA:BB:CC:DD:EE:FF"),
            ("HOMEKIT_PIN", "031-45-154"),
        ])
    }

    #[test]
    fn minimal_config_applies_defaults() {
        let vars = minimal();
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.port, 65535);
        assert!(config.message_log.is_none());
        assert_eq!(config.device_id, "dev1");
    }

    #[test]
    fn overrides_are_honored() {
        let mut vars = minimal();
        vars.insert("TUYA_BASE_URL".to_string(), "http://localhost:1".to_string());
        vars.insert("HOMEKIT_PORT".to_string(), "51826".to_string());
        vars.insert("AC_MESSAGE_LOG".to_string(), "/tmp/ac.ndjson".to_string());
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.base_url, "http://localhost:1");
        assert_eq!(config.port, 51826);
        assert_eq!(config.message_log.as_deref(), Some("/tmp/ac.ndjson"));
    }

    #[test]
    fn missing_required_var_is_config_error() {
        let mut vars = minimal();
        vars.remove("TUYA_DEVICE_ID");
        let err = Config::from_lookup(|key| vars.get(key).cloned()).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("TUYA_DEVICE_ID")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_port_is_config_error() {
        let mut vars = minimal();
        vars.insert("HOMEKIT_PORT".to_string(), "not-a-port".to_string());
        let err = Config::from_lookup(|key| vars.get(key).cloned()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
