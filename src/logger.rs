use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::protocol::Properties;
use crate::state::DeviceState;

pub enum MessageLogMode {
    Full,
    Diffed,
}

/// NDJSON log of issued cloud commands and reconciliation cycles. In
/// `Diffed` mode a cycle line only carries the property codes whose values
/// changed since the previous logged cycle.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous: Option<Properties>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous: None,
        })
    }

    pub fn log_command(&mut self, code: &str, value: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "code": code,
            "value": value,
        });
        self.write_line(&entry);
    }

    pub fn log_cycle(&mut self, online: bool, properties: Option<&Properties>, state: &DeviceState) {
        if !online {
            let entry = json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "cycle",
                "online": false,
            });
            self.write_line(&entry);
            return;
        }

        let properties = match properties {
            Some(p) => p,
            None => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "cycle",
                    "online": true,
                    "state": state,
                });
                self.write_line(&entry);
                return;
            }
        };

        match self.mode {
            MessageLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "cycle",
                    "online": true,
                    "properties": properties,
                    "state": state,
                });
                self.write_line(&entry);
            }
            MessageLogMode::Diffed => {
                let mut changes = Map::new();
                for (code, value) in properties {
                    let unchanged = self
                        .previous
                        .as_ref()
                        .and_then(|prev| prev.get(code))
                        .is_some_and(|prev_value| prev_value == value);
                    if !unchanged {
                        changes.insert(code.clone(), value.clone());
                    }
                }
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "cycle",
                    "online": true,
                    "changes": changes,
                    "state": state,
                });
                self.write_line(&entry);
                self.previous = Some(properties.clone());
            }
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        let mut contents = String::new();
        std::fs::File::open(path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn props(pairs: &[(&str, Value)]) -> Properties {
        pairs
            .iter()
            .map(|(code, value)| (code.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn log_command_writes_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_command("T", &json!(24));

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "cmd");
        assert_eq!(lines[0]["code"], "T");
        assert_eq!(lines[0]["value"], 24);
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn offline_cycle_logs_flag_only() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_cycle(false, None, &DeviceState::default());

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "cycle");
        assert_eq!(lines[0]["online"], false);
        assert!(lines[0].get("properties").is_none());
    }

    #[test]
    fn full_mode_logs_properties_and_state() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        let p = props(&[("temperature", json!(24)), ("fan", json!(2))]);
        logger.log_cycle(true, Some(&p), &DeviceState::default());

        let lines = read_lines(path);
        assert_eq!(lines[0]["properties"]["temperature"], 24);
        assert_eq!(lines[0]["state"]["target_temperature"], 22);
    }

    #[test]
    fn diffed_mode_logs_only_changed_codes() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();
        let state = DeviceState::default();

        let p1 = props(&[("temperature", json!(24)), ("fan", json!(2))]);
        logger.log_cycle(true, Some(&p1), &state);
        let p2 = props(&[("temperature", json!(25)), ("fan", json!(2))]);
        logger.log_cycle(true, Some(&p2), &state);

        let lines = read_lines(path);
        assert_eq!(lines[0]["changes"]["temperature"], 24);
        assert_eq!(lines[0]["changes"]["fan"], 2);
        assert_eq!(lines[1]["changes"]["temperature"], 25);
        assert!(lines[1]["changes"].get("fan").is_none());
    }

    #[test]
    fn diffed_mode_no_changes_logs_empty_object() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();
        let state = DeviceState::default();

        let p = props(&[("temperature", json!(24))]);
        logger.log_cycle(true, Some(&p), &state);
        logger.log_cycle(true, Some(&p), &state);

        let lines = read_lines(path);
        assert_eq!(lines.len(), 2);
        assert!(lines[1]["changes"].as_object().unwrap().is_empty());
    }
}
