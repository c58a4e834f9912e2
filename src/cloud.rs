use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{self, Properties};
use crate::state::{clamp_fan, clamp_mode, clamp_temperature};
use crate::Result;

/// Thin typed client over the vendor OpenAPI. Request signing and token
/// refresh live in the fronting auth layer; this client speaks the endpoint
/// shapes and carries the identity headers.
///
/// Every operation returns `Result`; callers decide how a failure degrades
/// (the reconciler treats it as offline/absent, handlers log and move on).
pub struct TuyaClient {
    http: reqwest::Client,
    base_url: String,
    access_id: String,
    access_secret: String,
}

impl TuyaClient {
    pub fn new(access_id: impl Into<String>, access_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: protocol::DEFAULT_BASE_URL.to_string(),
            access_id: access_id.into(),
            access_secret: access_secret.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("client_id", &self.access_id)
            .header("access_token", &self.access_secret)
            .header("t", Utc::now().timestamp_millis().to_string())
            .header("nonce", Uuid::new_v4().to_string())
    }

    /// Device connectivity as the cloud reports it. An envelope the cloud
    /// rejected reads as offline; callers cannot tell the two apart, and
    /// do not need to.
    pub async fn is_online(&self, device_id: &str) -> Result<bool> {
        let body: Value = self
            .request(Method::GET, &protocol::thing_path(device_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if protocol::check_success(&body).is_err() {
            return Ok(false);
        }
        Ok(protocol::parse_online(&body))
    }

    /// Fetch the fixed property code set from the device shadow. An empty
    /// map is a valid result and distinct from an error.
    pub async fn get_properties(&self, device_id: &str) -> Result<Properties> {
        let body: Value = self
            .request(Method::GET, &protocol::properties_path(device_id))
            .query(&[("codes", protocol::PROPERTY_CODES)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        protocol::check_success(&body)?;
        protocol::parse_properties(&body)
    }

    /// Issue a single control command.
    pub async fn send_command(&self, device_id: &str, code: &str, value: Value) -> Result<()> {
        let payload = protocol::command_body(code, &value);
        let body: Value = self
            .request(Method::POST, &protocol::commands_path(device_id))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        protocol::check_success(&body)?;
        debug!(code, value = %value, "command sent");
        Ok(())
    }

    pub async fn power_on(&self, device_id: &str) -> Result<()> {
        self.send_command(device_id, protocol::CMD_POWER_ON, json!(protocol::CMD_POWER_ON))
            .await
    }

    pub async fn power_off(&self, device_id: &str) -> Result<()> {
        self.send_command(device_id, protocol::CMD_POWER_OFF, json!(protocol::CMD_POWER_OFF))
            .await
    }

    /// Clamped to [16, 30] before transmission.
    pub async fn set_temperature(&self, device_id: &str, celsius: i64) -> Result<()> {
        self.send_command(
            device_id,
            protocol::CMD_TEMPERATURE,
            json!(clamp_temperature(celsius)),
        )
        .await
    }

    /// Clamped to [1, 3] before transmission.
    pub async fn set_fan_speed(&self, device_id: &str, speed: i64) -> Result<()> {
        self.send_command(device_id, protocol::CMD_FAN, json!(clamp_fan(speed)))
            .await
    }

    /// Clamped to [0, 4] before transmission.
    pub async fn set_mode(&self, device_id: &str, mode: i64) -> Result<()> {
        self.send_command(device_id, protocol::CMD_MODE, json!(clamp_mode(mode)))
            .await
    }
}
