use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::bridge::AcBridge;
use crate::protocol::{
    Properties, PROP_FAN, PROP_MODE, PROP_SWITCH_POWER, PROP_TEMPERATURE,
};
use crate::state::{fan_to_percent, mode_target, target_state_for, Update};

impl AcBridge {
    /// One poll-and-merge cycle: online check, fault flags, property fetch,
    /// full-state overwrite. Cycles are idempotent; an overlap with a
    /// deferred confirmation pass repeats the same overwrite.
    pub async fn refresh(&self) {
        let online = match self.inner.cloud.is_online(&self.inner.device_id).await {
            Ok(online) => online,
            Err(e) => {
                warn!(error = %e, "online check failed");
                false
            }
        };

        if !online {
            debug!("device offline");
            self.set_fault(true);
            self.log_cycle(false, None);
            return;
        }
        self.set_fault(false);

        let properties = match self.inner.cloud.get_properties(&self.inner.device_id).await {
            Ok(properties) => properties,
            Err(e) => {
                warn!(error = %e, "property fetch failed");
                self.log_cycle(true, None);
                return;
            }
        };

        self.apply_properties(&properties);
        self.log_cycle(true, Some(&properties));

        let state = self.snapshot();
        debug!(
            power = state.power,
            temperature = state.target_temperature,
            fan = state.fan_speed,
            mode = state.mode,
            "device status updated"
        );
    }

    /// Merge a property report into the model. `switch_power` is applied
    /// first; the mode branch layers its projection over the just-updated
    /// power value and only while the unit is on; mode is meaningless off.
    fn apply_properties(&self, properties: &Properties) {
        let mut updates = Vec::new();
        {
            let mut state = self.state();

            if let Some(power) = properties.get(PROP_SWITCH_POWER).and_then(Value::as_bool) {
                state.power = power;
                let projected = target_state_for(state.mode, power);
                state.target_state = projected;
                state.current_state = projected;
                updates.push(Update::CurrentHeatingCooling(projected));
                updates.push(Update::TargetHeatingCooling(projected));
                updates.push(Update::FanActive(power));
                updates.push(Update::Power(power));
            }

            if let Some(temperature) = properties.get(PROP_TEMPERATURE).and_then(Value::as_i64) {
                state.target_temperature = temperature;
                state.current_temperature = temperature;
                updates.push(Update::TargetTemperature(temperature));
                updates.push(Update::CurrentTemperature(temperature));
            }

            if let Some(fan) = properties.get(PROP_FAN).and_then(Value::as_i64) {
                state.fan_speed = fan;
                updates.push(Update::RotationPercent(fan_to_percent(fan)));
            }

            if let Some(mode) = properties.get(PROP_MODE).and_then(Value::as_i64) {
                state.mode = mode;
                if state.power
                    && let Some(projected) = mode_target(mode)
                {
                    state.target_state = projected;
                    state.current_state = projected;
                    updates.push(Update::TargetHeatingCooling(projected));
                    updates.push(Update::CurrentHeatingCooling(projected));
                }
            }
        }
        self.push_all(&updates);
    }

    /// Fire-and-forget confirmation pass after a handled write: no handle,
    /// no cancellation, completion never awaited.
    pub(crate) fn schedule_refresh(&self) {
        let bridge = self.clone();
        let delay = self.inner.refresh_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bridge.refresh().await;
        });
    }

    /// Reconcile immediately, then on every interval tick, indefinitely.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }
}
