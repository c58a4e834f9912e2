use serde_json::json;
use tracing::warn;

use crate::bridge::AcBridge;
use crate::protocol::{CMD_FAN, CMD_MODE, CMD_POWER_OFF, CMD_POWER_ON, CMD_TEMPERATURE};
use crate::state::{
    clamp_temperature, cloud_mode_for, fan_to_percent, percent_to_fan, target_state_for,
    HeatingCoolingState, Update,
};

/// Write-path command handlers. Each returns once the cloud command has been
/// issued; the authoritative confirmation runs as a detached refresh. Command
/// failures are logged and the optimistic update applied anyway; the next
/// reconciliation reverts it if the device disagrees.
impl AcBridge {
    pub async fn set_power(&self, on: bool) {
        let code = if on { CMD_POWER_ON } else { CMD_POWER_OFF };
        self.log_command(code, &json!(code));
        let result = if on {
            self.inner.cloud.power_on(&self.inner.device_id).await
        } else {
            self.inner.cloud.power_off(&self.inner.device_id).await
        };
        if let Err(e) = result {
            warn!(on, error = %e, "power command failed");
        }

        let mut updates = Vec::new();
        {
            let mut state = self.state();
            state.power = on;
            // Mode, temperature and fan survive a power-off untouched for
            // the next power-on.
            let projected = target_state_for(state.mode, on);
            state.target_state = projected;
            state.current_state = projected;
            updates.push(Update::CurrentHeatingCooling(projected));
            updates.push(Update::TargetHeatingCooling(projected));
            updates.push(Update::FanActive(on));
        }
        self.push_all(&updates);
        self.schedule_refresh();
    }

    /// Target heating/cooling write. Only Cool/Heat/Auto translate to a
    /// cloud command; Off is accepted from the protocol layer but power-off
    /// belongs exclusively to the switch characteristic.
    pub async fn set_target_state(&self, requested: HeatingCoolingState) {
        if let Some(mode) = cloud_mode_for(requested) {
            // The unit rejects mode changes while off: power on first and
            // record it before the mode command goes out.
            if !self.state().power {
                self.log_command(CMD_POWER_ON, &json!(CMD_POWER_ON));
                if let Err(e) = self.inner.cloud.power_on(&self.inner.device_id).await {
                    warn!(error = %e, "power-on before mode change failed");
                }
                self.state().power = true;
            }

            self.log_command(CMD_MODE, &json!(mode));
            if let Err(e) = self.inner.cloud.set_mode(&self.inner.device_id, mode).await {
                warn!(mode, error = %e, "mode command failed");
            }

            {
                let mut state = self.state();
                state.mode = mode;
                state.target_state = requested;
                state.current_state = requested;
            }
            self.push(&Update::CurrentHeatingCooling(requested));
        }
        self.schedule_refresh();
    }

    pub async fn set_target_temperature(&self, celsius: f64) {
        let target = clamp_temperature(celsius.round() as i64);
        self.log_command(CMD_TEMPERATURE, &json!(target));
        if let Err(e) = self
            .inner
            .cloud
            .set_temperature(&self.inner.device_id, target)
            .await
        {
            warn!(target, error = %e, "temperature command failed");
        }
        self.state().target_temperature = target;
        self.schedule_refresh();
    }

    /// Rotation percent write. A request that lands on the current 3-level
    /// speed is a complete no-op: no command, no confirmation pass.
    pub async fn set_rotation_percent(&self, percent: u8) {
        let speed = percent_to_fan(percent);
        if speed == self.state().fan_speed {
            return;
        }

        self.log_command(CMD_FAN, &json!(speed));
        if let Err(e) = self
            .inner
            .cloud
            .set_fan_speed(&self.inner.device_id, speed)
            .await
        {
            warn!(speed, error = %e, "fan command failed");
        }
        self.state().fan_speed = speed;
        self.push(&Update::RotationPercent(fan_to_percent(speed)));
        self.schedule_refresh();
    }

    /// Fan active writes are accepted and ignored: the fan runs whenever
    /// the unit is powered, there is nothing to command.
    pub async fn set_fan_active(&self, _active: bool) {}
}
