use serde::Serialize;

/// Heating/cooling state as the local protocol numbers it. Shared between
/// the current and target characteristics; `Auto` is only ever a target on
/// real hardware but the device reports no finer grain, so both sides use
/// the full set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeatingCoolingState {
    Off,
    Heat,
    Cool,
    Auto,
}

impl HeatingCoolingState {
    pub fn as_u8(&self) -> u8 {
        match self {
            HeatingCoolingState::Off => 0,
            HeatingCoolingState::Heat => 1,
            HeatingCoolingState::Cool => 2,
            HeatingCoolingState::Auto => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureDisplayUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureDisplayUnit {
    pub fn as_u8(&self) -> u8 {
        match self {
            TemperatureDisplayUnit::Celsius => 0,
            TemperatureDisplayUnit::Fahrenheit => 1,
        }
    }
}

/// The three services the accessory exposes. Each carries its own fault
/// characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Thermostat,
    Fan,
    PowerSwitch,
}

pub const SERVICES: [Service; 3] = [Service::Thermostat, Service::Fan, Service::PowerSwitch];

/// Characteristic pushes toward the accessory host.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    CurrentHeatingCooling(HeatingCoolingState),
    TargetHeatingCooling(HeatingCoolingState),
    CurrentTemperature(i64),
    TargetTemperature(i64),
    FanActive(bool),
    RotationPercent(u8),
    Power(bool),
    Fault { service: Service, fault: bool },
}

/// The accessory's believed device state. One instance per bridge; mutated
/// optimistically by command handlers and authoritatively by reconciliation.
/// Last writer wins.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceState {
    pub power: bool,
    pub current_temperature: i64,
    pub target_temperature: i64,
    /// Cloud 3-level fan speed, 1..=3.
    pub fan_speed: i64,
    /// Cloud mode code: 0 cool, 1 heat, 4 auto. Other codes exist but have
    /// no local mapping.
    pub mode: i64,
    pub current_state: HeatingCoolingState,
    pub target_state: HeatingCoolingState,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            power: false,
            current_temperature: 20,
            target_temperature: 22,
            fan_speed: 1,
            mode: 0,
            current_state: HeatingCoolingState::Off,
            target_state: HeatingCoolingState::Off,
        }
    }
}

/// Mapped cloud modes only. Codes 2 and 3 are undefined in both directions;
/// callers decide the fallback.
pub fn mode_target(mode: i64) -> Option<HeatingCoolingState> {
    match mode {
        0 => Some(HeatingCoolingState::Cool),
        1 => Some(HeatingCoolingState::Heat),
        4 => Some(HeatingCoolingState::Auto),
        _ => None,
    }
}

/// Project power + cloud mode into the local target state. Unmapped codes
/// fall back to Cool while powered.
pub fn target_state_for(mode: i64, power: bool) -> HeatingCoolingState {
    if power {
        mode_target(mode).unwrap_or(HeatingCoolingState::Cool)
    } else {
        HeatingCoolingState::Off
    }
}

/// Reverse table. Off has no cloud mode; power is a separate axis.
pub fn cloud_mode_for(state: HeatingCoolingState) -> Option<i64> {
    match state {
        HeatingCoolingState::Cool => Some(0),
        HeatingCoolingState::Heat => Some(1),
        HeatingCoolingState::Auto => Some(4),
        HeatingCoolingState::Off => None,
    }
}

pub fn fan_to_percent(speed: i64) -> u8 {
    match speed {
        1 => 0,
        2 => 50,
        3 => 100,
        _ => 0,
    }
}

pub fn percent_to_fan(percent: u8) -> i64 {
    if percent <= 25 {
        1
    } else if percent <= 75 {
        2
    } else {
        3
    }
}

pub fn clamp_temperature(celsius: i64) -> i64 {
    celsius.clamp(16, 30)
}

pub fn clamp_fan(speed: i64) -> i64 {
    speed.clamp(1, 3)
}

pub fn clamp_mode(mode: i64) -> i64 {
    mode.clamp(0, 4)
}
