use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use crate::cloud::TuyaClient;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::Properties;
use crate::state::{
    fan_to_percent, DeviceState, HeatingCoolingState, TemperatureDisplayUnit, Update, SERVICES,
};

/// Delay between a handled write and its confirmation reconciliation.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(1);

type UpdateCallback = Box<dyn Fn(&Update) + Send + Sync>;

pub struct AcBridgeBuilder {
    cloud: TuyaClient,
    device_id: String,
    update_callbacks: Vec<UpdateCallback>,
    refresh_delay: Duration,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl AcBridgeBuilder {
    pub fn new(cloud: TuyaClient, device_id: impl Into<String>) -> Self {
        Self {
            cloud,
            device_id: device_id.into(),
            update_callbacks: Vec::new(),
            refresh_delay: DEFAULT_REFRESH_DELAY,
            log_mode: None,
            log_path: None,
        }
    }

    /// Register a characteristic-update sink. This is the outbound half of
    /// the accessory host boundary: every state change the bridge wants the
    /// controller to see arrives here.
    pub fn on_update(mut self, f: impl Fn(&Update) + Send + Sync + 'static) -> Self {
        self.update_callbacks.push(Box::new(f));
        self
    }

    pub fn refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> AcBridge {
        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => {
                Some(MessageLogger::new(mode, &path).expect("failed to open log file"))
            }
            _ => None,
        };

        AcBridge {
            inner: Arc::new(Inner {
                cloud: self.cloud,
                device_id: self.device_id,
                state: Mutex::new(DeviceState::default()),
                faulted: AtomicBool::new(false),
                update_callbacks: self.update_callbacks,
                refresh_delay: self.refresh_delay,
                logger: Mutex::new(logger),
            }),
        }
    }
}

/// The accessory core: believed device state, the cloud adapter, and the
/// outbound characteristic sinks. Cheap to clone; deferred reconciliations
/// are spawned from clones of this handle.
#[derive(Clone)]
pub struct AcBridge {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) cloud: TuyaClient,
    pub(crate) device_id: String,
    pub(crate) state: Mutex<DeviceState>,
    pub(crate) faulted: AtomicBool,
    update_callbacks: Vec<UpdateCallback>,
    pub(crate) refresh_delay: Duration,
    logger: Mutex<Option<MessageLogger>>,
}

impl AcBridge {
    pub fn builder(cloud: TuyaClient, device_id: impl Into<String>) -> AcBridgeBuilder {
        AcBridgeBuilder::new(cloud, device_id)
    }

    // -- Characteristic reads --

    pub fn power(&self) -> bool {
        self.state().power
    }

    pub fn current_temperature(&self) -> i64 {
        self.state().current_temperature
    }

    pub fn target_temperature(&self) -> i64 {
        self.state().target_temperature
    }

    pub fn current_heating_cooling(&self) -> HeatingCoolingState {
        self.state().current_state
    }

    pub fn target_heating_cooling(&self) -> HeatingCoolingState {
        self.state().target_state
    }

    /// The fan has no on/off of its own; it runs whenever the unit does.
    pub fn fan_active(&self) -> bool {
        self.state().power
    }

    pub fn rotation_percent(&self) -> u8 {
        fan_to_percent(self.state().fan_speed)
    }

    pub fn temperature_display_units(&self) -> TemperatureDisplayUnit {
        TemperatureDisplayUnit::Celsius
    }

    pub fn faulted(&self) -> bool {
        self.inner.faulted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DeviceState {
        self.state().clone()
    }

    // -- Internal plumbing --

    pub(crate) fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.inner.state.lock().expect("state lock poisoned")
    }

    pub(crate) fn push(&self, update: &Update) {
        for cb in &self.inner.update_callbacks {
            cb(update);
        }
    }

    pub(crate) fn push_all(&self, updates: &[Update]) {
        for update in updates {
            self.push(update);
        }
    }

    /// Flag or clear the fault characteristic on every exposed service.
    pub(crate) fn set_fault(&self, fault: bool) {
        self.inner.faulted.store(fault, Ordering::Relaxed);
        for service in SERVICES {
            self.push(&Update::Fault { service, fault });
        }
    }

    pub(crate) fn log_command(&self, code: &str, value: &Value) {
        if let Some(logger) = self
            .inner
            .logger
            .lock()
            .expect("logger lock poisoned")
            .as_mut()
        {
            logger.log_command(code, value);
        }
    }

    pub(crate) fn log_cycle(&self, online: bool, properties: Option<&Properties>) {
        let mut guard = self.inner.logger.lock().expect("logger lock poisoned");
        if let Some(logger) = guard.as_mut() {
            let state = self.snapshot();
            logger.log_cycle(online, properties, &state);
        }
    }
}
