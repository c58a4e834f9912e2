mod bridge;
mod cloud;
mod config;
mod error;
mod handlers;
mod logger;
mod protocol;
mod reconcile;
mod state;

pub use bridge::{AcBridge, AcBridgeBuilder, DEFAULT_REFRESH_DELAY};
pub use cloud::TuyaClient;
pub use config::Config;
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use protocol::Properties;
pub use state::*;
