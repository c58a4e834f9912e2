use std::time::Duration;

use tracing::info;

use tuya_ac_bridge::{AcBridge, Config, MessageLogMode, TuyaClient};

const RECONCILE_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> tuya_ac_bridge::Result<()> {
    tracing_subscriber::fmt::init();

    let Config {
        access_id,
        access_secret,
        base_url,
        device_id,
        pairing_username,
        pairing_code,
        port,
        message_log,
    } = Config::from_env()?;

    let cloud = TuyaClient::new(access_id, access_secret).with_base_url(base_url);

    let mut builder = AcBridge::builder(cloud, device_id)
        .on_update(|update| info!(?update, "characteristic update"));
    if let Some(path) = message_log {
        builder = builder.message_log(MessageLogMode::Diffed, path);
    }
    let bridge = builder.build();

    info!(port, username = %pairing_username, "accessory ready");
    info!("pair with code {pairing_code}");

    bridge.run(RECONCILE_INTERVAL).await;
    Ok(())
}
