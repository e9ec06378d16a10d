use emuconfig::get_config;
use emudevice::{EmulatedSwitch, SwitchOptions};
use emussdp::SsdpMultiplexer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========== PHASE 1 : Configuration et logging ==========

    let config = get_config();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "📡 EMUSwitch starting (config dir: {})",
        config.get_config_dir()
    );

    // ========== PHASE 2 : Création des devices émulés ==========

    let multiplexer = SsdpMultiplexer::shared();

    let device_configs = config.get_devices()?;
    if device_configs.is_empty() {
        warn!("⚠️ No devices configured, nothing to emulate");
    }

    let mut devices = Vec::new();
    for device_config in device_configs {
        let device = EmulatedSwitch::start(
            SwitchOptions::from(device_config),
            SsdpMultiplexer::shared(),
        )
        .await?;
        info!("✅ {} ready at {}", device.friendly_name(), device.location());
        devices.push(device);
    }

    info!("✅ EMUSwitch is ready! ({} device(s))", devices.len());
    info!("Press Ctrl+C to stop...");

    // ========== PHASE 3 : Attente et arrêt gracieux ==========

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C reçu, arrêt gracieux");

    for device in &devices {
        device.close();
    }
    multiplexer.shutdown();

    Ok(())
}
