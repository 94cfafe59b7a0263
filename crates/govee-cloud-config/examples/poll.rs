// Poll the Govee cloud on the configured interval and print readings.
//
//   cargo run -p govee-cloud-config --example poll -- [path/to/config.toml]
//
// Credentials come from the config file or GOVEE_EMAIL / GOVEE_PASSWORD.
// Set RUST_LOG=debug to see individual requests.

use std::path::PathBuf;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use govee_cloud_config::{config_path, load_config_from, resolve};
use govee_cloud_core::{Poller, Snapshot};

fn print_readings(snapshot: &Snapshot) -> Result<(), serde_json::Error> {
    let readings = snapshot.readings(Utc::now());
    println!("{}", serde_json::to_string_pretty(&readings)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map_or_else(config_path, PathBuf::from);
    let config = load_config_from(&path)?;
    let poller = Poller::new(resolve(&config)?)?;

    let snapshot = poller.start().await?;
    for entity in poller.entities()? {
        info!(
            unique_id = %entity.unique_id,
            unit = entity.unit.unwrap_or("-"),
            "{}",
            entity.name
        );
    }
    print_readings(&snapshot)?;

    let mut updates = poller.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    print_readings(&snapshot)?;
                }
            }
        }
    }

    poller.stop().await;
    Ok(())
}
