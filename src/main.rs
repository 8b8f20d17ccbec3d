use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use domo_config::{
    device_type_uri, ConfigDescription, ConfigDescriptionProvider, ConfigDescriptionRegistry,
    ConfigParameter, ParameterType,
};
use domo_core::types::{DeviceInstanceId, DeviceTypeId};
use domo_discovery::{
    DiscoveryConfig, DiscoveryCoordinator, DiscoveryListener, DiscoveryResult, ResultTtl,
    ScanContext, ScanOutcome, Scanner, ScannerConfig,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Domo - smart home device discovery and configuration demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a discovery configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to let discovery run before shutting down (seconds)
    #[arg(short, long, default_value_t = 5)]
    duration: u64,
}

/// Scanner that fabricates a few devices, the way a network scan would
/// surface them one by one.
struct DemoScanner;

#[async_trait]
impl Scanner for DemoScanner {
    fn scanner_id(&self) -> &str {
        "demo"
    }

    async fn scan(&self, ctx: ScanContext) -> anyhow::Result<()> {
        let type_id = DeviceTypeId::new("demo", "lamp")?;
        for serial in ["0001", "0002", "0003"] {
            if ctx.is_cancelled() {
                break;
            }
            let id = DeviceInstanceId::new(type_id.clone(), serial)?;
            ctx.emit(
                DiscoveryResult::builder(id)
                    .label(format!("Demo lamp {serial}"))
                    .property("serial", serial)
                    .representation_property("serial")
                    .ttl(ResultTtl::Seconds(300))
                    .build(),
            );
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(())
    }
}

/// Listener that logs every discovery notification
struct LogListener;

impl DiscoveryListener for LogListener {
    fn on_result_new(&self, result: &DiscoveryResult) {
        info!(instance_id = %result.instance_id, label = %result.label, "Discovered");
    }

    fn on_result_updated(&self, result: &DiscoveryResult) {
        info!(instance_id = %result.instance_id, "Rediscovered");
    }

    fn on_result_expired(&self, result: &DiscoveryResult) {
        info!(instance_id = %result.instance_id, "Expired");
    }

    fn on_scan_finished(&self, scanner_id: &str, outcome: ScanOutcome) {
        info!(scanner_id, ?outcome, "Scan finished");
    }
}

/// Provider describing the demo lamp's configuration surface
struct DemoProvider;

impl ConfigDescriptionProvider for DemoProvider {
    fn config_descriptions(&self, locale: Option<&str>) -> anyhow::Result<Vec<ConfigDescription>> {
        let type_id = DeviceTypeId::new("demo", "lamp")?;
        let label = match locale {
            Some(l) if l.starts_with("de") => "Helligkeit",
            _ => "Brightness",
        };
        Ok(vec![ConfigDescription::new(device_type_uri(&type_id))
            .with_parameter(
                ConfigParameter::new("brightness", ParameterType::Integer)
                    .with_label(label)
                    .with_range(0.0, 100.0),
            )])
    }

    fn config_description(
        &self,
        uri: &Url,
        locale: Option<&str>,
    ) -> anyhow::Result<Option<ConfigDescription>> {
        Ok(self
            .config_descriptions(locale)?
            .into_iter()
            .find(|d| &d.uri == uri))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path:?}"))?;
            serde_yaml::from_str(&content).context("Failed to parse config file")?
        }
        None => DiscoveryConfig::default(),
    };

    let registry = ConfigDescriptionRegistry::new();
    registry.register(Arc::new(DemoProvider));

    let coordinator = DiscoveryCoordinator::new(config)?;
    coordinator.subscribe(Arc::new(LogListener));
    coordinator.start();

    coordinator.register(
        Arc::new(DemoScanner),
        ScannerConfig::with_timeout(Duration::from_secs(30)),
    )?;

    let started = coordinator.start_all_scans();
    info!(started, "Discovery started");

    tokio::time::sleep(Duration::from_secs(args.duration)).await;

    // Resolve the configuration surface of every discovered device type.
    for result in coordinator.results() {
        let uri = device_type_uri(result.instance_id.type_id());
        match registry.get(&uri, None) {
            Some(description) => {
                info!(
                    instance_id = %result.instance_id,
                    uri = %uri,
                    parameters = description.parameters.len(),
                    "Configuration description resolved"
                );
            }
            None => {
                info!(instance_id = %result.instance_id, uri = %uri, "No configuration description")
            }
        }
    }

    coordinator.shutdown();
    info!("Shutdown complete");
    Ok(())
}
