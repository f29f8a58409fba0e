use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ringbridge_core::{BridgeConfig, DeviceStateBridge};
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod mqtt;
mod source;
mod stdout;
#[cfg(test)]
mod cli_tests;
#[cfg(test)]
mod source_tests;

use mqtt::{MqttBroker, MqttSettings};
use source::FileSource;
use stdout::{OutputFormat, StdoutBroker};

#[derive(Debug, Parser)]
#[command(name = "ringbridged")]
#[command(about = "Alarm device state bridge to MQTT")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file holding the provider's device snapshot.
    #[arg(long, default_value = "./device.json")]
    snapshot: PathBuf,

    #[arg(long, default_value = "ring")]
    ring_topic: String,

    #[arg(long, default_value = "alarm")]
    component: String,

    /// Pause before publishing `online`. While it runs, `run` does not
    /// react to ctrl-c or snapshot polls.
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    Topics,
    Once {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Run {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value_t = 1883)]
        port: u16,
        #[arg(long, default_value = "ringbridged")]
        client_id: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value_t = 30)]
        keep_alive_secs: u64,
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = BridgeConfig {
        ring_topic: cli.ring_topic.clone(),
        component: cli.component.clone(),
        online_settle_delay: Duration::from_millis(cli.settle_ms),
        ..BridgeConfig::default()
    };

    let source = Arc::new(FileSource::load(&cli.snapshot)?);
    let mut bridge = DeviceStateBridge::new(Arc::clone(&source), config);

    match cli.command {
        Command::Topics => {
            println!("{}", serde_json::to_string_pretty(bridge.topics())?);
        }
        Command::Once { format } => {
            let broker = StdoutBroker::new(format);
            bridge.publish_attributes(&broker).await;
            bridge.mark_online(&broker).await;
        }
        Command::Run {
            host,
            port,
            client_id,
            username,
            password,
            keep_alive_secs,
            poll_ms,
        } => {
            let settings = MqttSettings {
                host,
                port,
                client_id,
                username,
                password,
                keep_alive: Duration::from_secs(keep_alive_secs),
            };
            run_loop(&mut bridge, &source, &settings, Duration::from_millis(poll_ms)).await?;
        }
    }

    Ok(())
}

async fn run_loop(
    bridge: &mut DeviceStateBridge<FileSource>,
    source: &FileSource,
    settings: &MqttSettings,
    poll: Duration,
) -> Result<()> {
    let (broker, mut session) = MqttBroker::connect(settings);
    let broker = Arc::new(broker);
    let mut ticker = interval_at(Instant::now() + poll, poll);

    info!(device = %bridge.topics().device, host = %settings.host, port = settings.port, "bridge running");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            Some(()) = session.connected.recv() => {
                bridge.attach_and_publish(&broker).await;
            }
            _ = ticker.tick() => {
                if let Err(err) = source.refresh() {
                    warn!(error = %err, "snapshot refresh failed");
                }
            }
        }
    }

    bridge.mark_offline(broker.as_ref()).await;
    broker.disconnect().await?;
    session.finish().await;

    Ok(())
}
