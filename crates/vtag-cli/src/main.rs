//! vtag - virtual tag reader demo.
//!
//! Opens one emulated reader session against mock host collaborators and
//! scripts a tag being placed on and taken off the reader a few times,
//! reading its data while it is mounted. Run with `--log-level debug` (or
//! `RUST_LOG`) to watch the session and its poller at work.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vtag_core::{ApplicationId, ClientProcess, DeviceHandle, ModelInfo};
use vtag_emulator::{HostServices, Session, SessionConfig, SessionManager, SignalReceiver};
use vtag_hardware::ForwardConnection;
use vtag_hardware::mock::{
    MockControllers, MockEmulation, MockForward, MockRegistry, MockTagSource, MockTagSourceHandle,
    MockVirtualTag,
};

/// Application id the demo session is opened for.
const DEMO_APP: ApplicationId = ApplicationId::new(0x0100_0000_0000_1000);

/// vtag - virtual tag reader demo
#[derive(Parser, Debug)]
#[command(name = "vtag")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a JSON session configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON tag description (a built-in tag is used otherwise)
    #[arg(short, long)]
    tag: Option<PathBuf>,

    /// Status poll interval in milliseconds, overrides the config file
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Number of times the tag is placed on and taken off the reader
    #[arg(long, default_value_t = 3)]
    cycles: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = load_config(&cli)?;
    let tag = load_tag(cli.tag.as_deref())?;

    let (source, tags) = MockTagSource::with_name("Demo Tag Source".to_string());
    let (controllers, _pads) = MockControllers::new();
    let (emulation, _switch) = MockEmulation::new(true);
    let services = HostServices::new(
        Arc::new(source),
        Arc::new(MockRegistry::new()),
        Arc::new(controllers),
    );

    let wait_limit = config.poll_interval() * 20;
    let manager = SessionManager::new(services, Arc::new(emulation), config)
        .context("invalid session configuration")?;
    let session = manager
        .open_session(DEMO_APP, connect_forward)
        .context("failed to open reader session")?;

    let outcome = run_demo(&session, &tags, tag, cli.cycles, wait_limit).await;

    for transition in session.history().await {
        info!(
            cause = %transition.cause,
            from = %transition.from,
            to = %transition.to,
            "History"
        );
    }
    session.close().await;

    outcome
}

fn connect_forward() -> Box<dyn ForwardConnection> {
    Box::new(MockForward::new().0)
}

fn load_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SessionConfig::from_json(&json)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => SessionConfig::default(),
    };

    if let Some(interval_ms) = cli.poll_interval_ms {
        config = config.with_poll_interval(Duration::from_millis(interval_ms));
    }
    config.validate()?;
    Ok(config)
}

fn load_tag(path: Option<&Path>) -> Result<MockVirtualTag> {
    let Some(path) = path else {
        return Ok(MockVirtualTag::new(
            "Mario",
            vec![0x04, 0x52, 0x8C, 0x1A, 0x63, 0x40, 0x80],
        )
        .with_model_info(ModelInfo {
            game_character_id: 0x0000,
            character_variant: 0,
            figure_type: 0,
            model_number: 0x0002,
            series: 0,
        }));
    };

    let json =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    MockVirtualTag::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))
}

async fn run_demo(
    session: &Session,
    tags: &MockTagSourceHandle,
    tag: MockVirtualTag,
    cycles: u32,
    wait_limit: Duration,
) -> Result<()> {
    session
        .initialize(ClientProcess {
            process_id: u64::from(std::process::id()),
            applet_resource_user_id: 0,
        })
        .await;

    let devices = session.list_devices().await?;
    let Some(&handle) = devices.first() else {
        bail!("reader listed no devices");
    };
    info!(npad_id = %session.get_npad_id(handle).await?, "Using reader device");

    let activate = session.attach_activate_event(handle).await?;
    let deactivate = session.attach_deactivate_event(handle).await?;

    tags.select_tag(tag);
    session.start_detection(handle).await?;

    for cycle in 1..=cycles {
        info!(cycle, "Placing tag on the reader");
        tags.connect();
        wait_for(&activate, wait_limit).await?;

        let tag_info = session.get_tag_info(handle).await?;
        info!(uuid = %tag_info.uuid_hex(), "Tag detected");

        session.mount(handle, 0, 2).await?;
        read_mounted(session, handle).await?;
        session.unmount(handle).await?;

        info!(cycle, "Taking tag off the reader");
        tags.disconnect();
        wait_for(&deactivate, wait_limit).await?;
    }

    session.stop_detection(handle).await?;
    session.finalize().await;
    Ok(())
}

async fn read_mounted(session: &Session, handle: DeviceHandle) -> Result<()> {
    let register = session.get_register_info(handle).await?;
    let model = session.get_model_info(handle).await?;
    let common = session.get_common_info(handle).await?;

    info!(
        name = register.name(),
        first_write = %register.first_write_date,
        character = model.game_character_id,
        model_number = model.model_number,
        write_counter = common.write_counter,
        "Mounted tag data"
    );
    Ok(())
}

async fn wait_for(signal: &SignalReceiver, limit: Duration) -> Result<()> {
    if tokio::time::timeout(limit, signal.wait()).await.is_err() {
        warn!(signal = %signal.kind(), "Signal not raised in time");
        bail!("timed out waiting for {} signal", signal.kind());
    }
    Ok(())
}
