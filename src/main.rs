//! LanBox control - send one command to a LanBox lighting controller.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::Level;

use lanbox_control as app;

use app::config::{AppConfig, ConfigLoadResult};
use app::lanbox::{AckMode, Command, MixMode, Session, hex};

/// Send one command to a LanBox controller over TCP.
#[derive(Parser)]
#[command(name = "lanbox", version)]
struct Cli {
    /// Config file path (default: platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use config.toml from current directory (dev mode)
    #[arg(long, conflicts_with = "config")]
    dev: bool,

    /// Controller host, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Controller TCP port, overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// Wait for the controller's reply to each frame
    #[arg(long)]
    wait_ack: bool,

    /// Log transmitted and received frames
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Write a default config file and exit
    InitConfig,
    CreateCueList { id: u16 },
    LoadCueList { id: u16 },
    SaveCueList { id: u16 },
    ClearCueList { id: u16 },
    InsertStep { layer: u8, step: u8 },
    AppendStep { layer: u8 },
    DeleteStep { layer: u8, step: u8 },
    /// Mode by name (off, normal, additive, subtractive, transparent) or index 0-4
    SetMixMode { layer: u8, mode: MixMode },
    SetTransparency { layer: u8, depth: u8 },
    GetLayerStatus { layer: u8 },
    /// Names longer than 15 characters are cut
    SetLayerName { layer: u8, name: String },
    SetLayerPriority { layer: u8, priority: u8 },
    PatchChannel { dmx: u16, mixer: u16 },
    GetPatch { dmx: u16 },
    SetGain { dmx: u16, gain: u8 },
    GetGain { dmx: u16 },
    FactoryReset,
    SaveConfiguration,
    GetSystemInfo,
}

impl Action {
    fn into_command(self) -> Option<Command> {
        let command = match self {
            Action::InitConfig => return None,
            Action::CreateCueList { id } => Command::CreateCueList { id },
            Action::LoadCueList { id } => Command::LoadCueList { id },
            Action::SaveCueList { id } => Command::SaveCueList { id },
            Action::ClearCueList { id } => Command::ClearCueList { id },
            Action::InsertStep { layer, step } => Command::InsertStep { layer, step },
            Action::AppendStep { layer } => Command::AppendStep { layer },
            Action::DeleteStep { layer, step } => Command::DeleteStep { layer, step },
            Action::SetMixMode { layer, mode } => Command::SetMixMode {
                layer,
                mode: mode.index(),
            },
            Action::SetTransparency { layer, depth } => Command::SetTransparency { layer, depth },
            Action::GetLayerStatus { layer } => Command::GetLayerStatus { layer },
            Action::SetLayerName { layer, name } => Command::SetLayerName { layer, name },
            Action::SetLayerPriority { layer, priority } => Command::SetLayerPriority { layer, priority },
            Action::PatchChannel { dmx, mixer } => Command::PatchChannel { dmx, mixer },
            Action::GetPatch { dmx } => Command::GetPatch { dmx },
            Action::SetGain { dmx, gain } => Command::SetGain { dmx, gain },
            Action::GetGain { dmx } => Command::GetGain { dmx },
            Action::FactoryReset => Command::FactoryReset,
            Action::SaveConfiguration => Command::SaveConfiguration,
            Action::GetSystemInfo => Command::GetSystemInfo,
        };
        Some(command)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match (&cli.config, cli.dev) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("config.toml"),
        (None, false) => AppConfig::default_path(),
    };

    let Some(command) = cli.action.into_command() else {
        AppConfig::default()
            .save(&config_path)
            .with_context(|| format!("writing {}", config_path.display()))?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    };

    let mut config = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => config,
        ConfigLoadResult::Missing => AppConfig::default(),
        ConfigLoadResult::Invalid(e) => bail!("Config {} invalid: {e}", config_path.display()),
    };
    if let Some(host) = cli.host {
        config.controller.host = host;
    }
    if let Some(port) = cli.port {
        config.controller.tcp_port = port;
    }
    if cli.wait_ack {
        config.session.ack_mode = AckMode::WaitForAck;
    }

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let _log_guard = app::logging::init(&config.logging, level)?;
    tracing::info!("Config path: {:?}", config_path);

    // Reject bad parameters before opening the connection
    app::lanbox::encode(&command)?;

    tracing::info!(
        "Controller '{}' via {} at {}",
        config.controller.connection_name,
        config.controller.transport,
        config.controller.endpoint()
    );
    let mut session = Session::connect_tcp(&config.controller, &config.session).await?;
    session.authenticate(&config.controller.password).await?;
    tracing::info!("{} session ready ({:?})", session.transport(), session.ack_mode());

    let result = session.send(&command).await;
    if let Err(e) = session.close().await {
        tracing::warn!("Close failed: {e}");
    }

    match result? {
        Some(reply) => println!("{} reply: {}", command.name(), hex(reply.as_bytes())),
        None => println!("{} sent to {}", command.name(), config.controller.tcp_addr()),
    }

    Ok(())
}
