//! CLI for linkprobe.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use linkprobe_core::codec::codes;
use linkprobe_core::config::{self, LinkprobeConfig};
use std::path::PathBuf;
use std::time::Duration;

use commands::{fetch_request, run_config_path, run_fetch, run_service};

/// Top-level CLI for linkprobe.
#[derive(Debug, Parser)]
#[command(name = "linkprobe")]
#[command(about = "linkprobe: browser-driven media link extraction for a local controller", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the XDG default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Connect to the controller and serve requests until TERMINATE or Ctrl-C.
    Run {
        /// Controller WebSocket URL (overrides `controller_url`).
        #[arg(long, value_name = "URL")]
        controller: Option<String>,
        /// In-flight task cap for the active playlist (overrides `max_batch`).
        #[arg(long, value_name = "N")]
        max_batch: Option<usize>,
        /// Show the browser window.
        #[arg(long)]
        headful: bool,
    },

    /// Resolve one video link and print the LINK_FETCHED message.
    FetchLink {
        /// Video page URL.
        url: String,
        /// Give up after this many seconds.
        #[arg(long, default_value = "120", value_name = "SECS")]
        timeout: u64,
    },

    /// Resolve every member of a playlist and print the resulting message.
    FetchPlaylist {
        /// Playlist page URL.
        url: String,
        /// Give up after this many seconds.
        #[arg(long, default_value = "900", value_name = "SECS")]
        timeout: u64,
    },

    /// Print the path of the configuration file.
    ConfigPath,
}

/// Apply `run` flags on top of the loaded configuration.
pub(crate) fn apply_overrides(
    mut cfg: LinkprobeConfig,
    controller: Option<String>,
    max_batch: Option<usize>,
    headful: bool,
) -> LinkprobeConfig {
    if let Some(url) = controller {
        cfg.controller_url = url;
    }
    if let Some(n) = max_batch {
        cfg.max_batch = n;
    }
    if headful {
        cfg.browser.headless = false;
    }
    cfg.normalized()
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        if let CliCommand::ConfigPath = cli.command {
            return run_config_path(cli.config.as_deref());
        }

        let cfg = match &cli.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?.normalized(),
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                controller,
                max_batch,
                headful,
            } => {
                let cfg = apply_overrides(cfg, controller, max_batch, headful);
                run_service(&cfg).await?;
            }
            CliCommand::FetchLink { url, timeout } => {
                let request = fetch_request(codes::FETCH_LINK, &url);
                run_fetch(&cfg, request, Duration::from_secs(timeout)).await?;
            }
            CliCommand::FetchPlaylist { url, timeout } => {
                let request = fetch_request(codes::FETCH_PLAYLIST, &url);
                run_fetch(&cfg, request, Duration::from_secs(timeout)).await?;
            }
            CliCommand::ConfigPath => {}
        }

        Ok(())
    }
}
