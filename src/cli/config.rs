//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{config::SessionConfig, services::ImageIOService};
use anyhow::{Context, Result};

/// Convert CLI arguments to a `SessionConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the session configuration
    ///
    /// Starts from `--config` when given, then applies command-line overrides.
    pub(crate) fn from_cli(cli: &Cli) -> Result<SessionConfig> {
        let mut config = match &cli.config {
            Some(path) => SessionConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => SessionConfig::default(),
        };

        if let Some(model) = &cli.model {
            config.remover.model_path = Some(model.clone());
        }
        if let Some(width) = cli.brush_size {
            config.brush.width = width;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if !cli.input.exists() {
            anyhow::bail!("Input file does not exist: {}", cli.input.display());
        }

        // Content sniffing decides the real format; the extension is only a hint
        if !ImageIOService::is_supported_format(&cli.input) {
            log::warn!(
                "{} does not have a .png/.jpg/.jpeg extension; trying to decode anyway",
                cli.input.display()
            );
        }

        if let Some(overlay) = &cli.overlay {
            if !overlay.exists() {
                anyhow::bail!("Overlay file does not exist: {}", overlay.display());
            }
        }
        if let Some(strokes) = &cli.strokes {
            if !strokes.exists() {
                anyhow::bail!("Strokes file does not exist: {}", strokes.display());
            }
        }

        Ok(())
    }
}
