//! `claudetogo config` subcommands

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use claudetogo_core::config::EXAMPLE_CONFIG;
use claudetogo_core::Config;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (file, environment and defaults)
    Show,

    /// Check a configuration file for errors
    Validate {
        /// File to check (default: the active config file)
        path: Option<PathBuf>,
    },

    /// Write an example configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(command: &ConfigCommand, config_override: Option<&Path>) -> Result<()> {
    let active_path = config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);

    match command {
        ConfigCommand::Show => {
            let mut config = if active_path.exists() {
                Config::load_from(&active_path).context("failed to load configuration")?
            } else {
                Config::default()
            };
            config.apply_env_overrides();

            let rendered =
                toml::to_string_pretty(&config).context("failed to render configuration")?;
            println!("# Source: {}", describe_source(&active_path));
            print!("{}", rendered);
            Ok(())
        }
        ConfigCommand::Validate { path } => {
            let path = path.clone().unwrap_or(active_path);
            let config = Config::load_from(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("{} is invalid", path.display()))?;
            println!("✅ {} is valid", path.display());
            Ok(())
        }
        ConfigCommand::Init { force } => {
            if active_path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    active_path.display()
                );
            }
            if let Some(parent) = active_path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create config directory {}", parent.display())
                })?;
            }
            fs::write(&active_path, EXAMPLE_CONFIG)
                .with_context(|| format!("failed to write {}", active_path.display()))?;
            println!("Wrote example configuration to {}", active_path.display());
            Ok(())
        }
    }
}

fn describe_source(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("defaults ({} not found)", path.display())
    }
}
