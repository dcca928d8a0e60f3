// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xdg::BaseDirectories;

pub const APP_NAME: &str = "ssh-onboard";
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";
pub const DEFAULT_SSH_DIR: &str = "~/.ssh";

// Main configuration structure, mapping to config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_ssh_dir")]
    pub ssh_dir: String, // Path, can use ~
    #[serde(default)]
    pub key: KeyConfig,
    #[serde(default)]
    pub ssh: SshClientConfig,
}

fn default_user() -> String {
    "root".to_string()
}
fn default_ssh_dir() -> String {
    DEFAULT_SSH_DIR.to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    #[serde(default = "default_key_bits")]
    pub bits: u32,
    #[serde(default = "default_remote_path")]
    pub remote_path: String, // Expanded by the remote shell, not locally
}

fn default_key_bits() -> u32 {
    4096
}
fn default_remote_path() -> String {
    "~/.ssh/id_rsa".to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig {
            bits: default_key_bits(),
            remote_path: default_remote_path(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SshClientConfig {
    #[serde(default = "default_strict_host_key_checking")]
    pub strict_host_key_checking: String, // "no", "yes", "accept-new", "ask"
    #[serde(default = "default_verify_login")]
    pub verify_login: bool,
}

fn default_strict_host_key_checking() -> String {
    "no".to_string()
}
fn default_verify_login() -> bool {
    true
}

impl Default for SshClientConfig {
    fn default() -> Self {
        SshClientConfig {
            strict_host_key_checking: default_strict_host_key_checking(),
            verify_login: default_verify_login(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user: default_user(),
            ssh_dir: default_ssh_dir(),
            key: KeyConfig::default(),
            ssh: SshClientConfig::default(),
        }
    }
}

impl Config {
    /// Loads the override path, or the XDG default if one exists. With neither, defaults.
    pub fn load(config_path_override: Option<&Path>) -> Result<Self> {
        let config_path = match config_path_override {
            Some(path) => {
                debug!("Using provided config path override: {}", path.display());
                path.to_path_buf()
            }
            None => {
                let xdg_dirs = BaseDirectories::with_prefix(APP_NAME)?;
                match xdg_dirs.find_config_file(DEFAULT_CONFIG_FILENAME) {
                    Some(path) => path,
                    None => {
                        debug!(
                            "No '{}' found in XDG config dirs, using defaults",
                            DEFAULT_CONFIG_FILENAME
                        );
                        return Ok(Config::default());
                    }
                }
            }
        };

        info!("Loading configuration from {}", config_path.display());
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).with_context(|| "Failed to parse TOML configuration")
    }

    /// The local SSH directory with `~` expanded.
    pub fn ssh_dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.ssh_dir).into_owned())
    }

    /// Whether `ssh` will pick up `<ssh_dir>/config` without an explicit `-F`.
    pub fn uses_default_ssh_dir(&self) -> bool {
        self.ssh_dir_path() == PathBuf::from(shellexpand::tilde(DEFAULT_SSH_DIR).into_owned())
    }
}
