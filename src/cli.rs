// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// ssh-onboard: set up passwordless SSH access to a single host
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional path to the ssh-onboard configuration file
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding keys and the SSH client config (overrides the config file)
    #[clap(long, value_name = "DIR")]
    pub ssh_dir: Option<String>,

    /// Set log level (RUST_LOG takes precedence)
    #[clap(long, value_name = "LEVEL", value_enum, default_value_t = LogLevelCli::Warn)]
    pub log_level: LogLevelCli,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevelCli {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevelCli {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevelCli::Trace => "trace",
            LogLevelCli::Debug => "debug",
            LogLevelCli::Info => "info",
            LogLevelCli::Warn => "warn",
            LogLevelCli::Error => "error",
        }
    }
}
