// src/main.rs

mod cli;
mod command;
mod config;
mod errors;
mod keys;
mod prompt;
mod provision;
mod session;
mod setup;
mod ssh_config;

use clap::Parser;
use std::io;

use cli::Cli;
use command::SystemRunner;
use config::Config;
use prompt::Prompter;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, FmtSubscriber};

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let cli_args = Cli::parse();

    // RUST_LOG=ssh_onboard=debug overrides --log-level
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli_args.log_level.as_filter()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting default tracing subscriber failed: {}", e);
    }

    let code = run(cli_args).await;
    // Exit directly: a stdin read abandoned by Ctrl+C would otherwise hold up
    // runtime shutdown until the user pressed Enter.
    std::process::exit(code);
}

async fn run(cli_args: Cli) -> i32 {
    info!("Starting ssh-onboard...");

    let mut config = match Config::load(cli_args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            if cli_args.config.is_some() {
                error!("Failed to load configuration: {:#}", e);
                eprintln!("Error: {:#}", e);
                return EXIT_FAILURE;
            }
            warn!("Proceeding with default configuration due to error: {:#}", e);
            Config::default()
        }
    };
    if let Some(ssh_dir) = cli_args.ssh_dir {
        config.ssh_dir = ssh_dir;
    }
    debug!("Loaded app config: {:?}", config);

    let stdin = match prompt::unbuffered_stdin() {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to duplicate stdin: {}", e);
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    let mut prompter = Prompter::new(stdin, io::stdout());
    let runner = SystemRunner;

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = setup::run_setup(&config, &mut prompter, &runner) => match result {
            Ok(()) => {
                info!("ssh-onboard finished.");
                EXIT_OK
            }
            Err(e) => {
                error!("Setup failed: {}", e);
                eprintln!("Error: {}", e);
                EXIT_FAILURE
            }
        },
        _ = interrupted => {
            // The setup future has been dropped here, so its key guards have already run.
            info!("Interrupted by user");
            println!("\nInterrupted, exiting.");
            EXIT_OK
        }
    }
}
