// src/setup.rs
// The interactive flow: collect host details, provision a key, write the client
// config entry, then hand the terminal to a test login.

use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::command::{CommandRunner, CommandSpec};
use crate::config::Config;
use crate::errors::SetupResult;
use crate::prompt::Prompter;
use crate::provision::{KeyMode, Provisioner};
use crate::session::HostTarget;
use crate::ssh_config::{self, HostEntry};

/// Runs one setup. Dropping the returned future mid-way (Ctrl+C) unwinds the same way
/// an error does: any key material not yet committed is removed.
pub async fn run_setup<R, W, C>(
    config: &Config,
    prompter: &mut Prompter<R, W>,
    runner: &C,
) -> SetupResult<()>
where
    R: BufRead + Send + 'static,
    W: Write,
    C: CommandRunner,
{
    let alias = prompter.ask("Custom host alias: ").await?;
    let address = prompter.ask("Remote server address: ").await?;
    let port = prompter.ask("Remote SSH port: ").await?;

    let ssh_dir = config.ssh_dir_path();
    let target = HostTarget::new(alias, address, port, config.user.clone(), &ssh_dir);
    info!(
        "Target '{}' -> {} port {}, key {}",
        target.alias,
        target.login(),
        target.port,
        target.key_path.display()
    );

    prompter.say("\nHow should the SSH key be set up?")?;
    for mode in KeyMode::ALL {
        prompter.say(&format!("{}) {}", mode.number(), mode.description()))?;
    }
    let choice = prompter.ask("Choose an option (1/2/3): ").await?;
    let mode = KeyMode::parse(&choice)?;

    if ssh_config::ensure_ssh_dir(&ssh_dir)? {
        prompter.say(&format!(
            "Directory {} did not exist, created it with mode 700",
            ssh_dir.display()
        ))?;
    }

    let guard = Provisioner::new(runner, &config.key)
        .provision(mode, &target, prompter)
        .await?;

    prompter.say("Updating SSH config...")?;
    let config_file = ssh_config::config_path(&ssh_dir);
    let entry = HostEntry {
        alias: target.alias.clone(),
        address: target.address.clone(),
        user: target.user.clone(),
        port: target.port.clone(),
        identity_file: target.key_path.clone(),
        strict_host_key_checking: config.ssh.strict_host_key_checking.clone(),
    };
    ssh_config::append_entry(&config_file, &entry)?;
    info!("Added Host {} to {}", entry.alias, config_file.display());

    if let Some(guard) = guard {
        guard.commit();
    }

    if config.ssh.verify_login {
        prompter.say(&format!(
            "Setup complete! Testing passwordless login with `ssh {}`...",
            target.alias
        ))?;
        verify_login(runner, &login_command(config, &target)).await;
    } else {
        prompter.say(&format!(
            "Setup complete! Connect with `ssh {}`",
            target.alias
        ))?;
    }
    Ok(())
}

pub fn login_command(config: &Config, target: &HostTarget) -> CommandSpec {
    let mut spec = CommandSpec::new("ssh");
    if !config.uses_default_ssh_dir() {
        let config_file = ssh_config::config_path(&config.ssh_dir_path());
        spec = spec.arg("-F").arg(config_file.display().to_string());
    }
    spec.arg(target.alias.clone()).interactive()
}

/// The outcome is informational only.
async fn verify_login<C: CommandRunner>(runner: &C, spec: &CommandSpec) {
    match runner.run(spec).await {
        Ok(output) if output.success() => info!("Test login finished successfully"),
        Ok(output) => warn!("Test login exited with {:?}", output.code),
        Err(e) => warn!("Test login could not be started: {}", e),
    }
}
