// src/provision.rs
// Obtains the local keypair for a host in one of three ways.

use std::io::{BufRead, Write};
use tracing::{debug, info};

use crate::command::{CommandRunner, CommandSpec};
use crate::config::KeyConfig;
use crate::errors::{SetupError, SetupResult};
use crate::keys::{self, KeyGuard};
use crate::prompt::Prompter;
use crate::session::HostTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Generate locally, then push the public key with ssh-copy-id.
    LocalGenerate,
    /// Paste a private key that already exists on the server.
    PasteExisting,
    /// Generate on the server, then download both halves.
    RemoteGenerate,
}

impl KeyMode {
    pub const ALL: [KeyMode; 3] = [
        KeyMode::LocalGenerate,
        KeyMode::PasteExisting,
        KeyMode::RemoteGenerate,
    ];

    pub fn parse(choice: &str) -> SetupResult<Self> {
        match choice.trim() {
            "1" => Ok(KeyMode::LocalGenerate),
            "2" => Ok(KeyMode::PasteExisting),
            "3" => Ok(KeyMode::RemoteGenerate),
            other => Err(SetupError::InvalidSelection(other.to_string())),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            KeyMode::LocalGenerate => 1,
            KeyMode::PasteExisting => 2,
            KeyMode::RemoteGenerate => 3,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            KeyMode::LocalGenerate => "Generate a key locally and upload it to the server",
            KeyMode::PasteExisting => "The server already has a key (paste the private key)",
            KeyMode::RemoteGenerate => "Generate a key on the server and download it",
        }
    }
}

pub fn keygen_command(target: &HostTarget, bits: u32) -> CommandSpec {
    CommandSpec::new("ssh-keygen").args([
        "-t".to_string(),
        "rsa".to_string(),
        "-b".to_string(),
        bits.to_string(),
        "-C".to_string(),
        target.alias.clone(),
        "-N".to_string(),
        String::new(),
        "-f".to_string(),
        target.key_path_arg(),
    ])
}

pub fn copy_id_command(target: &HostTarget) -> CommandSpec {
    CommandSpec::new("ssh-copy-id")
        .args([
            "-p".to_string(),
            target.port.clone(),
            "-i".to_string(),
            target.public_key_path_arg(),
            target.login(),
        ])
        .interactive()
}

pub fn remote_keygen_command(target: &HostTarget, key: &KeyConfig) -> CommandSpec {
    CommandSpec::new("ssh")
        .args([
            target.login(),
            "-p".to_string(),
            target.port.clone(),
            format!(
                "ssh-keygen -t rsa -b {} -N '' -f {}",
                key.bits, key.remote_path
            ),
        ])
        .interactive()
}

/// Private half first, then the public half.
pub fn download_commands(target: &HostTarget, key: &KeyConfig) -> [CommandSpec; 2] {
    let scp = |remote: String, local: String| {
        CommandSpec::new("scp")
            .args([
                "-P".to_string(),
                target.port.clone(),
                format!("{}:{}", target.login(), remote),
                local,
            ])
            .interactive()
    };
    [
        scp(key.remote_path.clone(), target.key_path_arg()),
        scp(format!("{}.pub", key.remote_path), target.public_key_path_arg()),
    ]
}

pub struct Provisioner<'a, C> {
    runner: &'a C,
    key: &'a KeyConfig,
}

impl<'a, C: CommandRunner> Provisioner<'a, C> {
    pub fn new(runner: &'a C, key: &'a KeyConfig) -> Self {
        Provisioner { runner, key }
    }

    /// Returns the guard for any key material created here. `None` means nothing new
    /// was created (an existing local key was reused).
    pub async fn provision<R, W>(
        &self,
        mode: KeyMode,
        target: &HostTarget,
        prompter: &mut Prompter<R, W>,
    ) -> SetupResult<Option<KeyGuard>>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        info!("Provisioning key for '{}' using mode {:?}", target.alias, mode);
        match mode {
            KeyMode::LocalGenerate => self.local_generate(target, prompter).await,
            KeyMode::PasteExisting => self.paste_existing(target, prompter).await.map(Some),
            KeyMode::RemoteGenerate => self.remote_generate(target, prompter).await.map(Some),
        }
    }

    async fn local_generate<R, W>(
        &self,
        target: &HostTarget,
        prompter: &mut Prompter<R, W>,
    ) -> SetupResult<Option<KeyGuard>>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let guard = if target.key_path.exists() {
            prompter.say("SSH key already exists, skipping generation")?;
            None
        } else {
            let guard = KeyGuard::arm(&target.key_path);
            prompter.say("Generating SSH key...")?;
            let output = self
                .runner
                .run_checked(&keygen_command(target, self.key.bits))
                .await?;
            debug!("ssh-keygen output: {}", output.stdout.trim_end());
            Some(guard)
        };

        prompter.say(&format!("Uploading public key to {}...", target.address))?;
        self.runner.run_checked(&copy_id_command(target)).await?;
        Ok(guard)
    }

    async fn paste_existing<R, W>(
        &self,
        target: &HostTarget,
        prompter: &mut Prompter<R, W>,
    ) -> SetupResult<KeyGuard>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let guard = KeyGuard::arm(&target.key_path);
        prompter.say(
            "Paste the server's private key (id_rsa) below, then press Enter on an empty line:",
        )?;
        let lines = prompter.read_until_blank().await?;

        prompter.say(&format!(
            "Saving private key to {}",
            target.key_path.display()
        ))?;
        let mut contents = lines.join("\n");
        contents.push('\n');
        keys::write_private_key(&target.key_path, &contents)?;
        info!("Wrote {} pasted lines to {}", lines.len(), target.key_path.display());
        Ok(guard)
    }

    async fn remote_generate<R, W>(
        &self,
        target: &HostTarget,
        prompter: &mut Prompter<R, W>,
    ) -> SetupResult<KeyGuard>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let guard = KeyGuard::arm(&target.key_path);

        prompter.say("Generating SSH key on the server...")?;
        self.runner
            .run_checked(&remote_keygen_command(target, self.key))
            .await?;

        prompter.say("Downloading the server's key pair...")?;
        for spec in download_commands(target, self.key) {
            self.runner.run_checked(&spec).await?;
        }

        prompter.say("Restricting local private key permissions...")?;
        keys::restrict_to_owner(&target.key_path)?;
        Ok(guard)
    }
}
