// src/ssh_config.rs
// Manages the local ~/.ssh directory and appends host entries to its client config.

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SSH_DIR_MODE: u32 = 0o700;
pub const SSH_CONFIG_MODE: u32 = 0o600;
pub const SSH_CONFIG_FILENAME: &str = "config";

/// One `Host` block of an OpenSSH client config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub alias: String,
    pub address: String,
    pub user: String,
    pub port: String,
    pub identity_file: PathBuf,
    pub strict_host_key_checking: String,
}

impl HostEntry {
    /// Leading blank line separates it from whatever the file already holds.
    pub fn render(&self) -> String {
        format!(
            concat!(
                "\nHost {}\n",
                "    HostName {}\n",
                "    User {}\n",
                "    Port {}\n",
                "    IdentityFile {}\n",
                "    StrictHostKeyChecking {}\n",
            ),
            self.alias,
            self.address,
            self.user,
            self.port,
            self.identity_file.display(),
            self.strict_host_key_checking,
        )
    }
}

pub fn config_path(ssh_dir: &Path) -> PathBuf {
    ssh_dir.join(SSH_CONFIG_FILENAME)
}

/// Creates the directory as 0700 if missing. Returns whether it was created.
pub fn ensure_ssh_dir(ssh_dir: &Path) -> std::io::Result<bool> {
    if ssh_dir.exists() {
        return Ok(false);
    }
    DirBuilder::new()
        .recursive(true)
        .mode(SSH_DIR_MODE)
        .create(ssh_dir)?;
    // umask may have masked the requested mode
    fs::set_permissions(ssh_dir, Permissions::from_mode(SSH_DIR_MODE))?;
    info!("Created {} with mode 700", ssh_dir.display());
    Ok(true)
}

/// Appends the entry without looking at existing ones, then sets the file to 0600.
pub fn append_entry(config_file: &Path, entry: &HostEntry) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config_file)?;
    file.write_all(entry.render().as_bytes())?;
    file.flush()?;
    fs::set_permissions(config_file, Permissions::from_mode(SSH_CONFIG_MODE))?;
    debug!("Appended Host {} to {}", entry.alias, config_file.display());
    Ok(())
}
