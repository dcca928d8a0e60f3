// src/session.rs
// State for one setup run: which host, how to reach it, where its key lives.

use std::path::{Path, PathBuf};

use crate::keys::public_key_path;

pub const KEY_FILE_PREFIX: &str = "id_rsa_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub alias: String,   // SSH config `Host` name and key filename suffix
    pub address: String, // IP or hostname, passed through unvalidated
    pub port: String,    // Free text, ssh/scp reject bad values themselves
    pub user: String,
    pub key_path: PathBuf,
}

impl HostTarget {
    pub fn new(alias: String, address: String, port: String, user: String, ssh_dir: &Path) -> Self {
        let key_path = ssh_dir.join(format!("{}{}", KEY_FILE_PREFIX, alias));
        HostTarget {
            alias,
            address,
            port,
            user,
            key_path,
        }
    }

    pub fn public_key_path(&self) -> PathBuf {
        public_key_path(&self.key_path)
    }

    /// `user@address`
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }

    pub fn key_path_arg(&self) -> String {
        self.key_path.display().to_string()
    }

    pub fn public_key_path_arg(&self) -> String {
        self.public_key_path().display().to_string()
    }
}
