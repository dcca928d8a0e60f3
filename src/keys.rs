// src/keys.rs
// Local key files: the cleanup guard and permission helpers.

use std::fs::{self, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PRIVATE_KEY_MODE: u32 = 0o600;

/// `<private>.pub`
pub fn public_key_path(private: &Path) -> PathBuf {
    let mut os = private.as_os_str().to_owned();
    os.push(".pub");
    PathBuf::from(os)
}

/// Removes a half-provisioned keypair when dropped, unless committed.
///
/// Armed right before the tool starts creating key material. Dropping it on an
/// error path or because the flow future was cancelled deletes the private key
/// and its `.pub` counterpart, but only the halves that did not exist at arm time.
#[derive(Debug)]
pub struct KeyGuard {
    owned: Vec<PathBuf>,
    private: PathBuf,
    committed: bool,
}

impl KeyGuard {
    pub fn arm(private: &Path) -> Self {
        let owned: Vec<PathBuf> = [private.to_path_buf(), public_key_path(private)]
            .into_iter()
            .filter(|path| !path.exists())
            .collect();
        debug!(
            "Key cleanup armed for {} ({} of 2 paths are new)",
            private.display(),
            owned.len()
        );
        KeyGuard {
            owned,
            private: private.to_path_buf(),
            committed: false,
        }
    }

    pub fn commit(mut self) {
        debug!("Key {} committed", self.private.display());
        self.committed = true;
    }

    /// Deletes the paths this run created and returns the ones removed.
    fn clean_up(&self) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in &self.owned {
            if !path.exists() {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => removed.push(path.clone()),
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        removed
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in self.clean_up() {
            info!("Removed unfinished key file {}", path.display());
            println!("Removed unfinished key file: {}", path.display());
        }
    }
}

/// Writes pasted key material, creating the file as 0600 from the start.
pub fn write_private_key(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(PRIVATE_KEY_MODE)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    // An existing file keeps its old mode through open(), so set it again.
    restrict_to_owner(path)
}

pub fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    fs::set_permissions(path, Permissions::from_mode(PRIVATE_KEY_MODE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn test_public_key_path() {
        assert_eq!(
            public_key_path(Path::new("/home/u/.ssh/id_rsa_web")),
            PathBuf::from("/home/u/.ssh/id_rsa_web.pub")
        );
    }

    #[test]
    fn test_uncommitted_guard_removes_both_halves() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa_web");
        {
            let _guard = KeyGuard::arm(&key);
            fs::write(&key, "private").unwrap();
            fs::write(public_key_path(&key), "public").unwrap();
        }
        assert!(!key.exists());
        assert!(!public_key_path(&key).exists());
    }

    #[test]
    fn test_uncommitted_guard_with_only_private_half() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa_web");
        {
            let _guard = KeyGuard::arm(&key);
            fs::write(&key, "private").unwrap();
        }
        assert!(!key.exists());
    }

    #[test]
    fn test_guard_with_nothing_written_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let guard = KeyGuard::arm(&dir.path().join("id_rsa_web"));
        assert!(guard.clean_up().is_empty());
    }

    #[test]
    fn test_guard_spares_preexisting_keypair() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa_web");
        fs::write(&key, "old private").unwrap();
        fs::write(public_key_path(&key), "old public").unwrap();
        {
            let _guard = KeyGuard::arm(&key);
        }
        assert_eq!(fs::read_to_string(&key).unwrap(), "old private");
        assert_eq!(fs::read_to_string(public_key_path(&key)).unwrap(), "old public");
    }

    #[test]
    fn test_guard_removes_only_the_new_half() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa_web");
        fs::write(public_key_path(&key), "leftover public").unwrap();
        {
            let _guard = KeyGuard::arm(&key);
            fs::write(&key, "private").unwrap();
        }
        assert!(!key.exists());
        assert!(public_key_path(&key).exists());
    }

    #[test]
    fn test_committed_guard_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa_web");
        let guard = KeyGuard::arm(&key);
        fs::write(&key, "private").unwrap();
        fs::write(public_key_path(&key), "public").unwrap();
        guard.commit();
        assert!(key.exists());
        assert!(public_key_path(&key).exists());
    }

    #[test]
    fn test_write_private_key_mode() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa_web");
        write_private_key(&key, "line1\nline2\n").unwrap();
        assert_eq!(fs::read_to_string(&key).unwrap(), "line1\nline2\n");
        assert_eq!(mode_of(&key), 0o600);
    }

    #[test]
    fn test_write_private_key_tightens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa_web");
        fs::write(&key, "old contents that are longer").unwrap();
        fs::set_permissions(&key, Permissions::from_mode(0o644)).unwrap();

        write_private_key(&key, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&key).unwrap(), "new\n");
        assert_eq!(mode_of(&key), 0o600);
    }
}
