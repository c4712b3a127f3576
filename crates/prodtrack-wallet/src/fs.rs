//! # Filesystem Keystore
//!
//! Layout: `<root>/<org>/<user>.id`, one JSON identity document per file.
//!
//! Every write goes to a temporary file in the organization directory
//! first. `put_new` then hard-links it into place, which fails atomically
//! if the target exists; `put_overwrite` renames it over the target. A
//! reader therefore never sees a half-written identity.
//!
//! On Unix the files are created with mode `0600`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use prodtrack_core::{Organization, UserId};

use crate::error::WalletError;
use crate::record::IdentityRecord;
use crate::IdentityStore;

const EXTENSION: &str = "id";

/// Identity store backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FileSystemWallet {
    root: PathBuf,
}

impl FileSystemWallet {
    /// Open (creating if needed) a keystore rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, WalletError> {
        let root = root.into();
        for org in Organization::ALL {
            let dir = root.join(org.as_str());
            fs::create_dir_all(&dir).map_err(|source| WalletError::Io { path: dir, source })?;
        }
        tracing::debug!(root = %root.display(), "opened filesystem wallet");
        Ok(Self { root })
    }

    /// Root directory of the keystore.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn org_dir(&self, org: Organization) -> PathBuf {
        self.root.join(org.as_str())
    }

    fn path_for(&self, org: Organization, user: &UserId) -> PathBuf {
        self.org_dir(org).join(format!("{}.{EXTENSION}", user.as_str()))
    }

    /// Write `bytes` to a fresh temporary file beside the final location.
    fn write_temp(&self, org: Organization, bytes: &[u8]) -> Result<PathBuf, WalletError> {
        let tmp = self
            .org_dir(org)
            .join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let io_err = |source| WalletError::Io {
            path: tmp.clone(),
            source,
        };
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        Ok(tmp)
    }
}

impl IdentityStore for FileSystemWallet {
    fn get(&self, org: Organization, user: &UserId) -> Result<IdentityRecord, WalletError> {
        let path = self.path_for(org, user);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WalletError::NotFound {
                    org,
                    user: user.clone(),
                })
            }
            Err(source) => return Err(WalletError::Io { path, source }),
        };
        IdentityRecord::from_json(org, user.clone(), &bytes).map_err(|e| WalletError::Corrupt {
            path,
            reason: e.to_string(),
        })
    }

    fn exists(&self, org: Organization, user: &UserId) -> Result<bool, WalletError> {
        let path = self.path_for(org, user);
        path.try_exists()
            .map_err(|source| WalletError::Io { path, source })
    }

    fn put_new(&self, record: IdentityRecord) -> Result<(), WalletError> {
        let (org, user) = (record.org(), record.user().clone());
        let target = self.path_for(org, &user);
        let tmp = self.write_temp(org, &record.to_json()?)?;
        let linked = fs::hard_link(&tmp, &target);
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => {
                tracing::debug!(%org, %user, "stored new identity");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(WalletError::AlreadyExists { org, user })
            }
            Err(source) => Err(WalletError::Io {
                path: target,
                source,
            }),
        }
    }

    fn put_overwrite(&self, record: IdentityRecord) -> Result<(), WalletError> {
        let (org, user) = (record.org(), record.user().clone());
        let target = self.path_for(org, &user);
        let tmp = self.write_temp(org, &record.to_json()?)?;
        if let Err(source) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(WalletError::Io {
                path: target,
                source,
            });
        }
        tracing::debug!(%org, %user, "stored identity (overwrite)");
        Ok(())
    }

    fn remove(&self, org: Organization, user: &UserId) -> Result<IdentityRecord, WalletError> {
        let record = self.get(org, user)?;
        let path = self.path_for(org, user);
        match fs::remove_file(&path) {
            Ok(()) => Ok(record),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(WalletError::NotFound {
                org,
                user: user.clone(),
            }),
            Err(source) => Err(WalletError::Io { path, source }),
        }
    }

    fn list(&self, org: Organization) -> Result<Vec<UserId>, WalletError> {
        let dir = self.org_dir(org);
        let entries = fs::read_dir(&dir).map_err(|source| WalletError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut users = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| WalletError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match UserId::new(stem) {
                Ok(user) => users.push(user),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping foreign keystore file"),
            }
        }
        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;

    fn wallet() -> (tempfile::TempDir, FileSystemWallet) {
        let dir = tempfile::tempdir().unwrap();
        let wallet = FileSystemWallet::open(dir.path()).unwrap();
        (dir, wallet)
    }

    #[test]
    fn test_open_creates_org_dirs() {
        let (dir, _wallet) = wallet();
        assert!(dir.path().join("org1").is_dir());
        assert!(dir.path().join("org2").is_dir());
    }

    #[test]
    fn test_put_new_writes_file_and_reads_back() {
        let (dir, wallet) = wallet();
        let rec = record(Organization::Org1, "alice");
        wallet.put_new(rec.clone()).unwrap();
        assert!(dir.path().join("org1").join("alice.id").is_file());
        let got = wallet.get(Organization::Org1, rec.user()).unwrap();
        assert_eq!(got.private_key_pem(), rec.private_key_pem());
    }

    #[test]
    fn test_put_new_existing_fails_and_leaves_no_temp_files() {
        let (dir, wallet) = wallet();
        let first = record(Organization::Org1, "alice");
        wallet.put_new(first.clone()).unwrap();
        assert!(matches!(
            wallet.put_new(record(Organization::Org1, "alice")),
            Err(WalletError::AlreadyExists { .. })
        ));
        let names: Vec<_> = fs::read_dir(dir.path().join("org1"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["alice.id".to_string()]);
        let stored = wallet.get(Organization::Org1, first.user()).unwrap();
        assert_eq!(stored.private_key_pem(), first.private_key_pem());
    }

    #[test]
    fn test_put_overwrite_replaces() {
        let (_dir, wallet) = wallet();
        wallet.put_overwrite(record(Organization::Org2, "admin")).unwrap();
        let second = record(Organization::Org2, "admin");
        wallet.put_overwrite(second.clone()).unwrap();
        let stored = wallet.get(Organization::Org2, second.user()).unwrap();
        assert_eq!(stored.private_key_pem(), second.private_key_pem());
    }

    #[test]
    fn test_get_missing_and_corrupt() {
        let (dir, wallet) = wallet();
        let user = UserId::new("bob").unwrap();
        assert!(matches!(
            wallet.get(Organization::Org1, &user),
            Err(WalletError::NotFound { .. })
        ));
        fs::write(dir.path().join("org1").join("bob.id"), b"{not json").unwrap();
        assert!(matches!(
            wallet.get(Organization::Org1, &user),
            Err(WalletError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_list_and_remove() {
        let (dir, wallet) = wallet();
        wallet.put_new(record(Organization::Org1, "bob")).unwrap();
        wallet.put_new(record(Organization::Org1, "alice")).unwrap();
        fs::write(dir.path().join("org1").join("notes.txt"), b"x").unwrap();
        let users = wallet.list(Organization::Org1).unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let bob = UserId::new("bob").unwrap();
        wallet.remove(Organization::Org1, &bob).unwrap();
        assert!(!wallet.exists(Organization::Org1, &bob).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_identity_file_mode_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, wallet) = wallet();
        wallet.put_new(record(Organization::Org1, "alice")).unwrap();
        let meta = fs::metadata(dir.path().join("org1").join("alice.id")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_concurrent_put_new_single_winner() {
        let (_dir, wallet) = wallet();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wallet = wallet.clone();
                let rec = record(Organization::Org2, "racer");
                std::thread::spawn(move || wallet.put_new(rec).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }
}
