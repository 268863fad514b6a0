use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{DeployError, Result};

const LOCK_FILENAME: &str = "deploy.lock";

/// Contents of the lock file while a run holds it.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

/// Held for the duration of one deployment run.
///
/// Exclusion comes from an OS lock on the open file (`flock` on unix, a
/// deny-all share mode on Windows), so it ends with the process no matter how
/// the process ends. The file itself is never removed; its JSON body only
/// names the holder for error messages and is truncated on release.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    file: File,
}

impl DeployLock {
    /// Take the lock in `state_directory`, failing with `Locked` if another
    /// run holds it. A body left behind by a run that died is overwritten.
    pub async fn acquire(state_directory: &Path) -> Result<Self> {
        let state_directory = state_directory.to_path_buf();
        tokio::task::spawn_blocking(move || Self::acquire_blocking(&state_directory))
            .await
            .map_err(|e| DeployError::State(format!("lock task failed: {e}")))?
    }

    fn acquire_blocking(state_directory: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_directory)
            .map_err(|e| DeployError::State(format!("failed to create state dir: {e}")))?;
        let path = state_directory.join(LOCK_FILENAME);

        let Some(mut file) = open_exclusive(&path)? else {
            return Err(DeployError::Locked {
                pid: read_info(&path).map(|i| i.pid).unwrap_or(0),
            });
        };

        let mut previous = String::new();
        file.read_to_string(&mut previous).ok();
        if !previous.trim().is_empty() {
            match serde_json::from_str::<LockInfo>(&previous) {
                Ok(info) => tracing::warn!(
                    pid = info.pid,
                    acquired_at = %info.acquired_at,
                    "replacing deploy lock left by an interrupted run"
                ),
                Err(_) => tracing::warn!(path = %path.display(), "replacing unreadable deploy lock"),
            }
        }

        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&serde_json::to_vec(&info)?)?;
        file.sync_data()?;
        tracing::debug!(path = %path.display(), pid = info.pid, "deploy lock acquired");

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        // The OS lock goes away when `file` closes.
        if let Err(e) = self.file.set_len(0) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to clear deploy lock");
        }
    }
}

/// Open the lock file and take the OS lock. `None` means someone else has it.
#[cfg(unix)]
fn open_exclusive(path: &Path) -> std::io::Result<Option<File>> {
    use std::os::unix::io::AsRawFd;

    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(Some(file));
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        Ok(None)
    } else {
        Err(err)
    }
}

#[cfg(windows)]
fn open_exclusive(path: &Path) -> std::io::Result<Option<File>> {
    use std::os::windows::fs::OpenOptionsExt;

    const ERROR_SHARING_VIOLATION: i32 = 32;
    match std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .share_mode(0)
        .open(path)
    {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.raw_os_error() == Some(ERROR_SHARING_VIOLATION) => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_info(path: &Path) -> Option<LockInfo> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_dead_holder(dir: &Path) {
        let stale = LockInfo {
            pid: i32::MAX as u32,
            acquired_at: Utc::now(),
        };
        std::fs::write(
            dir.join(LOCK_FILENAME),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn second_acquire_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let _held = DeployLock::acquire(dir.path()).await.unwrap();
        match DeployLock::acquire(dir.path()).await {
            Err(DeployError::Locked { .. }) => {}
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = DeployLock::acquire(dir.path()).await.unwrap();
        let path = lock.path().to_path_buf();
        drop(lock);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        DeployLock::acquire(dir.path()).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_lock_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        write_dead_holder(dir.path());

        let lock = DeployLock::acquire(dir.path()).await.unwrap();
        let info = read_info(lock.path()).unwrap();
        assert_eq!(info.pid, std::process::id());
    }

    /// Two runs both find the same leftover body. Only one may come out
    /// holding the lock; the other must see the winner as the holder.
    #[cfg(unix)]
    #[tokio::test]
    async fn racing_takeover_of_stale_lock_admits_one() {
        let dir = tempfile::tempdir().unwrap();
        write_dead_holder(dir.path());

        let first = DeployLock::acquire(dir.path()).await.unwrap();
        match DeployLock::acquire(dir.path()).await {
            Err(DeployError::Locked { pid }) => assert_eq!(pid, std::process::id()),
            other => panic!("expected Locked, got {other:?}"),
        }
        assert_eq!(read_info(first.path()).unwrap().pid, std::process::id());
        drop(first);

        write_dead_holder(dir.path());
        let (a, b) = tokio::join!(
            DeployLock::acquire(dir.path()),
            DeployLock::acquire(dir.path())
        );
        let held = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(held, 1);
        assert!(matches!(
            a.as_ref().err().or(b.as_ref().err()),
            Some(DeployError::Locked { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_lock_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCK_FILENAME), "garbage").unwrap();
        let lock = DeployLock::acquire(dir.path()).await.unwrap();
        assert!(!std::fs::read_to_string(lock.path()).unwrap().contains("garbage"));
    }
}
