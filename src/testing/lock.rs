use std::collections::HashSet;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use crate::error::SelfTestError;

/// Lock file kept in the upload folder while a self test runs.
///
/// It is never deleted: removing it would let a third run lock a fresh inode
/// while a second one still waits on the old.
pub const LOCK_FILE_NAME: &str = ".webp-express-selftest.lock";

static SHARED: LazyLock<Arc<RunRegistry>> = LazyLock::new(|| Arc::new(RunRegistry::new()));

/// Tracks which installations have a self test in flight.
///
/// Two runs against the same upload folder would share artifact file names,
/// so only one may hold the slot at a time. The slot is claimed in memory and
/// through an exclusive lock on [`LOCK_FILE_NAME`], so separate processes
/// exclude each other too.
#[derive(Debug, Default)]
pub struct RunRegistry {
    active: Mutex<HashSet<PathBuf>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashSet::new()),
        }
    }

    /// The registry every `SelfTest` in this process uses unless told otherwise.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Claim the slot for `upload_dir`; released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>, upload_dir: &Path) -> Result<RunGuard, SelfTestError> {
        let key = upload_dir.to_path_buf();
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if !active.insert(key.clone()) {
                return Err(SelfTestError::RunInProgress(upload_dir.display().to_string()));
            }
        }

        let mut guard = RunGuard {
            registry: Arc::clone(self),
            key,
            lock_file: None,
        };
        guard.lock_file = lock_installation(upload_dir)?;
        Ok(guard)
    }

    pub fn is_running(&self, upload_dir: &Path) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(upload_dir)
    }

    fn release(&self, key: &Path) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// `None` when the lock file cannot be opened; the run then goes ahead and
/// artifact creation reports the unusable folder.
fn lock_installation(upload_dir: &Path) -> Result<Option<File>, SelfTestError> {
    let path = upload_dir.join(LOCK_FILE_NAME);
    let file = match OpenOptions::new().create(true).truncate(false).write(true).open(&path) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not open run lock file");
            return Ok(None);
        }
    };

    match file.try_lock() {
        Ok(()) => Ok(Some(file)),
        Err(TryLockError::WouldBlock) => {
            Err(SelfTestError::RunInProgress(upload_dir.display().to_string()))
        }
        Err(TryLockError::Error(err)) => {
            tracing::warn!(path = %path.display(), error = %err, "could not lock run lock file");
            Ok(None)
        }
    }
}

/// Holds the run slot. Dropping it releases the in-memory claim and closes
/// the lock file, which releases the file lock.
#[derive(Debug)]
pub struct RunGuard {
    registry: Arc<RunRegistry>,
    key: PathBuf,
    lock_file: Option<File>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.lock_file.take();
        self.registry.release(&self.key);
    }
}
