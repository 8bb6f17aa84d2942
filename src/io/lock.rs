//! Lock file management for single-instance enforcement.
//!
//! The lock lives at `$XDG_RUNTIME_DIR/minbar.lock` and records the owning
//! PID and the custom config directory, if any. The OS releases the `fs2`
//! lock when the process exits; the file itself is removed on clean shutdown.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config;

const LOCK_FILE_NAME: &str = "minbar.lock";

/// Held exclusive lock. Dropping it releases the lock and removes the file.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Default lock path in the runtime directory.
pub fn lock_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join(LOCK_FILE_NAME)
}

/// Acquire the instance lock.
///
/// Returns `Ok(None)` when another live instance holds it. A lock file left
/// behind by a dead process is replaced.
pub fn acquire_lock() -> Result<Option<LockFile>> {
    acquire_lock_at(&lock_path())
}

pub fn acquire_lock_at(path: &Path) -> Result<Option<LockFile>> {
    let mut file = open_lock_file(path)?;

    if file.try_lock_exclusive().is_err() {
        match holder_pid(path) {
            Some(pid) if is_process_running(pid) => {
                log_pipe!();
                log_error!("minbar is already running (PID: {pid})");
                log_indented!("Reload its configuration with: kill -USR2 {pid}");
                return Ok(None);
            }
            _ => {
                log_warning!("Removing stale lock file");
                let _ = std::fs::remove_file(path);
                file = open_lock_file(path)?;
                if file.try_lock_exclusive().is_err() {
                    return Ok(None);
                }
            }
        }
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(&file, "{}", std::process::id())?;
    match config::get_custom_config_dir() {
        Some(dir) => writeln!(&file, "{}", dir.display())?,
        None => writeln!(&file)?,
    }
    file.flush()?;

    Ok(Some(LockFile {
        file,
        path: path.to_path_buf(),
    }))
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("failed to open lock file {}", path.display()))
}

/// PID recorded on the first line of the lock file.
fn holder_pid(path: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().next()?.trim().parse().ok()
}

fn is_process_running(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}
