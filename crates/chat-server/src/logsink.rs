//! The persisted business-event log (C2), distinct from the ambient
//! diagnostic logging initialized in `main` via `env_logger`. One line per
//! event, timestamped, mirrored to stdout under a shared print lock.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use parking_lot::Mutex;

/// Process-wide console print lock; a leaf lock, safe to take while holding
/// anything else.
static STDOUT_LOCK: Mutex<()> = Mutex::new(());

pub struct LogSink {
  file: Mutex<File>,
  path: PathBuf,
  closed: AtomicBool,
}

impl LogSink {
  /// Opens `<dir>/<YYYYMMDD_HHMMSS>.log`, creating `dir` (mode 0755) if
  /// absent.
  pub fn open(dir: &Path) -> std::io::Result<Self> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o755));
    }
    let filename = format!("{}.log", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(Self {
      file: Mutex::new(file),
      path,
      closed: AtomicBool::new(false),
    })
  }

  #[must_use]
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Line-atomic, flushed per write, mirrored to stdout.
  pub fn write(&self, message: &str) {
    if self.closed.load(Ordering::Acquire) {
      return;
    }
    let line = format!("{} - {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
    {
      let mut file = self.file.lock();
      let _ = file.write_all(line.as_bytes());
      let _ = file.flush();
    }
    {
      let _guard = STDOUT_LOCK.lock();
      print!("{line}");
      let _ = std::io::stdout().flush();
    }
  }

  /// Idempotent.
  pub fn close(&self) {
    if self.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    let mut file = self.file.lock();
    let _ = file.flush();
  }
}
