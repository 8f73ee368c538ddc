//! Append-only record of source paths copied by earlier runs.
//!
//! Every run writes its own `copiedfiles.<pid>.<unix>.log` inside the ledger
//! folder, so runs never share a write handle. Loading merges every log in
//! the folder into one set.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::{ImportError, Result};

pub const LOG_PREFIX: &str = "copiedfiles";
pub const LOG_SUFFIX: &str = ".log";

#[derive(Debug)]
pub struct CopyLedger {
    folder: PathBuf,
    log_path: PathBuf,
    copied: HashSet<String>,
}

impl CopyLedger {
    /// Creates `folder` if needed and merges every log file found in it.
    pub fn load(folder: &Path) -> Result<Self> {
        fs::create_dir_all(folder).map_err(|e| ImportError::io(folder, e))?;

        let mut copied = HashSet::new();
        let mut logs = 0;
        for entry in fs::read_dir(folder).map_err(|e| ImportError::io(folder, e))? {
            let entry = entry.map_err(|e| ImportError::io(folder, e))?;
            let path = entry.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(LOG_SUFFIX));
            if !is_log || !path.is_file() {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| ImportError::io(&path, e))?;
            copied.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
            logs += 1;
        }
        debug!(
            "loaded {} copied paths from {} logs in {}",
            copied.len(),
            logs,
            folder.display()
        );

        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let log_path = folder.join(format!(
            "{}.{}.{}{}",
            LOG_PREFIX,
            std::process::id(),
            unix,
            LOG_SUFFIX
        ));

        Ok(Self {
            folder: folder.to_path_buf(),
            log_path,
            copied,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// The log file this run appends to.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn len(&self) -> usize {
        self.copied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
    }

    /// True only if every path was recorded by a previous run.
    ///
    /// Paths added through a [`LedgerWriter`] during this run are not seen.
    pub fn already_copied<P: AsRef<Path>>(&self, paths: &[P]) -> Result<bool> {
        if paths.is_empty() {
            return Err(ImportError::InvalidArgument(
                "already_copied needs at least one path".to_string(),
            ));
        }
        Ok(paths
            .iter()
            .all(|p| self.copied.contains(&*p.as_ref().to_string_lossy())))
    }

    /// Opens this run's log for appending.
    ///
    /// The returned writer flushes and closes the log when dropped.
    pub fn acquire(&self) -> Result<LedgerWriter> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| ImportError::io(&self.log_path, e))?;
        debug!("opened copy log {}", self.log_path.display());
        Ok(LedgerWriter {
            path: self.log_path.clone(),
            writer: Some(BufWriter::new(file)),
            added: 0,
        })
    }
}

/// Write handle on the current run's log.
#[derive(Debug)]
pub struct LedgerWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    added: usize,
}

impl LedgerWriter {
    /// Appends one copied source path.
    ///
    /// The line reaches the file before this returns, so a killed run still
    /// leaves its completed copies on record.
    pub fn add(&mut self, copied: &Path) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            ImportError::InvariantViolation("copy log used after close".to_string())
        })?;
        writeln!(writer, "{}", copied.to_string_lossy())
            .and_then(|_| writer.flush())
            .map_err(|e| ImportError::io(&self.path, e))?;
        self.added += 1;
        Ok(())
    }

    /// Number of paths appended through this handle.
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and releases the log, reporting any flush error.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| ImportError::io(&self.path, e))?;
            writer
                .get_ref()
                .sync_all()
                .map_err(|e| ImportError::io(&self.path, e))?;
        }
        Ok(())
    }
}

impl Drop for LedgerWriter {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("failed to flush copy log: {}", err);
        }
    }
}
