//! Copies approved shots into the archive.
//!
//! A shot is redirected as a whole: if any member would land on a directory
//! or on a file of a different size, every member goes to the shot's
//! alternate folder instead.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ImportError, Result};
use crate::ledger::LedgerWriter;
use crate::metrics::Metrics;
use crate::plan::CopyPlan;
use crate::shots::ShotGroup;

/// What is found at a member's destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Existing {
    Nothing,
    SameSize,
    Conflict,
}

fn probe(src: &Path, dest: &Path) -> Result<Existing> {
    let dest_meta = match fs::metadata(dest) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Existing::Nothing),
        Err(err) => return Err(ImportError::io(dest, err)),
    };
    if !dest_meta.is_file() {
        return Ok(Existing::Conflict);
    }
    let src_len = fs::metadata(src).map_err(|e| ImportError::io(src, e))?.len();
    if dest_meta.len() == src_len {
        Ok(Existing::SameSize)
    } else {
        Ok(Existing::Conflict)
    }
}

fn target(folder: &Path, src: &Path) -> Result<PathBuf> {
    let name = src.file_name().ok_or_else(|| {
        ImportError::InvalidArgument(format!("{} has no file name", src.display()))
    })?;
    Ok(folder.join(name))
}

/// Streams `src` into a temporary file next to `dest`, then moves it into
/// place without overwriting. Nothing is left under `dest` on failure.
pub fn copy_file(src: &Path, dest: &Path) -> io::Result<u64> {
    let folder = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    let mut reader = File::open(src)?;
    let modified = reader.metadata()?.modified()?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".importpics")
        .tempfile_in(folder)?;
    let bytes = io::copy(&mut reader, tmp.as_file_mut())?;
    tmp.as_file().set_modified(modified)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(dest).map_err(|e| e.error)?;
    Ok(bytes)
}

/// Copies approved shots one at a time.
///
/// Remembers the alternate folders it created, since shots of one day share
/// an alternate and only the first may create it.
#[derive(Debug, Default)]
pub struct Executor {
    created_alternates: HashSet<PathBuf>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies one approved shot, recording each landed file in the copy log.
    ///
    /// Returns the number of bytes written. A failed file copy is recorded in
    /// `metrics.failed` and does not stop the shot.
    pub fn execute(
        &mut self,
        plan: &CopyPlan,
        log: &mut LedgerWriter,
        metrics: &mut Metrics,
        shot: &ShotGroup,
    ) -> Result<u64> {
        let mut folder = plan.destination(shot)?;
        fs::create_dir_all(&folder).map_err(|e| ImportError::io(&folder, e))?;

        let mut conflicted = false;
        for src in shot.files() {
            if probe(src, &target(&folder, src)?)? == Existing::Conflict {
                conflicted = true;
                break;
            }
        }

        if conflicted {
            let alt = plan.alternate_destination(shot)?;
            warn!(
                "{} conflicts with existing files in {}, using {}",
                shot.base().display(),
                folder.display(),
                alt.display()
            );
            if !self.created_alternates.contains(&alt) {
                fs::create_dir(&alt).map_err(|e| ImportError::io(&alt, e))?;
                self.created_alternates.insert(alt.clone());
                metrics.alt_folders.push(alt.clone());
            }
            folder = alt;
        }

        let mut written = 0;
        for src in shot.files() {
            let dest = target(&folder, src)?;
            match probe(src, &dest)? {
                Existing::SameSize => {
                    debug!("{} already present", dest.display());
                    metrics.skip_existing.push(dest);
                }
                Existing::Conflict => return Err(ImportError::Collision { path: dest }),
                Existing::Nothing => match copy_file(src, &dest) {
                    Ok(bytes) => {
                        log.add(src)?;
                        metrics.copied += 1;
                        written += bytes;
                        info!("copied {} -> {}", src.display(), dest.display());
                    }
                    Err(err) => {
                        warn!("failed to copy {} -> {}: {}", src.display(), dest.display(), err);
                        metrics.failed.push(dest);
                    }
                },
            }
        }
        Ok(written)
    }
}
