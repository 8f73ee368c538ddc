//! Decides which shots of a card need copying and where they go.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{ImportError, Result};
use crate::ledger::CopyLedger;
use crate::metadata::{MetadataExtractor, camera_fingerprint, capture_timestamp};
use crate::metrics::Metrics;
use crate::naming::{self, DEFAULT_DATE_FORMAT};
use crate::shots::ShotGroup;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;
pub const ALT_DIGITS: u32 = 2;
pub const ALT_START: u64 = 1;

/// True when `captured` is at most `days` days before `started`.
///
/// Future captures are always inside the window.
pub fn in_lookback(started: NaiveDate, captured: NaiveDate, days: i64) -> bool {
    (started - captured).num_days() <= days
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub destpath: PathBuf,
    pub started: NaiveDateTime,
    pub lookback_days: i64,
    pub max_shots: Option<usize>,
    pub force: bool,
    pub date_format: String,
}

impl PlanOptions {
    pub fn new(destpath: impl Into<PathBuf>, started: NaiveDateTime) -> Self {
        Self {
            destpath: destpath.into(),
            started,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            max_shots: None,
            force: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// Outcome of [`CopyPlan::schedule`] for one shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    CapReached,
    AlreadyCopied,
    TooOld,
    Accepted,
}

#[derive(Debug)]
pub struct CopyPlan {
    options: PlanOptions,
    shots: Vec<ShotGroup>,
    total_bytes: u64,
}

impl CopyPlan {
    pub fn new(options: PlanOptions) -> Self {
        Self {
            options,
            shots: Vec::new(),
            total_bytes: 0,
        }
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    pub fn destpath(&self) -> &Path {
        &self.options.destpath
    }

    /// Approved shots in scheduling order.
    pub fn shots(&self) -> &[ShotGroup] {
        &self.shots
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Primary destination folder of an approved shot.
    pub fn destination(&self, shot: &ShotGroup) -> Result<PathBuf> {
        let subfolder = shot.dest_subfolder.as_ref().ok_or_else(|| {
            ImportError::InvariantViolation(format!(
                "shot {} has no destination",
                shot.base().display()
            ))
        })?;
        Ok(self.options.destpath.join(subfolder))
    }

    /// Fallback folder used when the primary destination conflicts.
    pub fn alternate_destination(&self, shot: &ShotGroup) -> Result<PathBuf> {
        let subfolder = shot.dest_subfolder_alt.as_ref().ok_or_else(|| {
            ImportError::InvariantViolation(format!(
                "shot {} has no alternate destination",
                shot.base().display()
            ))
        })?;
        Ok(self.options.destpath.join(subfolder))
    }

    /// Applies the gating rules to one shot, first match wins.
    ///
    /// A shot without a readable capture date aborts planning.
    pub fn schedule(
        &mut self,
        ledger: &CopyLedger,
        extractor: &dyn MetadataExtractor,
        metrics: &mut Metrics,
        mut shot: ShotGroup,
    ) -> Result<Decision> {
        metrics.seen += 1;

        if let Some(max) = self.options.max_shots
            && self.shots.len() >= max
        {
            debug!("cap of {} shots reached, skipping {}", max, shot.base().display());
            return Ok(Decision::CapReached);
        }

        if !self.options.force && ledger.already_copied(shot.files())? {
            debug!("already copied {}", shot.base().display());
            metrics.already_copied += shot.len();
            return Ok(Decision::AlreadyCopied);
        }

        let primary = shot.primary()?.to_path_buf();
        let tags = extractor.extract(&primary)?;
        let captured = capture_timestamp(&tags, &primary)?;
        let fingerprint = camera_fingerprint(&tags);

        let subfolder = naming::subfolder(&captured, &fingerprint, &self.options.date_format)?;
        let alt = naming::alternate(&self.options.destpath.join(&subfolder), ALT_DIGITS, ALT_START)?;
        shot.dest_subfolder_alt = alt
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        shot.dest_subfolder = Some(subfolder);
        shot.captured = Some(captured);

        if !in_lookback(
            self.options.started.date(),
            captured.date(),
            self.options.lookback_days,
        ) {
            debug!(
                "{} taken {} is older than {} days",
                shot.base().display(),
                captured,
                self.options.lookback_days
            );
            metrics.too_old += 1;
            return Ok(Decision::TooOld);
        }

        let size = shot.size()?;
        debug!(
            "scheduled {} ({} files, {} bytes)",
            shot.base().display(),
            shot.len(),
            size
        );
        self.total_bytes += size;
        self.shots.push(shot);
        Ok(Decision::Accepted)
    }
}
