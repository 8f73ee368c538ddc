//! Imports pictures from removable media into a dated, de-duplicated archive.

pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod metadata;
pub mod metrics;
pub mod naming;
pub mod plan;
pub mod prompt;
pub mod scan;
pub mod shots;
pub mod volumes;

pub use error::{ImportError, Result};
pub use ledger::{CopyLedger, LedgerWriter};
pub use metadata::{ExifTag, ExifTags, Exiftool, MetadataExtractor, TagValue};
pub use metrics::{Metrics, human_readable};
pub use plan::{CopyPlan, Decision, PlanOptions};
pub use shots::{ShotGroup, group_shots};
