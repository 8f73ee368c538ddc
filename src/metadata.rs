//! Capture metadata read from a shot's primary file.
//!
//! Only a closed set of tags matters for naming destinations; everything
//! else reported by the extractor is dropped.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use md5::{Digest, Md5};
use regex::Regex;
use serde_json::Value;

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExifTag {
    DateTimeOriginal,
    DateTimeDigitized,
    DateTime,
    Make,
    Model,
    SerialNumber,
}

impl ExifTag {
    pub const ALL: [ExifTag; 6] = [
        ExifTag::DateTimeOriginal,
        ExifTag::DateTimeDigitized,
        ExifTag::DateTime,
        ExifTag::Make,
        ExifTag::Model,
        ExifTag::SerialNumber,
    ];

    /// Timestamp tags, most specific first.
    pub const DATE_TAGS: [ExifTag; 3] = [
        ExifTag::DateTimeOriginal,
        ExifTag::DateTimeDigitized,
        ExifTag::DateTime,
    ];

    pub const CAMERA_TAGS: [ExifTag; 3] = [ExifTag::Make, ExifTag::Model, ExifTag::SerialNumber];

    /// Key used by `exiftool -j` for this tag.
    pub fn exiftool_key(self) -> &'static str {
        match self {
            ExifTag::DateTimeOriginal => "DateTimeOriginal",
            ExifTag::DateTimeDigitized => "CreateDate",
            ExifTag::DateTime => "ModifyDate",
            ExifTag::Make => "Make",
            ExifTag::Model => "Model",
            ExifTag::SerialNumber => "SerialNumber",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue<'a> {
    Present(&'a str),
    Absent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifTags(BTreeMap<ExifTag, String>);

impl ExifTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: ExifTag, value: impl Into<String>) -> Self {
        self.insert(tag, value);
        self
    }

    pub fn insert(&mut self, tag: ExifTag, value: impl Into<String>) {
        self.0.insert(tag, value.into());
    }

    pub fn get(&self, tag: ExifTag) -> TagValue<'_> {
        match self.0.get(&tag) {
            Some(value) => TagValue::Present(value),
            None => TagValue::Absent,
        }
    }

    /// Builds the tag map from one object of `exiftool -j` output.
    pub fn from_exiftool_json(object: &Value) -> Self {
        let mut tags = ExifTags::new();
        for tag in ExifTag::ALL {
            let value = match object.get(tag.exiftool_key()) {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            if !value.is_empty() {
                tags.insert(tag, value);
            }
        }
        tags
    }
}

/// Reads capture metadata from a picture file.
pub trait MetadataExtractor {
    fn extract(&self, path: &Path) -> Result<ExifTags>;
}

/// Shells out to `exiftool -j`.
#[derive(Debug, Clone)]
pub struct Exiftool {
    program: String,
}

impl Default for Exiftool {
    fn default() -> Self {
        Self {
            program: "exiftool".to_string(),
        }
    }
}

impl Exiftool {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MetadataExtractor for Exiftool {
    fn extract(&self, path: &Path) -> Result<ExifTags> {
        let output = Command::new(&self.program)
            .arg("-j")
            .arg(path)
            .output()
            .map_err(|e| ImportError::Metadata {
                path: path.to_path_buf(),
                reason: format!("failed to run {}: {}", self.program, e),
            })?;
        if !output.status.success() {
            return Err(ImportError::Metadata {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let json: Vec<Value> =
            serde_json::from_slice(&output.stdout).map_err(|e| ImportError::Metadata {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let object = json.into_iter().next().unwrap_or(Value::Null);
        Ok(ExifTags::from_exiftool_json(&object))
    }
}

static EXIF_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[:\-](\d{2})[:\-](\d{2})[ T](\d{2}):(\d{2}):(\d{2})")
        .expect("EXIF date pattern is valid")
});

/// Parses `2010:06:20 14:03:11`, ignoring trailing sub-seconds or zone.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let caps = EXIF_DATE.captures(raw.trim())?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?.and_hms_opt(num(4)?, num(5)?, num(6)?)
}

/// First parseable timestamp among the date tags, most specific first.
pub fn capture_timestamp(tags: &ExifTags, path: &Path) -> Result<NaiveDateTime> {
    ExifTag::DATE_TAGS
        .iter()
        .filter_map(|tag| match tags.get(*tag) {
            TagValue::Present(raw) => parse_exif_datetime(raw),
            TagValue::Absent => None,
        })
        .next()
        .ok_or_else(|| ImportError::MissingTimestamp {
            path: path.to_path_buf(),
        })
}

/// Short stable identifier of the camera that took the picture.
///
/// Last six hex digits of the MD5 of make, model and serial concatenated,
/// which keeps folder names compatible with existing archives. Nikon bodies
/// get a `nik` prefix so their folders sort together.
pub fn camera_fingerprint(tags: &ExifTags) -> String {
    let joined: String = ExifTag::CAMERA_TAGS
        .iter()
        .filter_map(|tag| match tags.get(*tag) {
            TagValue::Present(value) => Some(value),
            TagValue::Absent => None,
        })
        .collect();
    let prefix = if joined.to_lowercase().contains("nikon") {
        "nik"
    } else {
        ""
    };
    let hex = format!("{:x}", Md5::digest(joined.as_bytes()));
    format!("{}{}", prefix, &hex[hex.len() - 6..])
}
