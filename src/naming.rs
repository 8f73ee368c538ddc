use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{ImportError, Result};

pub const DEFAULT_DATE_FORMAT: &str = "%y%m%d";

/// `<formatted date>_<camera fingerprint>`, e.g. `100620_nik3fa9c1`.
pub fn subfolder(timestamp: &NaiveDateTime, fingerprint: &str, date_format: &str) -> Result<String> {
    let mut name = String::new();
    write!(name, "{}", timestamp.format(date_format)).map_err(|_| {
        ImportError::InvalidArgument(format!("invalid date format {:?}", date_format))
    })?;
    name.push('_');
    name.push_str(fingerprint);
    Ok(name)
}

/// First `<base>_<nn>` that is not an existing directory, counting up from
/// `start` with `digits` zero-padded digits.
///
/// Nothing is reserved: the name may be taken by the time it is created.
pub fn alternate(base: &Path, digits: u32, start: u64) -> Result<PathBuf> {
    let name = base
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            ImportError::InvalidArgument(format!(
                "alternate folder needs a named base, got {:?}",
                base
            ))
        })?;
    if digits < 1 {
        return Err(ImportError::InvalidArgument(
            "alternate folder needs at least one digit".to_string(),
        ));
    }
    let stop = 10u64.checked_pow(digits).ok_or_else(|| {
        ImportError::InvalidArgument(format!("too many digits for alternate folder: {}", digits))
    })?;

    for n in start..stop {
        let candidate = base.with_file_name(format!("{}_{:0width$}", name, n, width = digits as usize));
        if !candidate.is_dir() {
            return Ok(candidate);
        }
    }
    Err(ImportError::AlternateExhausted {
        base: base.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn name_of(path: &Path) -> &str {
        path.file_name().and_then(|n| n.to_str()).unwrap()
    }

    #[test]
    fn subfolder_joins_date_and_fingerprint() {
        let ts = NaiveDate::from_ymd_opt(2010, 6, 20)
            .unwrap()
            .and_hms_opt(14, 3, 11)
            .unwrap();
        assert_eq!(
            subfolder(&ts, "nik3fa9c1", DEFAULT_DATE_FORMAT).unwrap(),
            "100620_nik3fa9c1"
        );
        assert_eq!(subfolder(&ts, "abc123", "%Y-%m").unwrap(), "2010-06_abc123");
    }

    #[test]
    fn subfolder_rejects_bad_format() {
        let ts = NaiveDate::from_ymd_opt(2010, 6, 20)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(matches!(
            subfolder(&ts, "abc123", "%Q"),
            Err(ImportError::InvalidArgument(_))
        ));
    }

    #[test]
    fn alternate_counts_up_past_existing_folders() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("X");
        fs::create_dir_all(base.join("1")).unwrap();

        let alt = alternate(&base, 1, 1).unwrap();
        assert_eq!(name_of(&alt), "X_1");
        fs::create_dir(&alt).unwrap();

        let alt = alternate(&base, 1, 1).unwrap();
        assert_eq!(name_of(&alt), "X_2");
        fs::create_dir(&alt).unwrap();

        let alt = alternate(&base, 3, 1).unwrap();
        assert_eq!(name_of(&alt), "X_001");
        assert_eq!(alt.parent(), Some(dir.path()));
    }

    #[test]
    fn alternate_exhausts_range() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("X");
        let alt = alternate(&base, 1, 9).unwrap();
        assert_eq!(name_of(&alt), "X_9");
        fs::create_dir(&alt).unwrap();
        assert!(matches!(
            alternate(&base, 1, 9),
            Err(ImportError::AlternateExhausted { .. })
        ));
    }

    #[test]
    fn alternate_validates_arguments() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            alternate(&dir.path().join("X"), 0, 1),
            Err(ImportError::InvalidArgument(_))
        ));
        assert!(matches!(
            alternate(Path::new(""), 2, 1),
            Err(ImportError::InvalidArgument(_))
        ));
    }
}
