use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{ImportError, Result};

pub fn is_jpeg_file(filename: &str) -> bool {
    let ext = filename.to_lowercase();
    ext.ends_with(".jpg") || ext.ends_with(".jpeg")
}

/// The path with its extension removed; siblings of one shot share it.
pub fn base_path(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Sibling files of one photograph, e.g. `DSC_0001.NEF` and `DSC_0001.JPG`.
///
/// Identity and membership are fixed at grouping time. The remaining fields
/// are filled in while planning.
#[derive(Debug, Clone)]
pub struct ShotGroup {
    base: PathBuf,
    files: Vec<PathBuf>,
    size: Option<u64>,
    pub dest_subfolder: Option<String>,
    pub dest_subfolder_alt: Option<String>,
    pub captured: Option<NaiveDateTime>,
}

impl ShotGroup {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            files: Vec::new(),
            size: None,
            dest_subfolder: None,
            dest_subfolder_alt: None,
            captured: None,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Member paths in insertion order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn push(&mut self, path: PathBuf) -> Result<()> {
        let base = base_path(&path);
        if base != self.base {
            return Err(ImportError::InvariantViolation(format!(
                "{} does not belong to shot {}",
                path.display(),
                self.base.display()
            )));
        }
        self.files.push(path);
        Ok(())
    }

    /// The single JPEG member that metadata is read from.
    pub fn primary(&self) -> Result<&Path> {
        let mut candidates = self.files.iter().filter(|f| {
            f.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_jpeg_file)
        });
        match (candidates.next(), candidates.next()) {
            (Some(primary), None) => Ok(primary.as_path()),
            (None, _) => Err(ImportError::NoPrimary {
                base: self.base.clone(),
            }),
            (Some(_), Some(_)) => Err(ImportError::AmbiguousPrimary {
                base: self.base.clone(),
            }),
        }
    }

    /// Size computed by an earlier [`ShotGroup::size`] call.
    pub fn known_size(&self) -> Option<u64> {
        self.size
    }

    /// Sum of the member file sizes, read from disk on first call only.
    pub fn size(&mut self) -> Result<u64> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let mut total = 0;
        for file in &self.files {
            let metadata = fs::metadata(file).map_err(|e| ImportError::io(file, e))?;
            total += metadata.len();
        }
        self.size = Some(total);
        Ok(total)
    }
}

/// Partitions `paths` into shots keyed by base path.
///
/// Purely path based; nothing is read from disk.
pub fn group_shots<I>(paths: I) -> Result<BTreeMap<PathBuf, ShotGroup>>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut groups: BTreeMap<PathBuf, ShotGroup> = BTreeMap::new();
    for path in paths {
        let base = base_path(&path);
        groups
            .entry(base.clone())
            .or_insert_with(|| ShotGroup::new(base))
            .push(path)?;
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn groups_siblings_by_base_name() {
        let paths = vec![
            PathBuf::from("/card/DCIM/DSC_0001.NEF"),
            PathBuf::from("/card/DCIM/DSC_0002.JPG"),
            PathBuf::from("/card/DCIM/DSC_0001.JPG"),
            PathBuf::from("/card/OTHER/DSC_0001.JPG"),
        ];
        let groups = group_shots(paths).unwrap();

        assert_eq!(groups.len(), 3);
        let first = &groups[Path::new("/card/DCIM/DSC_0001")];
        assert_eq!(
            first.files(),
            &[
                PathBuf::from("/card/DCIM/DSC_0001.NEF"),
                PathBuf::from("/card/DCIM/DSC_0001.JPG"),
            ]
        );
        assert_eq!(groups[Path::new("/card/DCIM/DSC_0002")].len(), 1);
        assert_eq!(groups[Path::new("/card/OTHER/DSC_0001")].len(), 1);
        let total: usize = groups.values().map(ShotGroup::len).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn push_rejects_foreign_path() {
        let mut shot = ShotGroup::new("/card/DSC_0001");
        let err = shot.push(PathBuf::from("/card/DSC_0002.JPG")).unwrap_err();
        assert!(matches!(err, ImportError::InvariantViolation(_)));
        assert!(shot.is_empty());
    }

    #[test]
    fn primary_requires_exactly_one_jpeg() {
        let mut raw_only = ShotGroup::new("/card/A");
        raw_only.push(PathBuf::from("/card/A.NEF")).unwrap();
        assert!(matches!(raw_only.primary(), Err(ImportError::NoPrimary { .. })));

        let mut pair = ShotGroup::new("/card/A");
        pair.push(PathBuf::from("/card/A.NEF")).unwrap();
        pair.push(PathBuf::from("/card/A.JPG")).unwrap();
        assert_eq!(pair.primary().unwrap(), Path::new("/card/A.JPG"));

        pair.push(PathBuf::from("/card/A.jpg")).unwrap();
        assert!(matches!(
            pair.primary(),
            Err(ImportError::AmbiguousPrimary { .. })
        ));
    }

    #[test]
    fn size_is_computed_once() {
        let dir = tempdir().unwrap();
        let jpg = dir.path().join("A.JPG");
        let raw = dir.path().join("A.NEF");
        fs::write(&jpg, b"1234").unwrap();
        fs::write(&raw, b"123456").unwrap();

        let mut shot = ShotGroup::new(dir.path().join("A"));
        shot.push(jpg.clone()).unwrap();
        shot.push(raw).unwrap();
        assert_eq!(shot.size().unwrap(), 10);

        fs::write(&jpg, b"much longer content").unwrap();
        assert_eq!(shot.size().unwrap(), 10);
    }
}
