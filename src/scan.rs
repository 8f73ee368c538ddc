use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{ImportError, Result};

pub const PICTURE_EXTENSIONS: &[&str] = &["jpg", "nef", "png", "gif", "tiff"];

pub fn has_extension(filename: &str, extensions: &[&str]) -> bool {
    let lower = filename.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext.to_lowercase())))
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Collects every picture below `root`, skipping hidden directories.
///
/// Returned paths are absolute and canonical, since they end up in the copy
/// log. Unreadable entries are logged and skipped; a missing root is an error.
pub fn all_pictures(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let canonical = root.canonicalize().map_err(|e| ImportError::io(root, e))?;
    let root = canonical.as_path();
    if !root.is_dir() {
        return Err(ImportError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source is not a directory"),
        ));
    }

    let mut pictures = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(filename) = entry.file_name().to_str()
            && has_extension(filename, extensions)
        {
            pictures.push(entry.into_path());
        }
    }

    pictures.sort();
    debug!("found {} pictures under {}", pictures.len(), root.display());
    Ok(pictures)
}
