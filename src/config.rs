//! Application directory and the saved destination path.
//!
//! Everything lives under `~/.importpics` unless `IMPORTPICS_HOME` points
//! elsewhere (handy for tests and portable setups).

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{ImportError, Result};

pub const APP_DIR_NAME: &str = ".importpics";
pub const SETTINGS_FILE: &str = "importpicscfg";
pub const LEDGER_DIR: &str = "copylogs";
pub const HOME_ENV: &str = "IMPORTPICS_HOME";
const DESTPATH_KEY: &str = "destpath";

#[cfg(target_os = "macos")]
pub const MOUNT_ROOTS: &[&str] = &["/Volumes"];
#[cfg(not(target_os = "macos"))]
pub const MOUNT_ROOTS: &[&str] = &["/media", "/run/media"];

pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

pub fn app_dir() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(path));
    }
    home_dir()
        .map(|home| home.join(APP_DIR_NAME))
        .ok_or_else(|| ImportError::Config("no home directory available".to_string()))
}

pub fn ledger_dir(app_dir: &Path) -> PathBuf {
    app_dir.join(LEDGER_DIR)
}

/// Replaces a leading `~` with the home directory.
pub fn expand_tilde(raw: &str) -> PathBuf {
    let home = home_dir();
    match (raw.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(raw),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub destpath: Option<PathBuf>,
}

impl Settings {
    /// Reads `destpath=<path>` lines; anything else is ignored.
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        for line in content.lines().map(str::trim) {
            if let Some((key, value)) = line.split_once('=')
                && key.trim() == DESTPATH_KEY
                && !value.trim().is_empty()
            {
                settings.destpath = Some(expand_tilde(value.trim()));
            }
        }
        settings
    }

    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = app_dir.join(SETTINGS_FILE);
        if !path.is_file() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| ImportError::io(&path, e))?;
        Ok(Self::parse(&content))
    }

    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir).map_err(|e| ImportError::io(app_dir, e))?;
        let path = app_dir.join(SETTINGS_FILE);
        let mut content = String::new();
        if let Some(destpath) = &self.destpath {
            content.push_str(&format!("{}={}\n", DESTPATH_KEY, destpath.display()));
        }
        fs::write(&path, content).map_err(|e| ImportError::io(&path, e))
    }
}

/// Whether a missing destination may be created on request.
pub fn is_in_home(path: &Path) -> bool {
    home_dir().is_some_and(|home| path.starts_with(home))
}

pub fn validate_destination(path: &Path) -> Result<PathBuf> {
    validate_destination_in(path, MOUNT_ROOTS)
}

/// The destination must be an existing directory outside removable media.
///
/// Returns the canonical path, which is what the mount-root check applies to.
pub fn validate_destination_in(path: &Path, mount_roots: &[&str]) -> Result<PathBuf> {
    let canonical = path.canonicalize().map_err(|e| ImportError::Destination {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !canonical.is_dir() {
        return Err(ImportError::Destination {
            path: canonical,
            reason: "not a directory".to_string(),
        });
    }
    if let Some(root) = mount_roots.iter().find(|root| canonical.starts_with(root)) {
        return Err(ImportError::Destination {
            path: canonical,
            reason: format!("destination is under removable media root {}", root),
        });
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_destpath_and_ignores_noise() {
        let settings = Settings::parse("# saved\nfoo=bar\ndestpath=/photos/archive\n\n");
        assert_eq!(settings.destpath, Some(PathBuf::from("/photos/archive")));
        assert_eq!(Settings::parse("destpath=\n"), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        assert_eq!(Settings::load(&app).unwrap(), Settings::default());

        let settings = Settings {
            destpath: Some(PathBuf::from("/photos/archive")),
        };
        settings.save(&app).unwrap();
        assert_eq!(
            fs::read_to_string(app.join(SETTINGS_FILE)).unwrap(),
            "destpath=/photos/archive\n"
        );
        assert_eq!(Settings::load(&app).unwrap(), settings);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~/Pictures"), home.join("Pictures"));
            assert_eq!(expand_tilde("~"), home);
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn destination_must_be_directory_off_removable_media() {
        let dir = tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(
            validate_destination_in(dir.path(), &["/nonexistent-mounts"]).unwrap(),
            canonical
        );

        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            validate_destination_in(&file, &[]),
            Err(ImportError::Destination { .. })
        ));
        assert!(matches!(
            validate_destination_in(&dir.path().join("missing"), &[]),
            Err(ImportError::Destination { .. })
        ));

        let root = canonical.to_str().unwrap();
        assert!(matches!(
            validate_destination_in(dir.path(), &[root]),
            Err(ImportError::Destination { .. })
        ));
    }

    #[test]
    fn indirect_path_into_mount_root_is_refused() {
        let dir = tempdir().unwrap();
        let mounts = dir.path().join("mnt");
        fs::create_dir_all(mounts.join("CARD")).unwrap();
        fs::create_dir_all(dir.path().join("home")).unwrap();
        let mounts = mounts.canonicalize().unwrap();
        let root = mounts.to_str().unwrap();

        let sneaky = dir.path().join("home").join("..").join("mnt").join("CARD");
        assert!(!sneaky.starts_with(&mounts));
        assert!(matches!(
            validate_destination_in(&sneaky, &[root]),
            Err(ImportError::Destination { .. })
        ));

        let fine = dir.path().join("mnt").join("..").join("home");
        assert_eq!(
            validate_destination_in(&fine, &[root]).unwrap(),
            dir.path().join("home").canonicalize().unwrap()
        );
    }
}
