use std::path::{Path, PathBuf};
use std::process::Command;

use sysinfo::Disks;
use tracing::debug;

use crate::error::{ImportError, Result};

/// Where the list of importable volumes comes from.
#[derive(Debug, Clone)]
pub enum VolumeProbe {
    /// Removable disks reported by the operating system.
    Removable,
    /// A helper command printing one volume per line.
    Command(String),
}

pub fn to_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl VolumeProbe {
    pub fn list(&self) -> Result<Vec<String>> {
        match self {
            VolumeProbe::Removable => {
                let mut mounts: Vec<String> = Disks::new_with_refreshed_list()
                    .iter()
                    .filter(|d| d.is_removable())
                    .map(|d| d.mount_point().display().to_string())
                    .collect();
                mounts.sort();
                mounts.dedup();
                debug!("removable volumes: {:?}", mounts);
                Ok(mounts)
            }
            VolumeProbe::Command(cmdline) => run_helper(cmdline),
        }
    }
}

fn run_helper(cmdline: &str) -> Result<Vec<String>> {
    let mut parts = cmdline.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| ImportError::VolumeProbe("empty volume command".to_string()))?;
    let output = Command::new(program)
        .args(parts)
        .output()
        .map_err(|e| ImportError::VolumeProbe(format!("failed to run {}: {}", program, e)))?;
    if !output.status.success() {
        return Err(ImportError::VolumeProbe(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(to_lines(&String::from_utf8_lossy(&output.stdout)))
}

/// Free bytes on the disk holding `path`, if it can be determined.
pub fn available_space(path: &Path) -> Option<u64> {
    let path = path.canonicalize().unwrap_or_else(|_| PathBuf::from(path));
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| d.available_space())
}
