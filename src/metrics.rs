use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DF_SIZES: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Byte count in the style of `df -h`: whole units, truncated, capped at EB.
pub fn human_readable(bytes: impl Into<u128>) -> String {
    let mut value: u128 = bytes.into();
    let mut prefix = 0;
    while value >= 1024 && prefix < DF_SIZES.len() - 1 {
        value /= 1024;
        prefix += 1;
    }
    format!("{}{}", value, DF_SIZES[prefix])
}

/// Counters for one run. Only reported, never consulted by planning or copying.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub seen: usize,
    pub already_copied: usize,
    pub too_old: usize,
    pub copied: usize,
    pub skip_existing: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub alt_folders: Vec<PathBuf>,
    pub space_before: Option<u64>,
    pub space_after: Option<u64>,
    pub elapsed: Duration,
}

fn space(value: Option<u64>) -> String {
    value.map(|v| human_readable(v)).unwrap_or_else(|| "unknown".to_string())
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shots seen:          {}", self.seen)?;
        writeln!(f, "Already copied:      {}", self.already_copied)?;
        writeln!(f, "Too old:             {}", self.too_old)?;
        writeln!(f, "Copied:              {}", self.copied)?;
        writeln!(f, "Skipped (existing):  {}", self.skip_existing.len())?;
        writeln!(f, "Failed:              {}", self.failed.len())?;
        for path in &self.failed {
            writeln!(f, "    {}", path.display())?;
        }
        writeln!(f, "Space before:        {}", space(self.space_before))?;
        writeln!(f, "Space after:         {}", space(self.space_after))?;
        if !self.alt_folders.is_empty() {
            writeln!(f, "Alternate folders created:")?;
            for path in &self.alt_folders {
                writeln!(f, "    {}", path.display())?;
            }
        }
        write!(f, "Total time: {} seconds", self.elapsed.as_secs())
    }
}
