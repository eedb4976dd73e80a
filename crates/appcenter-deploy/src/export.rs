//! Export of result variables to the CI environment

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use appcenter::pipeline::{STATUS_FAILED, STATUS_KEY};
use tracing::{debug, warn};

/// Environment variable naming the export file
pub const EXPORT_FILE_ENV: &str = "APPCENTER_EXPORT_FILE";

/// Appends `KEY=value` lines to an env file, as CI runners read them
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    file: Option<PathBuf>,
}

impl Exporter {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    /// Export file from the environment, for failures before arguments are parsed
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os(EXPORT_FILE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }

    /// Record a failed run; a write error is logged, not returned
    pub fn mark_failed(&self) {
        if let Err(e) = self.export(STATUS_KEY, STATUS_FAILED) {
            warn!(error = %e, "Failed to export deploy status");
        }
    }

    pub fn export(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let Some(ref path) = self.file else {
            return Ok(());
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open export file {}", path.display()))?;

        // one variable per line
        let value = value.replace(['\r', '\n'], " ");
        writeln!(file, "{}={}", key, value)
            .with_context(|| format!("Failed to export {} to {}", key, path.display()))?;

        debug!(key, path = %path.display(), "Exported variable");
        Ok(())
    }

    pub fn export_all(&self, outputs: &BTreeMap<String, String>) -> anyhow::Result<()> {
        for (key, value) in outputs {
            self.export(key, value)?;
        }
        Ok(())
    }
}
