use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// File name offered for a downloaded report.
pub const DEFAULT_FILE_NAME: &str = "disinformation_analysis.txt";

/// Content type of an exported report.
pub const MIME_TYPE: &str = "text/plain";

/// A finished analysis report, exportable as plain UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    text: String,
}

impl Report {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Report body as UTF-8 bytes, unchanged.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.text.as_bytes().to_vec()
    }

    pub fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    /// Write the report to `path`, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
        }
        fs::write(path, self.to_bytes())
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(path.to_path_buf())
    }
}
