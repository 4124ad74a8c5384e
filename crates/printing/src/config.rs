use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::TextMetrics;
use crate::page::{PageConfig, DEFAULT_PAPER_WIDTH_MM};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read printer settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse printer settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Nominal paper dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperSettings {
    pub width_mm: f64,
    /// Leave out for a continuous roll.
    pub height_mm: Option<u32>,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            width_mm: DEFAULT_PAPER_WIDTH_MM,
            height_mm: None,
        }
    }
}

impl PaperSettings {
    pub fn page_config(&self) -> PageConfig {
        PageConfig::from_paper(self.width_mm, self.height_mm)
    }
}

/// Printer selection, paper and text metrics, stored as JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    pub target: Option<String>,
    pub paper: PaperSettings,
    pub metrics: TextMetrics,
}

impl PrinterSettings {
    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(contents)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn sanitize(&mut self) {
        if !(self.paper.width_mm.is_finite() && self.paper.width_mm > 10.0) {
            self.paper.width_mm = DEFAULT_PAPER_WIDTH_MM;
        }
        if self.paper.height_mm == Some(0) {
            self.paper.height_mm = None;
        }
        if self
            .target
            .as_deref()
            .is_some_and(|target| target.trim().is_empty())
        {
            self.target = None;
        }
        self.metrics.sanitize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PrintMode;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = PrinterSettings::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, PrinterSettings::default());
        assert_eq!(settings.paper.page_config().mode, PrintMode::Continuous);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let settings = PrinterSettings::from_json(
            r#"{ "target": "PDF Writer", "paper": { "width_mm": 80, "height_mm": 120 } }"#,
        )
        .unwrap();
        assert_eq!(settings.target.as_deref(), Some("PDF Writer"));
        assert_eq!(settings.metrics, TextMetrics::default());
        let page = settings.paper.page_config();
        assert_eq!(page.printable_width_px, 284);
        assert_eq!(page.mode, PrintMode::Paginated);
    }

    #[test]
    fn metrics_can_be_overridden() {
        let settings = PrinterSettings::from_json(
            r#"{ "metrics": { "font_family": "Noto Sans Mono", "char_proportion": 0.6 } }"#,
        )
        .unwrap();
        assert_eq!(settings.metrics.font_family, "Noto Sans Mono");
        assert_eq!(settings.metrics.char_proportion, 0.6);
        assert_eq!(settings.metrics.line_height_proportion, 1.6);
    }

    #[test]
    fn invalid_values_are_sanitized() {
        let settings = PrinterSettings::from_json(
            r#"{ "target": " ", "paper": { "width_mm": -3, "height_mm": 0 } }"#,
        )
        .unwrap();
        assert!(settings.target.is_none());
        assert_eq!(settings.paper, PaperSettings::default());
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("printer.json");
        fs::write(&path, "{ not json").unwrap();
        match PrinterSettings::load(&path) {
            Err(SettingsError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
