//! Solar Park Inspection Core
//!
//! This crate turns raw inspection findings into a panel's operational
//! state, rolls those states up into a fleet summary, and encodes panel
//! inventories and finding histories as CSV for download.

pub mod aggregate;
pub mod classify;
pub mod export;
pub mod intake;
pub mod model;
pub mod report;
pub mod store;
pub mod summary;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub use aggregate::{derive_status, Diagnostic, PanelStatus};
pub use classify::{classify, Cleanliness, ClassifierInput, LegacyReading};
pub use export::{encode, export_all, Column, CsvFile, CsvValue, ExportBundle};
pub use model::{DefectType, Finding, Inspection, Panel, Park};
pub use store::{DataStore, MemoryStore, Snapshot};
pub use summary::{summarize, FleetSummary, StatusCounts};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Runtime configuration shared by the CLI and the export writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvConfig {
    /// JSON snapshot the in-memory store is seeded from
    pub snapshot_path: PathBuf,
    /// Directory CSV exports are written to
    pub export_dir: PathBuf,
    /// chrono format used for timestamps in exported rows
    pub date_format: String,
    /// Restrict panel reads to one park
    pub park: Option<i64>,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./data/snapshot.json"),
            export_dir: PathBuf::from("./exports"),
            date_format: export::DEFAULT_DATE_FORMAT.to_string(),
            park: None,
        }
    }
}

impl PvConfig {
    /// Build a configuration from `PV_SNAPSHOT`, `PV_EXPORT_DIR` and `PV_PARK`,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> CoreResult<Self> {
        let defaults = Self::default();

        let park = match std::env::var("PV_PARK") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|e| CoreError::Config(format!("PV_PARK '{}': {}", raw, e)))?,
            ),
            _ => None,
        };

        Ok(Self {
            snapshot_path: std::env::var("PV_SNAPSHOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            export_dir: std::env::var("PV_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            date_format: defaults.date_format,
            park,
        })
    }
}

/// Operational state of a panel or a single finding.
///
/// The wire labels are the ones the backend stores (`OPERATIVO`, `ALERTA`,
/// `CRITICO`, `PENDIENTE`). Anything else read from the store folds into
/// [`Status::Pending`] instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Operational,
    Alert,
    Critical,
    Pending,
}

impl Status {
    /// Bucket order used by the dashboard chart
    pub const ALL: [Status; 4] = [
        Status::Critical,
        Status::Alert,
        Status::Operational,
        Status::Pending,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Status::Operational => "OPERATIVO",
            Status::Alert => "ALERTA",
            Status::Critical => "CRITICO",
            Status::Pending => "PENDIENTE",
        }
    }

    /// Strict parse of a wire label. Returns `None` for unknown values.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "OPERATIVO" => Some(Status::Operational),
            "ALERTA" => Some(Status::Alert),
            "CRITICO" => Some(Status::Critical),
            "PENDIENTE" => Some(Status::Pending),
            _ => None,
        }
    }

    /// Lenient parse: unknown or empty labels are pending.
    pub fn fold(label: &str) -> Self {
        Self::from_label(label).unwrap_or_else(|| {
            if !label.trim().is_empty() {
                tracing::warn!("Unknown status '{}', treating as PENDIENTE", label);
            }
            Status::Pending
        })
    }

    /// Legend label for the dashboard chart
    pub fn chart_label(&self) -> &'static str {
        match self {
            Status::Critical => "Críticos",
            Status::Alert => "Alerta",
            Status::Operational => "Operativos",
            Status::Pending => "Pendientes",
        }
    }

    /// Chart slice color
    pub fn color(&self) -> &'static str {
        match self {
            Status::Critical => "#ff4d4f",
            Status::Alert => "#faad14",
            Status::Operational => "#52c41a",
            Status::Pending => "#d9d9d9",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Status::Pending)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

impl From<String> for Status {
    fn from(label: String) -> Self {
        Status::fold(&label)
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.label().to_string()
    }
}
