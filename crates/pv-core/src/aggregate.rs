//! Effective panel status and diagnostic derivation
//!
//! Findings arrive from the store in no particular order, so every
//! derivation re-sorts them by creation time before picking the latest.

use crate::model::{Finding, Inspection, Panel};
use crate::Status;
use serde::{Deserialize, Serialize};

/// Short explanation shown next to a panel's status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Diagnostic {
    NoData,
    OptimalPerformance,
    /// Hotspot temperature in ºC
    Hotspot(f64),
    MountFailure,
    CleaningRequired,
    /// `{inspection type} - {technician}`
    Inspection(String),
    SeeDetails,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::NoData => write!(f, "no data"),
            Diagnostic::OptimalPerformance => write!(f, "optimal performance"),
            Diagnostic::Hotspot(t) => write!(f, "Hotspot: {}ºC", t),
            Diagnostic::MountFailure => write!(f, "Mount failure"),
            Diagnostic::CleaningRequired => write!(f, "Cleaning required"),
            Diagnostic::Inspection(descriptor) => write!(f, "{}", descriptor),
            Diagnostic::SeeDetails => write!(f, "see details"),
        }
    }
}

/// Derived state of one panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelStatus {
    pub status: Status,
    pub diagnostic: Diagnostic,
}

impl PanelStatus {
    fn new(status: Status, diagnostic: Diagnostic) -> Self {
        Self { status, diagnostic }
    }

    pub fn diagnostic_text(&self) -> String {
        self.diagnostic.to_string()
    }

    /// Action offered in the panel table
    pub fn action_hint(&self) -> &'static str {
        if self.status.is_pending() {
            "Realizar Inspección"
        } else {
            "Ver / Editar"
        }
    }
}

/// Derive a panel's effective status from its nested findings
pub fn derive_status(panel: &Panel) -> PanelStatus {
    derive_status_from(&panel.findings)
}

/// Derive a status from the findings related to one panel.
///
/// The latest finding decides. A pending result carries no diagnostic,
/// whether the panel has no findings or only unjudged ones.
pub fn derive_status_from(findings: &[Finding]) -> PanelStatus {
    let ordered = latest_first(findings);
    let Some(latest) = ordered.first().copied() else {
        return PanelStatus::new(Status::Pending, Diagnostic::NoData);
    };

    let status = latest.effective_status();
    let diagnostic = match status {
        Status::Operational => Diagnostic::OptimalPerformance,
        Status::Pending => Diagnostic::NoData,
        Status::Critical | Status::Alert => diagnose(status, latest, findings),
    };
    PanelStatus::new(status, diagnostic)
}

/// Findings ordered by creation time, newest first.
///
/// The sort is stable: findings with equal (or equally missing) timestamps
/// keep their input order. Missing timestamps sort as oldest.
pub fn latest_first(findings: &[Finding]) -> Vec<&Finding> {
    let mut ordered: Vec<&Finding> = findings.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered
}

fn diagnose(status: Status, latest: &Finding, findings: &[Finding]) -> Diagnostic {
    if status == Status::Critical {
        if let Some(t) = latest.hotspot_reading().filter(|t| *t > crate::classify::HOTSPOT_CRITICAL_C) {
            return Diagnostic::Hotspot(t);
        }
        if latest.mount_failed() {
            return Diagnostic::MountFailure;
        }
    }

    if status == Status::Alert && latest.needs_cleaning() {
        return Diagnostic::CleaningRequired;
    }

    let inspection = latest
        .inspection
        .as_ref()
        .or_else(|| most_recent_inspection(findings));

    inspection
        .and_then(Inspection::descriptor)
        .map(Diagnostic::Inspection)
        .unwrap_or(Diagnostic::SeeDetails)
}

fn most_recent_inspection(findings: &[Finding]) -> Option<&Inspection> {
    let mut inspections: Vec<&Inspection> =
        findings.iter().filter_map(|f| f.inspection.as_ref()).collect();
    inspections.sort_by(|a, b| b.inspected_at.cmp(&a.inspected_at));
    inspections.into_iter().next()
}
