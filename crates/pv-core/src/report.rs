//! Dashboard report generation

use crate::aggregate::{derive_status, Diagnostic};
use crate::model::Park;
use crate::store::Snapshot;
use crate::summary::{ChartSlice, FleetSummary};
use crate::{CoreError, CoreResult, Status};
use serde::Serialize;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

/// One line of the panel table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelLine {
    pub id: i64,
    pub label: String,
    pub serial_number: String,
    pub model: String,
    pub status: Status,
    pub diagnostic: Diagnostic,
    pub diagnostic_text: String,
    pub action: String,
}

/// Everything the dashboard shows, derived from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub park: Option<Park>,
    pub summary: FleetSummary,
    pub slices: Vec<ChartSlice>,
    pub alert: Option<String>,
    pub panels: Vec<PanelLine>,
}

impl DashboardReport {
    pub fn build(snapshot: &Snapshot, park: Option<i64>) -> Self {
        let summary = snapshot.summary();
        let panels = snapshot
            .panels
            .iter()
            .map(|panel| {
                let derived = derive_status(panel);
                PanelLine {
                    id: panel.id,
                    label: panel.display_id(),
                    serial_number: panel.serial_or_placeholder().to_string(),
                    model: panel.model_or_placeholder().to_string(),
                    status: derived.status,
                    diagnostic_text: display_diagnostic(&derived.diagnostic),
                    action: derived.action_hint().to_string(),
                    diagnostic: derived.diagnostic,
                }
            })
            .collect();

        Self {
            park: park.and_then(|id| snapshot.park(id).cloned()),
            slices: summary.slices(),
            alert: summary.alert_message(),
            summary,
            panels,
        }
    }
}

/// Pending panels show a dash in the table rather than "no data"
fn display_diagnostic(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::NoData => "-".to_string(),
        other => other.to_string(),
    }
}

/// Generate a dashboard report in the given format
pub fn generate_report(
    snapshot: &Snapshot,
    park: Option<i64>,
    format: ReportFormat,
) -> CoreResult<String> {
    let report = DashboardReport::build(snapshot, park);
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|e| CoreError::Export(format!("JSON serialization failed: {}", e))),
        ReportFormat::Text => Ok(render_text(&report)),
    }
}

fn render_text(report: &DashboardReport) -> String {
    let mut out = String::new();

    out.push_str("Resumen del Parque\n");
    out.push_str(&"=".repeat(50));
    out.push('\n');
    if let Some(park) = &report.park {
        out.push_str(&format!(
            "Parque #{} - {} ({}, {} MWp)\n",
            park.id, park.client_name, park.location, park.capacity_mwp
        ));
    }
    out.push_str(&format!("{} Paneles Totales\n", report.summary.total));

    for status in Status::ALL {
        out.push_str(&format!(
            "  {:<12} {:>5}\n",
            status.chart_label(),
            report.summary.counts.get(status)
        ));
    }

    if let Some(alert) = &report.alert {
        out.push_str(&format!("\n!! {}\n", alert));
    }

    if report.panels.is_empty() {
        return out;
    }

    out.push_str(&format!(
        "\n{:<8} {:<20} {:<24} {:<10} {}\n",
        "Panel", "Serie", "Modelo", "Estado", "Diagnóstico"
    ));
    out.push_str(&"-".repeat(90));
    out.push('\n');

    for line in &report.panels {
        out.push_str(&format!(
            "{:<8} {:<20} {:<24} {:<10} {}\n",
            line.label, line.serial_number, line.model, line.status, line.diagnostic_text
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Finding, Panel};

    fn snapshot() -> Snapshot {
        let mut critical = Panel::new(3);
        critical.serial_number = Some("SN-3".to_string());
        critical.findings.push(Finding {
            id: 1,
            inspection_id: 1,
            panel_id: 3,
            defect_type_id: None,
            measured_value: None,
            status: Some(Status::Critical),
            evidence: None,
            comment: None,
            created_at: None,
            inspection: None,
            defect_type: None,
            reading: None,
        });

        Snapshot {
            parks: vec![Park {
                id: 1,
                client_name: "La Luz".to_string(),
                location: "Almería".to_string(),
                capacity_mwp: 1.5,
                created_at: None,
            }],
            panels: vec![critical, Panel::new(4)],
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_report_lines() {
        let report = DashboardReport::build(&snapshot(), Some(1));

        assert_eq!(report.park.as_ref().unwrap().client_name, "La Luz");
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.slices.len(), 2);
        assert_eq!(report.panels[0].label, "#003");
        assert_eq!(report.panels[0].diagnostic_text, "see details");
        assert_eq!(report.panels[1].diagnostic_text, "-");
        assert_eq!(report.panels[1].model, "Sin modelo");
        assert_eq!(report.panels[1].action, "Realizar Inspección");
    }

    #[test]
    fn test_text_report() {
        let text = generate_report(&snapshot(), Some(1), ReportFormat::Text).unwrap();
        assert!(text.contains("2 Paneles Totales"));
        assert!(text.contains("Parque #1 - La Luz"));
        assert!(text.contains("1 Paneles Críticos requieren atención inmediata."));
        assert!(text.contains("#003"));
    }

    #[test]
    fn test_json_report() {
        let json = generate_report(&snapshot(), None, ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["counts"]["CRITICO"], 1);
        assert_eq!(value["summary"]["critical_alert"], true);
        assert_eq!(value["panels"][0]["status"], "CRITICO");
        assert!(value["park"].is_null());
    }
}
