//! CSV export of panel inventories and finding histories

use crate::aggregate::{derive_status, latest_first};
use crate::model::{Finding, Panel};
use crate::CoreResult;
use chrono::{DateTime, NaiveDate, Utc};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How `es-ES` renders a timestamp
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

pub const PANELS_ENTITY: &str = "paneles";
pub const INSPECTIONS_ENTITY: &str = "inspecciones";

/// A single cell value before encoding
#[derive(Debug, Clone, PartialEq)]
pub enum CsvValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl CsvValue {
    /// Encoded form of the cell
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            CsvValue::Null => Cow::Borrowed(""),
            CsvValue::Bool(true) => Cow::Borrowed("Sí"),
            CsvValue::Bool(false) => Cow::Borrowed("No"),
            CsvValue::Integer(n) => Cow::Owned(n.to_string()),
            CsvValue::Number(n) => Cow::Owned(n.to_string()),
            CsvValue::Text(s) => escape_field(s),
        }
    }
}

impl From<&str> for CsvValue {
    fn from(s: &str) -> Self {
        CsvValue::Text(s.to_string())
    }
}

impl From<String> for CsvValue {
    fn from(s: String) -> Self {
        CsvValue::Text(s)
    }
}

impl From<bool> for CsvValue {
    fn from(b: bool) -> Self {
        CsvValue::Bool(b)
    }
}

impl From<i64> for CsvValue {
    fn from(n: i64) -> Self {
        CsvValue::Integer(n)
    }
}

impl From<f64> for CsvValue {
    fn from(n: f64) -> Self {
        CsvValue::Number(n)
    }
}

impl<T: Into<CsvValue>> From<Option<T>> for CsvValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CsvValue::Null, Into::into)
    }
}

/// A labelled column reading one value out of a row
pub struct Column<T> {
    pub label: &'static str,
    pub value: fn(&T) -> CsvValue,
}

impl<T> Column<T> {
    pub fn new(label: &'static str, value: fn(&T) -> CsvValue) -> Self {
        Self { label, value }
    }
}

/// Encode rows as CSV. The header line is always present.
pub fn encode<T>(rows: &[T], columns: &[Column<T>]) -> String {
    let header = columns
        .iter()
        .map(|c| escape_field(c.label))
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);

    for row in rows {
        let line = columns
            .iter()
            .map(|c| (c.value)(row).render().into_owned())
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    lines.join("\n")
}

/// Quote a field containing a comma, quote or newline, doubling inner quotes
fn escape_field(s: &str) -> Cow<'_, str> {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

/// A CSV document ready for download
#[derive(Debug, Clone, PartialEq)]
pub struct CsvFile {
    pub filename: String,
    pub content: String,
    /// Data rows, header excluded
    pub rows: usize,
}

/// Panel inventory and finding history cut from the same snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    pub panels: CsvFile,
    pub inspections: CsvFile,
}

impl ExportBundle {
    pub fn files(&self) -> [&CsvFile; 2] {
        [&self.panels, &self.inspections]
    }
}

/// `{entity}_{YYYY-MM-DD}.csv`
pub fn export_filename(entity: &str, on: NaiveDate) -> String {
    format!("{}_{}.csv", entity, on.format("%Y-%m-%d"))
}

struct PanelRow {
    id: i64,
    serial_number: String,
    model: String,
    status: &'static str,
    registered_at: String,
}

fn panel_columns() -> Vec<Column<PanelRow>> {
    vec![
        Column::new("ID", |r: &PanelRow| r.id.into()),
        Column::new("Código de Serie", |r: &PanelRow| r.serial_number.as_str().into()),
        Column::new("Modelo", |r: &PanelRow| r.model.as_str().into()),
        Column::new("Estado Actual", |r: &PanelRow| r.status.into()),
        Column::new("Fecha de Registro", |r: &PanelRow| r.registered_at.as_str().into()),
    ]
}

struct HistoryRow {
    panel_id: i64,
    serial_number: Option<String>,
    date: String,
    inspection_type: Option<String>,
    technician: Option<String>,
    weather: Option<String>,
    defect: Option<String>,
    measured_value: Option<f64>,
    cleanliness: Option<&'static str>,
    mount_ok: Option<bool>,
    hotspot_c: Option<f64>,
    status: &'static str,
    evidence: Option<String>,
    comment: Option<String>,
    notes: Option<String>,
}

fn history_columns() -> Vec<Column<HistoryRow>> {
    vec![
        Column::new("Panel ID", |r: &HistoryRow| r.panel_id.into()),
        Column::new("Código de Serie", |r: &HistoryRow| r.serial_number.clone().into()),
        Column::new("Fecha Inspección", |r: &HistoryRow| r.date.as_str().into()),
        Column::new("Tipo Inspección", |r: &HistoryRow| r.inspection_type.clone().into()),
        Column::new("Técnico", |r: &HistoryRow| r.technician.clone().into()),
        Column::new("Clima", |r: &HistoryRow| r.weather.clone().into()),
        Column::new("Defecto", |r: &HistoryRow| r.defect.clone().into()),
        Column::new("Valor Medido", |r: &HistoryRow| r.measured_value.into()),
        Column::new("Limpieza", |r: &HistoryRow| r.cleanliness.into()),
        Column::new("Sujeción OK", |r: &HistoryRow| r.mount_ok.into()),
        Column::new("Temp. Hotspot (°C)", |r: &HistoryRow| r.hotspot_c.into()),
        Column::new("Estado", |r: &HistoryRow| r.status.into()),
        Column::new("Evidencia", |r: &HistoryRow| r.evidence.clone().into()),
        Column::new("Comentario", |r: &HistoryRow| r.comment.clone().into()),
        Column::new("Observaciones", |r: &HistoryRow| r.notes.clone().into()),
    ]
}

impl HistoryRow {
    fn new(panel: &Panel, finding: &Finding, date: String) -> Self {
        let inspection = finding.inspection.as_ref();
        let reading = finding.reading.as_ref();

        Self {
            panel_id: panel.id,
            serial_number: panel.serial_number.clone(),
            date,
            inspection_type: inspection
                .and_then(|i| i.inspection_type.as_ref())
                .map(|t| t.label().to_string()),
            technician: inspection.and_then(|i| i.technician.clone()),
            weather: inspection.and_then(|i| i.weather.clone()),
            defect: finding.defect_name().map(str::to_string),
            measured_value: finding.measured_value,
            cleanliness: reading.and_then(|r| r.cleanliness).map(|c| c.label()),
            mount_ok: reading.and_then(|r| r.mount_ok),
            hotspot_c: finding.hotspot_reading(),
            status: finding.effective_status().label(),
            evidence: finding.evidence.as_ref().map(|e| e.as_str().to_string()),
            comment: finding.comment.clone(),
            notes: inspection.and_then(|i| i.notes.clone()),
        }
    }
}

/// Builds CSV documents with a fixed timestamp format
#[derive(Debug, Clone)]
pub struct Exporter {
    date_format: String,
}

impl Exporter {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    fn format_date(&self, at: Option<DateTime<Utc>>) -> String {
        at.map(|t| t.format(&self.date_format).to_string())
            .unwrap_or_default()
    }

    /// One row per panel with its derived status
    pub fn panels(&self, panels: &[Panel], on: NaiveDate) -> CsvFile {
        let rows: Vec<PanelRow> = panels
            .iter()
            .map(|panel| PanelRow {
                id: panel.id,
                serial_number: panel.serial_number.clone().unwrap_or_default(),
                model: panel.model.clone().unwrap_or_default(),
                status: derive_status(panel).status.label(),
                registered_at: self.format_date(panel.created_at),
            })
            .collect();

        CsvFile {
            filename: export_filename(PANELS_ENTITY, on),
            content: encode(&rows, &panel_columns()),
            rows: rows.len(),
        }
    }

    /// One row per finding, newest first within each panel. Panels without
    /// findings contribute nothing.
    pub fn inspections(&self, panels: &[Panel], on: NaiveDate) -> CsvFile {
        let rows: Vec<HistoryRow> = panels
            .iter()
            .flat_map(|panel| {
                latest_first(&panel.findings)
                    .into_iter()
                    .map(move |finding| (panel, finding))
            })
            .map(|(panel, finding)| {
                let at = finding
                    .inspection
                    .as_ref()
                    .and_then(|i| i.inspected_at)
                    .or(finding.created_at);
                HistoryRow::new(panel, finding, self.format_date(at))
            })
            .collect();

        CsvFile {
            filename: export_filename(INSPECTIONS_ENTITY, on),
            content: encode(&rows, &history_columns()),
            rows: rows.len(),
        }
    }

    /// Both documents from one panel snapshot
    pub fn all(&self, panels: &[Panel], on: NaiveDate) -> ExportBundle {
        ExportBundle {
            panels: self.panels(panels, on),
            inspections: self.inspections(panels, on),
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

/// Export panels and their finding history with the default date format
pub fn export_all(panels: &[Panel], on: NaiveDate) -> ExportBundle {
    Exporter::default().all(panels, on)
}

/// Write every file of a bundle into `dir`
pub fn write_bundle(bundle: &ExportBundle, dir: &Path) -> CoreResult<Vec<PathBuf>> {
    bundle
        .files()
        .into_iter()
        .map(|file| write_file(file, dir))
        .collect()
}

/// Write one CSV document into `dir`
pub fn write_file(file: &CsvFile, dir: &Path) -> CoreResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(&file.filename);
    debug!("Writing {} rows to {}", file.rows, path.display());
    fs::write(&path, &file.content)?;
    info!("Exported {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Cleanliness, LegacyReading};
    use crate::Status;
    use chrono::TimeZone;

    struct Sample {
        name: String,
        ok: Option<bool>,
        value: f64,
    }

    fn sample_columns() -> Vec<Column<Sample>> {
        vec![
            Column::new("Nombre", |s: &Sample| s.name.as_str().into()),
            Column::new("OK", |s: &Sample| s.ok.into()),
            Column::new("Valor", |s: &Sample| s.value.into()),
        ]
    }

    /// Split CSV text back into fields, honoring quotes
    fn parse(text: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, quoted) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                ('"', true) => quoted = false,
                ('"', false) if field.is_empty() => quoted = true,
                (',', false) => row.push(std::mem::take(&mut field)),
                ('\n', false) => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                (c, _) => field.push(c),
            }
        }
        row.push(field);
        rows.push(row);
        rows
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn finding(id: i64, panel_id: i64) -> Finding {
        Finding {
            id,
            inspection_id: 1,
            panel_id,
            defect_type_id: Some(1),
            measured_value: Some(23.5),
            status: Some(Status::Alert),
            evidence: None,
            comment: Some("Revisar, urgente".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2025, 4, 2, 9, 30, 0).unwrap()),
            inspection: None,
            defect_type: None,
            reading: None,
        }
    }

    #[test]
    fn test_header_only_for_empty_rows() {
        let csv = encode::<Sample>(&[], &sample_columns());
        assert_eq!(csv, "Nombre,OK,Valor");
    }

    #[test]
    fn test_value_rendering() {
        let rows = vec![
            Sample { name: "plain".to_string(), ok: Some(true), value: 20.0 },
            Sample { name: "otro".to_string(), ok: Some(false), value: 20.5 },
            Sample { name: String::new(), ok: None, value: -1.25 },
        ];
        let csv = encode(&rows, &sample_columns());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[1], "plain,Sí,20");
        assert_eq!(lines[2], "otro,No,20.5");
        assert_eq!(lines[3], ",,-1.25");
    }

    #[test]
    fn test_escaping_round_trip() {
        let names = ["a,b", "say \"hi\"", "line\nbreak", "plain", "\"quoted, both\""];
        let rows: Vec<Sample> = names
            .iter()
            .map(|n| Sample { name: n.to_string(), ok: None, value: 1.0 })
            .collect();

        let csv = encode(&rows, &sample_columns());
        let parsed = parse(&csv);

        assert_eq!(parsed.len(), names.len() + 1);
        assert_eq!(parsed[0], vec!["Nombre", "OK", "Valor"]);
        for (row, name) in parsed[1..].iter().zip(names) {
            assert_eq!(row[0], name);
            assert_eq!(row[1], "");
            assert_eq!(row[2], "1");
        }
        assert!(csv.contains("\"a,b\""));
        assert!(csv.contains("\"say \"\"hi\"\"\""));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename(PANELS_ENTITY, day()), "paneles_2026-10-19.csv");
        assert_eq!(
            export_filename(INSPECTIONS_ENTITY, day()),
            "inspecciones_2026-10-19.csv"
        );
    }

    #[test]
    fn test_export_all_row_counts() {
        let mut a = Panel::new(1);
        a.serial_number = Some("SN-1".to_string());
        a.findings = vec![finding(1, 1), finding(2, 1)];
        let b = Panel::new(2);
        let mut c = Panel::new(3);
        c.findings = vec![finding(3, 3)];

        let panels = vec![a, b, c];
        let bundle = export_all(&panels, day());

        assert_eq!(bundle.panels.rows, panels.len());
        assert_eq!(bundle.inspections.rows, 3);
        assert_eq!(bundle.panels.content.lines().count(), 4);
        assert_eq!(bundle.inspections.content.lines().count(), 4);
        assert!(!bundle.inspections.content.contains("\n2,"));
    }

    #[test]
    fn test_panel_rows_use_derived_status() {
        let mut panel = Panel::new(9);
        panel.created_at = Some(Utc.with_ymd_and_hms(2025, 1, 31, 16, 5, 9).unwrap());
        panel.findings = vec![finding(1, 9)];

        let file = Exporter::default().panels(&[panel, Panel::new(10)], day());
        let rows = parse(&file.content);

        assert_eq!(rows[0][3], "Estado Actual");
        assert_eq!(rows[1], vec!["9", "", "", "ALERTA", "31/01/2025, 16:05:09"]);
        assert_eq!(rows[2][3], "PENDIENTE");
    }

    #[test]
    fn test_history_rows_carry_legacy_reading() {
        let mut legacy = finding(4, 5);
        legacy.status = None;
        legacy.measured_value = None;
        legacy.comment = None;
        legacy.reading = Some(LegacyReading::new(25.0, false, Cleanliness::Medium));
        let mut panel = Panel::new(5);
        panel.findings = vec![legacy];

        let file = Exporter::default().inspections(&[panel], day());
        let rows = parse(&file.content);
        let header = &rows[0];
        let row = &rows[1];
        let col = |label: &str| header.iter().position(|h| h == label).unwrap();

        assert_eq!(row[col("Limpieza")], "Media");
        assert_eq!(row[col("Sujeción OK")], "No");
        assert_eq!(row[col("Temp. Hotspot (°C)")], "25");
        assert_eq!(row[col("Estado")], "CRITICO");
        assert_eq!(row[col("Fecha Inspección")], "02/04/2025, 09:30:00");
    }

    #[test]
    fn test_write_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = export_all(&[Panel::new(1)], day());

        let paths = write_bundle(&bundle, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("paneles_2026-10-19.csv"));

        let written = std::fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(written, bundle.inspections.content);
    }
}
