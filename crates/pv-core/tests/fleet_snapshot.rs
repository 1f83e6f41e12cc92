use chrono::NaiveDate;
use pv_core::aggregate::Diagnostic;
use pv_core::export::Exporter;
use pv_core::report::{generate_report, ReportFormat};
use pv_core::{derive_status, DataStore, MemoryStore, Snapshot, Status};

const FIXTURE: &str = include_str!("fixtures/snapshot.json");

fn store() -> MemoryStore {
    MemoryStore::from_snapshot(Snapshot::from_json(FIXTURE).expect("fixture parses"))
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

#[tokio::test]
async fn derives_every_panel_from_a_joined_fetch() {
    let store = store();
    let snapshot = Snapshot::fetch(&store, None).await.unwrap();

    let derived: Vec<_> = snapshot.panels.iter().map(derive_status).collect();
    let statuses: Vec<Status> = derived.iter().map(|d| d.status).collect();
    assert_eq!(
        statuses,
        vec![
            Status::Operational,
            Status::Critical,
            Status::Alert,
            Status::Pending,
            Status::Pending,
        ]
    );

    assert_eq!(derived[0].diagnostic, Diagnostic::OptimalPerformance);
    assert_eq!(derived[1].diagnostic_text(), "Hotspot: 31ºC");
    assert_eq!(derived[2].diagnostic_text(), "Visual - Lucía");
    assert_eq!(derived[3].diagnostic_text(), "no data");
    assert_eq!(derived[4].diagnostic_text(), "no data");
}

#[tokio::test]
async fn summary_counts_cover_every_panel() {
    let store = store();
    let snapshot = Snapshot::fetch(&store, None).await.unwrap();
    let summary = snapshot.summary();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.counts.critical, 1);
    assert_eq!(summary.counts.alert, 1);
    assert_eq!(summary.counts.operational, 1);
    assert_eq!(summary.counts.pending, 2);
    assert_eq!(summary.counts.sum(), summary.total);
    assert!(summary.critical_alert);

    let park_two = Snapshot::fetch(&store, Some(2)).await.unwrap().summary();
    assert_eq!(park_two.total, 2);
    assert_eq!(park_two.counts.pending, 2);
    assert!(!park_two.critical_alert);
    assert_eq!(park_two.slices().len(), 1);
}

#[tokio::test]
async fn export_all_comes_from_one_snapshot() {
    let store = store();
    let snapshot = Snapshot::fetch(&store, None).await.unwrap();
    let bundle = snapshot.export(&Exporter::default(), day());

    let expected_history: usize = snapshot.panels.iter().map(|p| p.findings.len()).sum();
    assert_eq!(bundle.panels.rows, snapshot.panels.len());
    assert_eq!(bundle.inspections.rows, expected_history);
    assert_eq!(bundle.inspections.rows, 5);
    assert_eq!(bundle.panels.filename, "paneles_2026-10-19.csv");
    assert_eq!(bundle.inspections.filename, "inspecciones_2026-10-19.csv");

    assert!(bundle.inspections.content.contains("\"Celda 3, fila \"\"B\"\"\""));
    assert!(bundle.inspections.content.contains("\"Viento, 12 km/h\""));
    assert!(bundle
        .inspections
        .content
        .contains("https://storage.example.org/hallazgos/3.jpg"));
}

#[tokio::test]
async fn parks_and_catalog_are_ordered() {
    let store = store();
    let parks = store.fetch_parks().await.unwrap();
    assert_eq!(parks.len(), 2);
    assert_eq!(parks[1].client_name, "Solar \"Norte\" S.L.");

    let names: Vec<String> = store
        .fetch_defect_types()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["Diodo bypass", "Punto caliente", "Suciedad"]);
}

#[tokio::test]
async fn text_report_for_one_park() {
    let store = store();
    let snapshot = Snapshot::fetch(&store, Some(1)).await.unwrap();
    let text = generate_report(&snapshot, Some(1), ReportFormat::Text).unwrap();

    assert!(text.contains("Parque #1 - Energías La Luz"));
    assert!(text.contains("3 Paneles Totales"));
    assert!(text.contains("Hotspot: 31ºC"));
}

#[tokio::test]
async fn pending_panels_show_a_dash_in_the_table() {
    let store = store();
    let snapshot = Snapshot::fetch(&store, Some(2)).await.unwrap();
    let json = generate_report(&snapshot, Some(2), ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let panels = value["panels"].as_array().unwrap();
    assert_eq!(panels.len(), 2);
    for panel in panels {
        assert_eq!(panel["status"], "PENDIENTE");
        assert_eq!(panel["diagnostic_text"], "-");
        assert_eq!(panel["action"], "Realizar Inspección");
    }
}
