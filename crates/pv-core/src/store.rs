//! Data store seam and the snapshot the renderer works from
//!
//! The hosted backend lives behind [`DataStore`]. [`MemoryStore`] is an
//! in-process implementation seeded from a JSON snapshot; it backs the CLI
//! and the tests.

use crate::export::{ExportBundle, Exporter};
use crate::intake::{FindingBatch, NewDefectType, NewInspection, NewPark};
use crate::model::{DefectType, DefectTypeId, Finding, Inspection, Panel, Park, ParkId};
use crate::summary::{summarize, FleetSummary};
use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Reads and writes against the backend.
///
/// Mutations are fire-and-report-error: nothing is transactional, and a
/// caller should re-read rather than trust what a mutation echoes back.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Panels ordered by id, each with its findings. Findings embed their
    /// inspection and defect type when the store can join them.
    async fn fetch_panels(&self, park: Option<ParkId>) -> CoreResult<Vec<Panel>>;

    async fn fetch_parks(&self) -> CoreResult<Vec<Park>>;

    /// Catalog ordered by name
    async fn fetch_defect_types(&self) -> CoreResult<Vec<DefectType>>;

    async fn create_park(&self, park: NewPark) -> CoreResult<Park>;

    async fn create_inspection(&self, inspection: NewInspection) -> CoreResult<Inspection>;

    /// Insert every finding it can; rejected rows are reported, not fatal
    async fn create_findings(&self, batch: FindingBatch) -> CoreResult<BatchOutcome>;

    async fn create_defect_type(&self, defect: NewDefectType) -> CoreResult<DefectType>;
}

/// Result of a finding batch insert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub rejected: Vec<RejectedFinding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedFinding {
    pub defect_type_id: DefectTypeId,
    pub reason: String,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Everything one render pass needs, fetched once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub parks: Vec<Park>,
    #[serde(default)]
    pub panels: Vec<Panel>,
    #[serde(default)]
    pub defect_types: Vec<DefectType>,
    /// Inspections not already embedded in findings
    #[serde(default)]
    pub inspections: Vec<Inspection>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::Parse(format!("snapshot: {}", e)))
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let json = std::fs::read_to_string(path)?;
        debug!("Loaded snapshot from {}", path.display());
        Self::from_json(&json)
    }

    /// Read parks, panels and the defect catalog from a store in one pass
    pub async fn fetch(store: &dyn DataStore, park: Option<ParkId>) -> CoreResult<Self> {
        let parks = store.fetch_parks().await?;
        let panels = store.fetch_panels(park).await?;
        let defect_types = store.fetch_defect_types().await?;

        Ok(Self {
            parks,
            panels,
            defect_types,
            inspections: Vec::new(),
        })
    }

    pub fn park(&self, id: ParkId) -> Option<&Park> {
        self.parks.iter().find(|p| p.id == id)
    }

    pub fn summary(&self) -> FleetSummary {
        summarize(&self.panels)
    }

    /// Both CSV documents cut from this snapshot
    pub fn export(&self, exporter: &Exporter, on: NaiveDate) -> ExportBundle {
        exporter.all(&self.panels, on)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    parks: Vec<Park>,
    panels: Vec<Panel>,
    defect_types: Vec<DefectType>,
    inspections: HashMap<i64, Inspection>,
}

impl StoreState {
    fn next_id<T>(items: &[T], id: impl Fn(&T) -> i64) -> i64 {
        items.iter().map(id).max().unwrap_or(0) + 1
    }

    fn next_finding_id(&self) -> i64 {
        self.panels
            .iter()
            .flat_map(|p| p.findings.iter().map(|f| f.id))
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Embed inspection and defect type into a finding, as a joined query would
    fn join(&self, finding: &Finding) -> Finding {
        let mut joined = finding.clone();
        if joined.inspection.is_none() {
            joined.inspection = self.inspections.get(&finding.inspection_id).cloned();
        }
        if joined.defect_type.is_none() {
            joined.defect_type = finding
                .defect_type_id
                .and_then(|id| self.defect_types.iter().find(|d| d.id == id))
                .cloned();
        }
        joined
    }
}

/// In-process store seeded from a [`Snapshot`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut inspections: HashMap<i64, Inspection> = snapshot
            .inspections
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        for finding in snapshot.panels.iter().flat_map(|p| p.findings.iter()) {
            if let Some(inspection) = &finding.inspection {
                inspections
                    .entry(inspection.id)
                    .or_insert_with(|| inspection.clone());
            }
        }

        Self {
            state: RwLock::new(StoreState {
                parks: snapshot.parks,
                panels: snapshot.panels,
                defect_types: snapshot.defect_types,
                inspections,
            }),
        }
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        Ok(Self::from_snapshot(Snapshot::load(path)?))
    }

    /// Add a panel to the inventory
    pub async fn insert_panel(&self, panel: Panel) {
        self.state.write().await.panels.push(panel);
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn fetch_panels(&self, park: Option<ParkId>) -> CoreResult<Vec<Panel>> {
        let state = self.state.read().await;

        let mut panels: Vec<Panel> = state
            .panels
            .iter()
            .filter(|p| park.map_or(true, |id| p.park_id == Some(id)))
            .map(|p| Panel {
                findings: p.findings.iter().map(|f| state.join(f)).collect(),
                ..p.clone()
            })
            .collect();
        panels.sort_by_key(|p| p.id);

        debug!("Fetched {} panels (park filter: {:?})", panels.len(), park);
        Ok(panels)
    }

    async fn fetch_parks(&self) -> CoreResult<Vec<Park>> {
        let mut parks = self.state.read().await.parks.clone();
        parks.sort_by_key(|p| p.id);
        Ok(parks)
    }

    async fn fetch_defect_types(&self) -> CoreResult<Vec<DefectType>> {
        let mut defects = self.state.read().await.defect_types.clone();
        defects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(defects)
    }

    async fn create_park(&self, park: NewPark) -> CoreResult<Park> {
        let mut state = self.state.write().await;
        let created = Park {
            id: StoreState::next_id(&state.parks, |p| p.id),
            client_name: park.client_name,
            location: park.location,
            capacity_mwp: park.capacity_mwp,
            created_at: Some(Utc::now()),
        };
        debug!("Created park {} ({})", created.id, created.client_name);
        state.parks.push(created.clone());
        Ok(created)
    }

    async fn create_inspection(&self, inspection: NewInspection) -> CoreResult<Inspection> {
        let mut state = self.state.write().await;
        if !state.parks.iter().any(|p| p.id == inspection.park_id) {
            return Err(CoreError::NotFound(format!("park {}", inspection.park_id)));
        }

        let id = state.inspections.keys().max().copied().unwrap_or(0) + 1;
        let created = Inspection {
            id,
            park_id: Some(inspection.park_id),
            inspected_at: inspection.inspected_at.or_else(|| Some(Utc::now())),
            technician: inspection.technician,
            weather: inspection.weather,
            inspection_type: Some(inspection.inspection_type),
            notes: inspection.notes,
        };
        debug!("Created inspection {} for park {}", id, inspection.park_id);
        state.inspections.insert(id, created.clone());
        Ok(created)
    }

    async fn create_findings(&self, batch: FindingBatch) -> CoreResult<BatchOutcome> {
        let mut state = self.state.write().await;
        let mut outcome = BatchOutcome::default();
        let now = Utc::now();

        for new in batch.findings {
            let reason = if !state.inspections.contains_key(&new.inspection_id) {
                Some(format!("inspection {} does not exist", new.inspection_id))
            } else if !state.defect_types.iter().any(|d| d.id == new.defect_type_id) {
                Some(format!("defect type {} does not exist", new.defect_type_id))
            } else if !state.panels.iter().any(|p| p.id == new.panel_id) {
                Some(format!("panel {} does not exist", new.panel_id))
            } else {
                None
            };

            if let Some(reason) = reason {
                warn!("Rejected finding for defect {}: {}", new.defect_type_id, reason);
                outcome.rejected.push(RejectedFinding {
                    defect_type_id: new.defect_type_id,
                    reason,
                });
                continue;
            }

            let id = state.next_finding_id();
            let finding = Finding {
                id,
                inspection_id: new.inspection_id,
                panel_id: new.panel_id,
                defect_type_id: Some(new.defect_type_id),
                measured_value: new.measured_value,
                status: Some(new.status),
                evidence: new.evidence,
                comment: new.comment,
                created_at: Some(now),
                inspection: None,
                defect_type: None,
                reading: None,
            };

            if let Some(panel) = state.panels.iter_mut().find(|p| p.id == new.panel_id) {
                panel.findings.push(finding);
                outcome.inserted += 1;
            }
        }

        debug!(
            "Finding batch: {} inserted, {} rejected",
            outcome.inserted,
            outcome.rejected.len()
        );
        Ok(outcome)
    }

    async fn create_defect_type(&self, defect: NewDefectType) -> CoreResult<DefectType> {
        let mut state = self.state.write().await;
        let created = DefectType {
            id: StoreState::next_id(&state.defect_types, |d| d.id),
            name: defect.name,
            category: defect.category,
            suggested_severity: defect.suggested_severity,
        };
        state.defect_types.push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{DefectForm, FindingForm, InspectionForm, ParkForm};
    use crate::model::InspectionType;
    use crate::Status;

    async fn seeded() -> (MemoryStore, Park, Inspection, DefectType) {
        let store = MemoryStore::new();
        let park = store
            .create_park(
                ParkForm {
                    client_name: "Energía del Sur".to_string(),
                    location: "Sevilla".to_string(),
                    capacity: "4.8".to_string(),
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();

        for id in [2, 1] {
            let mut panel = Panel::new(id);
            panel.park_id = Some(park.id);
            store.insert_panel(panel).await;
        }

        let inspection = store
            .create_inspection(
                InspectionForm {
                    park_id: Some(park.id),
                    technician: "Nahuel".to_string(),
                    inspection_type: Some(InspectionType::Thermographic),
                    ..InspectionForm::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();

        let defect = store
            .create_defect_type(
                DefectForm {
                    name: "Punto caliente".to_string(),
                    ..DefectForm::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();

        (store, park, inspection, defect)
    }

    #[tokio::test]
    async fn test_findings_round_trip_through_store() {
        let (store, park, inspection, defect) = seeded().await;

        let mut form = FindingForm::new(inspection.id, 1);
        form.toggle_defect(defect.id);
        form.status = Status::Critical;
        form.measured_value = "38".to_string();
        let outcome = store.create_findings(form.validate().unwrap()).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.inserted, 1);

        let snapshot = Snapshot::fetch(&store, Some(park.id)).await.unwrap();
        assert_eq!(snapshot.panels.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);

        let finding = &snapshot.panels[0].findings[0];
        assert_eq!(finding.inspection.as_ref().unwrap().id, inspection.id);
        assert_eq!(finding.defect_type.as_ref().unwrap().name, "Punto caliente");

        let status = crate::derive_status(&snapshot.panels[0]);
        assert_eq!(status.status, Status::Critical);
        assert_eq!(status.diagnostic_text(), "Hotspot: 38ºC");

        let summary = snapshot.summary();
        assert_eq!(summary.counts.critical, 1);
        assert_eq!(summary.counts.pending, 1);
    }

    #[tokio::test]
    async fn test_partial_batch_is_reported() {
        let (store, _park, inspection, defect) = seeded().await;

        let mut form = FindingForm::new(inspection.id, 2);
        form.toggle_defect(defect.id);
        form.toggle_defect(99);
        let outcome = store.create_findings(form.validate().unwrap()).await.unwrap();

        assert_eq!(outcome.inserted, 1);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.rejected[0].defect_type_id, 99);

        let panels = store.fetch_panels(None).await.unwrap();
        let total: usize = panels.iter().map(|p| p.findings.len()).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_inspection_needs_existing_park() {
        let store = MemoryStore::new();
        let result = store
            .create_inspection(
                InspectionForm {
                    park_id: Some(42),
                    inspection_type: Some(InspectionType::Visual),
                    ..InspectionForm::default()
                }
                .validate()
                .unwrap(),
            )
            .await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_park_filter() {
        let (store, park, _, _) = seeded().await;
        store.insert_panel(Panel::new(3)).await;

        assert_eq!(store.fetch_panels(None).await.unwrap().len(), 3);
        assert_eq!(store.fetch_panels(Some(park.id)).await.unwrap().len(), 2);
        assert!(store.fetch_panels(Some(park.id + 1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_defect_catalog_sorted_by_name() {
        let (store, _, _, _) = seeded().await;
        store
            .create_defect_type(NewDefectType {
                name: "Delaminación".to_string(),
                category: crate::model::DefectCategory::Visual,
                suggested_severity: Status::Alert,
            })
            .await
            .unwrap();

        let names: Vec<String> = store
            .fetch_defect_types()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Delaminación", "Punto caliente"]);
    }

    #[test]
    fn test_snapshot_parse_error() {
        assert!(matches!(Snapshot::from_json("{"), Err(CoreError::Parse(_))));
    }
}
