//! Form submissions and the validated records they produce
//!
//! Forms hold what the user typed. `validate` turns them into `New*` records
//! that the data store accepts, or a [`CoreError::Validation`].

use crate::classify::{classify_reading, Cleanliness, LegacyReading};
use crate::model::{
    DefectCategory, DefectTypeId, Evidence, InspectionId, InspectionType, PanelId, ParkId,
};
use crate::{CoreError, CoreResult, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_number(field: &str, value: &str) -> CoreResult<Option<f64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let invalid = || CoreError::Validation(format!("{} must be a number, got '{}'", field, value));
    let number = trimmed.replace(',', ".").parse::<f64>().map_err(|_| invalid())?;
    if !number.is_finite() {
        return Err(invalid());
    }
    Ok(Some(number))
}

fn require_severity(status: Status) -> CoreResult<Status> {
    if status.is_pending() {
        return Err(CoreError::Validation(
            "severity must be OPERATIVO, ALERTA or CRITICO".to_string(),
        ));
    }
    Ok(status)
}

/// New park form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParkForm {
    pub client_name: String,
    pub location: String,
    pub capacity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPark {
    pub client_name: String,
    pub location: String,
    pub capacity_mwp: f64,
}

impl ParkForm {
    /// All three fields are mandatory
    pub fn validate(&self) -> CoreResult<NewPark> {
        let (Some(client_name), Some(location), Some(_)) = (
            blank_to_none(&self.client_name),
            blank_to_none(&self.location),
            blank_to_none(&self.capacity),
        ) else {
            return Err(CoreError::Validation("all fields are required".to_string()));
        };

        let capacity_mwp = parse_number("capacity", &self.capacity)?
            .ok_or_else(|| CoreError::Validation("capacity is required".to_string()))?;
        if capacity_mwp < 0.0 {
            return Err(CoreError::Validation("capacity cannot be negative".to_string()));
        }

        Ok(NewPark {
            client_name,
            location,
            capacity_mwp,
        })
    }
}

/// New catalog entry form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectForm {
    pub name: String,
    pub category: DefectCategory,
    pub suggested_severity: Status,
}

impl Default for DefectForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: DefectCategory::Thermographic,
            suggested_severity: Status::Alert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDefectType {
    pub name: String,
    pub category: DefectCategory,
    pub suggested_severity: Status,
}

impl DefectForm {
    pub fn validate(&self) -> CoreResult<NewDefectType> {
        let name = blank_to_none(&self.name)
            .ok_or_else(|| CoreError::Validation("defect name is required".to_string()))?;

        Ok(NewDefectType {
            name,
            category: self.category,
            suggested_severity: require_severity(self.suggested_severity)?,
        })
    }
}

/// Site visit form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectionForm {
    pub park_id: Option<ParkId>,
    pub inspected_at: Option<DateTime<Utc>>,
    pub technician: String,
    pub weather: String,
    pub inspection_type: Option<InspectionType>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInspection {
    pub park_id: ParkId,
    pub inspected_at: Option<DateTime<Utc>>,
    pub technician: Option<String>,
    pub weather: Option<String>,
    pub inspection_type: InspectionType,
    pub notes: Option<String>,
}

impl InspectionForm {
    pub fn validate(&self) -> CoreResult<NewInspection> {
        let park_id = self
            .park_id
            .ok_or_else(|| CoreError::Validation("an inspection needs a park".to_string()))?;
        let inspection_type = self
            .inspection_type
            .clone()
            .ok_or_else(|| CoreError::Validation("inspection type is required".to_string()))?;

        Ok(NewInspection {
            park_id,
            inspected_at: self.inspected_at,
            technician: blank_to_none(&self.technician),
            weather: blank_to_none(&self.weather),
            inspection_type,
            notes: blank_to_none(&self.notes),
        })
    }
}

/// Findings form: one submission, one finding per selected defect type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingForm {
    pub inspection_id: InspectionId,
    pub panel_id: PanelId,
    pub selected_defects: Vec<DefectTypeId>,
    pub measured_value: String,
    pub status: Status,
    pub evidence: String,
    pub comment: String,
}

impl FindingForm {
    pub fn new(inspection_id: InspectionId, panel_id: PanelId) -> Self {
        Self {
            inspection_id,
            panel_id,
            selected_defects: Vec::new(),
            measured_value: String::new(),
            status: Status::Operational,
            evidence: String::new(),
            comment: String::new(),
        }
    }

    /// Select a defect, or deselect it if already selected
    pub fn toggle_defect(&mut self, defect: DefectTypeId) {
        if let Some(pos) = self.selected_defects.iter().position(|d| *d == defect) {
            self.selected_defects.remove(pos);
        } else {
            self.selected_defects.push(defect);
        }
    }

    pub fn validate(&self) -> CoreResult<FindingBatch> {
        if self.selected_defects.is_empty() {
            return Err(CoreError::Validation(
                "select at least one defect type".to_string(),
            ));
        }

        let status = require_severity(self.status)?;
        let measured_value = parse_number("measured value", &self.measured_value)?;
        let evidence = blank_to_none(&self.evidence).map(Evidence::from);
        let comment = blank_to_none(&self.comment);

        let mut findings: Vec<NewFinding> = Vec::with_capacity(self.selected_defects.len());
        for defect_type_id in &self.selected_defects {
            if findings.iter().any(|f| f.defect_type_id == *defect_type_id) {
                continue;
            }
            findings.push(NewFinding {
                inspection_id: self.inspection_id,
                panel_id: self.panel_id,
                defect_type_id: *defect_type_id,
                measured_value,
                status,
                evidence: evidence.clone(),
                comment: comment.clone(),
            });
        }

        debug!(
            "Finding batch for panel {}: {} defect(s)",
            self.panel_id,
            findings.len()
        );
        Ok(FindingBatch { findings })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFinding {
    pub inspection_id: InspectionId,
    pub panel_id: PanelId,
    pub defect_type_id: DefectTypeId,
    pub measured_value: Option<f64>,
    pub status: Status,
    pub evidence: Option<Evidence>,
    pub comment: Option<String>,
}

/// Findings inserted together from one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingBatch {
    pub findings: Vec<NewFinding>,
}

impl FindingBatch {
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Legacy single-panel inspection form, classified on submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyInspectionForm {
    pub panel_id: PanelId,
    pub hotspot_c: String,
    pub mount_ok: Option<bool>,
    pub cleanliness: String,
    pub technician: String,
    pub notes: String,
}

impl LegacyInspectionForm {
    pub fn new(panel_id: PanelId) -> Self {
        Self {
            panel_id,
            hotspot_c: "0".to_string(),
            mount_ok: Some(true),
            cleanliness: Cleanliness::Medium.label().to_string(),
            technician: String::new(),
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> CoreResult<LegacySubmission> {
        let hotspot_c = parse_number("hotspot temperature", &self.hotspot_c)?;
        let cleanliness = match blank_to_none(&self.cleanliness) {
            Some(raw) => Some(Cleanliness::from_label(&raw).ok_or_else(|| {
                CoreError::Validation(format!("unknown cleanliness '{}'", raw))
            })?),
            None => None,
        };

        let reading = LegacyReading {
            hotspot_c,
            mount_ok: self.mount_ok,
            cleanliness,
        };
        let status = classify_reading(&reading);
        debug!("Legacy reading for panel {} classified as {}", self.panel_id, status);

        Ok(LegacySubmission {
            panel_id: self.panel_id,
            reading,
            status,
            technician: blank_to_none(&self.technician),
            notes: blank_to_none(&self.notes),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySubmission {
    pub panel_id: PanelId,
    pub reading: LegacyReading,
    pub status: Status,
    pub technician: Option<String>,
    pub notes: Option<String>,
}
