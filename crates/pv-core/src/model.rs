//! Domain records as read from the data store
//!
//! Field names are English; serde aliases accept the column names the
//! hosted backend uses, so a raw query result deserializes directly.

use crate::classify::{classify, ClassifierInput, LegacyReading};
use crate::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ParkId = i64;
pub type PanelId = i64;
pub type InspectionId = i64;
pub type DefectTypeId = i64;
pub type FindingId = i64;

/// A solar installation owned by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Park {
    #[serde(alias = "id_parque")]
    pub id: ParkId,
    #[serde(alias = "nombre_cliente")]
    pub client_name: String,
    #[serde(alias = "ubicacion_geo")]
    pub location: String,
    /// Installed capacity in MWp
    #[serde(alias = "capacidad_instalada")]
    pub capacity_mwp: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A panel from the park inventory, with the findings recorded against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    #[serde(alias = "id_panel")]
    pub id: PanelId,
    #[serde(default, alias = "id_parque")]
    pub park_id: Option<ParkId>,
    #[serde(default, alias = "codigo_serie")]
    pub serial_number: Option<String>,
    #[serde(default, alias = "marca_modelo")]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Status stored by an older write path. Kept for round-tripping only;
    /// the effective status always comes from the findings.
    #[serde(default, alias = "ultimo_estado")]
    pub last_status: Option<Status>,
    #[serde(default, alias = "new_registo_hallazgos")]
    pub findings: Vec<Finding>,
}

impl Panel {
    pub fn new(id: PanelId) -> Self {
        Self {
            id,
            park_id: None,
            serial_number: None,
            model: None,
            created_at: None,
            last_status: None,
            findings: Vec::new(),
        }
    }

    /// Zero-padded label, e.g. `#007`
    pub fn display_id(&self) -> String {
        format!("#{:03}", self.id)
    }

    pub fn serial_or_placeholder(&self) -> &str {
        non_blank(&self.serial_number).unwrap_or("N/A")
    }

    pub fn model_or_placeholder(&self) -> &str {
        non_blank(&self.model).unwrap_or("Sin modelo")
    }
}

/// Kind of site visit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InspectionType {
    Thermographic,
    Visual,
    Electrical,
    Maintenance,
    Other(String),
}

impl InspectionType {
    pub fn label(&self) -> &str {
        match self {
            InspectionType::Thermographic => "Termográfica",
            InspectionType::Visual => "Visual",
            InspectionType::Electrical => "Eléctrica",
            InspectionType::Maintenance => "Mantenimiento",
            InspectionType::Other(s) => s,
        }
    }
}

impl From<String> for InspectionType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "termográfica" | "termografica" | "termográfico" | "termografico"
            | "thermographic" => InspectionType::Thermographic,
            "visual" => InspectionType::Visual,
            "eléctrica" | "electrica" | "eléctrico" | "electrico" | "electrical" => {
                InspectionType::Electrical
            }
            "mantenimiento" | "maintenance" => InspectionType::Maintenance,
            _ => InspectionType::Other(raw),
        }
    }
}

impl From<InspectionType> for String {
    fn from(kind: InspectionType) -> Self {
        kind.label().to_string()
    }
}

impl std::fmt::Display for InspectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A site visit to a park
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    #[serde(alias = "id_inspeccion")]
    pub id: InspectionId,
    #[serde(default, alias = "id_parque")]
    pub park_id: Option<ParkId>,
    #[serde(default, alias = "fecha_inspeccion")]
    pub inspected_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "tecnico_responsable")]
    pub technician: Option<String>,
    #[serde(default, alias = "condicion_climatica")]
    pub weather: Option<String>,
    #[serde(default, alias = "tipo_inspeccion")]
    pub inspection_type: Option<InspectionType>,
    #[serde(default, alias = "observaciones")]
    pub notes: Option<String>,
}

impl Inspection {
    /// `{type} - {technician}` when the inspection type is known
    pub fn descriptor(&self) -> Option<String> {
        let kind = self.inspection_type.as_ref()?;
        if kind.label().trim().is_empty() {
            return None;
        }
        let technician = non_blank(&self.technician).unwrap_or("no technician");
        Some(format!("{} - {}", kind, technician))
    }
}

/// Category of a catalogued defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DefectCategory {
    Thermographic,
    Visual,
    Electrical,
    Structural,
    Other,
}

impl DefectCategory {
    pub fn label(&self) -> &'static str {
        match self {
            DefectCategory::Thermographic => "Termográfico",
            DefectCategory::Visual => "Visual",
            DefectCategory::Electrical => "Eléctrico",
            DefectCategory::Structural => "Estructural",
            DefectCategory::Other => "Otro",
        }
    }
}

impl From<String> for DefectCategory {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "termográfico" | "termografico" | "thermographic" => DefectCategory::Thermographic,
            "visual" => DefectCategory::Visual,
            "eléctrico" | "electrico" | "electrical" => DefectCategory::Electrical,
            "estructural" | "structural" => DefectCategory::Structural,
            _ => DefectCategory::Other,
        }
    }
}

impl From<DefectCategory> for String {
    fn from(category: DefectCategory) -> Self {
        category.label().to_string()
    }
}

impl std::fmt::Display for DefectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Entry of the append-only defect catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectType {
    #[serde(alias = "id_tipo_defecto")]
    pub id: DefectTypeId,
    #[serde(alias = "nombre_defecto")]
    pub name: String,
    #[serde(alias = "categoria")]
    pub category: DefectCategory,
    #[serde(alias = "gravedad_sugerida")]
    pub suggested_severity: Status,
}

/// Photo attached to a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Evidence {
    Url(String),
    /// `data:` URI with the image inlined
    EmbeddedImage(String),
}

impl Evidence {
    pub fn as_str(&self) -> &str {
        match self {
            Evidence::Url(s) | Evidence::EmbeddedImage(s) => s,
        }
    }
}

impl From<String> for Evidence {
    fn from(raw: String) -> Self {
        if raw.starts_with("data:") {
            Evidence::EmbeddedImage(raw)
        } else {
            Evidence::Url(raw)
        }
    }
}

impl From<Evidence> for String {
    fn from(evidence: Evidence) -> Self {
        match evidence {
            Evidence::Url(s) | Evidence::EmbeddedImage(s) => s,
        }
    }
}

/// A defect observed on one panel during one inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(alias = "id_hallazgo")]
    pub id: FindingId,
    #[serde(alias = "id_inspeccion")]
    pub inspection_id: InspectionId,
    #[serde(alias = "id_panel")]
    pub panel_id: PanelId,
    #[serde(default, alias = "id_tipo_defecto")]
    pub defect_type_id: Option<DefectTypeId>,
    #[serde(default, alias = "valor_medio")]
    pub measured_value: Option<f64>,
    /// Technician-selected status
    #[serde(default, alias = "estado_actual")]
    pub status: Option<Status>,
    #[serde(default, alias = "foto_evidencia")]
    pub evidence: Option<Evidence>,
    #[serde(default, alias = "comentario")]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Parent inspection, when the query embedded it
    #[serde(default, alias = "new_inspecciones")]
    pub inspection: Option<Inspection>,
    /// Catalog entry, when the query embedded it
    #[serde(default, alias = "new_catalogo_defectos")]
    pub defect_type: Option<DefectType>,
    /// Measurements carried over from the legacy inspection schema
    #[serde(default)]
    pub reading: Option<LegacyReading>,
}

impl Finding {
    /// Which rule produced this record's status.
    ///
    /// A stored technician status wins; otherwise a non-empty legacy
    /// reading is classified; otherwise there is nothing to judge.
    pub fn classifier_input(&self) -> Option<ClassifierInput> {
        if let Some(status) = self.status {
            return Some(ClassifierInput::Selected(status));
        }
        self.reading
            .as_ref()
            .filter(|r| !r.is_empty())
            .map(|r| ClassifierInput::Legacy(r.clone()))
    }

    pub fn effective_status(&self) -> Status {
        self.classifier_input()
            .map(|input| classify(&input))
            .unwrap_or(Status::Pending)
    }

    /// Hotspot temperature: the legacy reading, or the measured value of a
    /// thermographic defect
    pub fn hotspot_reading(&self) -> Option<f64> {
        if let Some(t) = self.reading.as_ref().and_then(|r| r.hotspot_c) {
            return Some(t);
        }
        match &self.defect_type {
            Some(defect) if defect.category == DefectCategory::Thermographic => self.measured_value,
            _ => None,
        }
    }

    pub fn mount_failed(&self) -> bool {
        self.reading.as_ref().map_or(false, |r| r.mount_failed())
    }

    pub fn needs_cleaning(&self) -> bool {
        self.reading.as_ref().map_or(false, |r| r.needs_cleaning())
    }

    pub fn defect_name(&self) -> Option<&str> {
        self.defect_type.as_ref().map(|d| d.name.as_str())
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
