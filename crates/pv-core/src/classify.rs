//! Severity classification for inspection data
//!
//! Two rules exist. Current findings carry the status the technician picked
//! on submission, so classification is a pass-through. Readings from the
//! older single-inspection schema (hotspot temperature, mount integrity,
//! cleanliness) go through the threshold rule in [`classify_reading`].

use crate::Status;
use serde::{Deserialize, Deserializer, Serialize};

/// Hotspot delta above which a panel is critical. Strictly greater than.
pub const HOTSPOT_CRITICAL_C: f64 = 20.0;

/// Surface cleanliness observed during a legacy inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cleanliness {
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Media")]
    Medium,
    #[serde(rename = "Baja")]
    Low,
}

impl Cleanliness {
    pub fn label(&self) -> &'static str {
        match self {
            Cleanliness::High => "Alta",
            Cleanliness::Medium => "Media",
            Cleanliness::Low => "Baja",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "alta" | "high" => Some(Cleanliness::High),
            "media" | "medium" => Some(Cleanliness::Medium),
            "baja" | "low" => Some(Cleanliness::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cleanliness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Measurements recorded by a legacy single-panel inspection.
///
/// Every field is optional: an absent value means "not measured", which is
/// not the same as a failing measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyReading {
    #[serde(default, alias = "temp_hotspot")]
    pub hotspot_c: Option<f64>,
    #[serde(default, alias = "sujecion_ok")]
    pub mount_ok: Option<bool>,
    #[serde(default, alias = "limpieza", deserialize_with = "lenient_cleanliness")]
    pub cleanliness: Option<Cleanliness>,
}

impl LegacyReading {
    pub fn new(hotspot_c: f64, mount_ok: bool, cleanliness: Cleanliness) -> Self {
        Self {
            hotspot_c: Some(hotspot_c),
            mount_ok: Some(mount_ok),
            cleanliness: Some(cleanliness),
        }
    }

    /// True when nothing was measured at all
    pub fn is_empty(&self) -> bool {
        self.hotspot_c.is_none() && self.mount_ok.is_none() && self.cleanliness.is_none()
    }

    pub fn hotspot_exceeded(&self) -> bool {
        self.hotspot_c.map_or(false, |t| t > HOTSPOT_CRITICAL_C)
    }

    /// Only an explicit `false` is a mount failure
    pub fn mount_failed(&self) -> bool {
        self.mount_ok == Some(false)
    }

    pub fn needs_cleaning(&self) -> bool {
        self.cleanliness == Some(Cleanliness::Low)
    }
}

/// What the classifier is asked to judge
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierInput {
    /// Status chosen by the technician when the finding was submitted
    Selected(Status),
    /// Measurements from the legacy inspection schema
    Legacy(LegacyReading),
}

/// Map an input to a severity. Total and deterministic.
pub fn classify(input: &ClassifierInput) -> Status {
    match input {
        ClassifierInput::Selected(status) => *status,
        ClassifierInput::Legacy(reading) => classify_reading(reading),
    }
}

/// Legacy threshold rule.
///
/// hotspot > 20 or mount explicitly failed → CRITICO, else cleanliness Baja
/// → ALERTA, else OPERATIVO. A reading with no measurements is PENDIENTE.
pub fn classify_reading(reading: &LegacyReading) -> Status {
    if reading.is_empty() {
        return Status::Pending;
    }

    if reading.hotspot_exceeded() || reading.mount_failed() {
        Status::Critical
    } else if reading.needs_cleaning() {
        Status::Alert
    } else {
        Status::Operational
    }
}

fn lenient_cleanliness<'de, D>(deserializer: D) -> Result<Option<Cleanliness>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Cleanliness::from_label))
}
