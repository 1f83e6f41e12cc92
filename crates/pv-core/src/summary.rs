//! Fleet summary for the dashboard

use crate::aggregate::derive_status;
use crate::model::Panel;
use crate::Status;
use serde::{Deserialize, Serialize};

/// Panel count per status bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "CRITICO")]
    pub critical: usize,
    #[serde(rename = "ALERTA")]
    pub alert: usize,
    #[serde(rename = "OPERATIVO")]
    pub operational: usize,
    #[serde(rename = "PENDIENTE")]
    pub pending: usize,
}

impl StatusCounts {
    /// Count one panel. Every status lands in exactly one bucket.
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Critical => self.critical += 1,
            Status::Alert => self.alert += 1,
            Status::Operational => self.operational += 1,
            Status::Pending => self.pending += 1,
        }
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Critical => self.critical,
            Status::Alert => self.alert,
            Status::Operational => self.operational,
            Status::Pending => self.pending,
        }
    }

    pub fn sum(&self) -> usize {
        self.critical + self.alert + self.operational + self.pending
    }
}

/// One slice of the status chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSlice {
    pub status: Status,
    pub label: String,
    pub value: usize,
    pub color: String,
}

/// Dashboard roll-up of a panel collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub counts: StatusCounts,
    pub total: usize,
    pub critical_alert: bool,
}

impl FleetSummary {
    /// Chart slices in bucket order, with empty buckets left out
    pub fn slices(&self) -> Vec<ChartSlice> {
        Status::ALL
            .iter()
            .map(|status| ChartSlice {
                status: *status,
                label: status.chart_label().to_string(),
                value: self.counts.get(*status),
                color: status.color().to_string(),
            })
            .filter(|slice| slice.value > 0)
            .collect()
    }

    /// Call-to-action shown when critical panels exist
    pub fn alert_message(&self) -> Option<String> {
        self.critical_alert.then(|| {
            format!(
                "{} Paneles Críticos requieren atención inmediata.",
                self.counts.critical
            )
        })
    }
}

/// Summarize panels by their derived status in a single pass
pub fn summarize(panels: &[Panel]) -> FleetSummary {
    let mut summary = summarize_statuses(panels.iter().map(|p| derive_status(p).status));
    summary.total = panels.len();
    summary
}

/// Summarize statuses that were derived elsewhere (or precomputed)
pub fn summarize_statuses<I>(statuses: I) -> FleetSummary
where
    I: IntoIterator<Item = Status>,
{
    let mut counts = StatusCounts::default();
    let mut total = 0;

    for status in statuses {
        counts.record(status);
        total += 1;
    }

    FleetSummary {
        counts,
        total,
        critical_alert: counts.critical > 0,
    }
}
