//! The inline status panel shown after a load or save.

use super::error::GridError;
use super::persistence::{PriceOutcome, SaveReport};
use super::records::LoadSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
}

impl StatusMessage {
    pub fn new(severity: Severity, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            detail: detail.into(),
        }
    }

    pub fn from_error(err: &GridError) -> Self {
        let title = match err {
            GridError::Network { .. } => "Could not reach the server",
            GridError::Http { .. } | GridError::Parse { .. } => "The server rejected the request",
            GridError::ConfigurationGap { .. } => "Editing is disabled",
            GridError::SaveInProgress => "A save is already running",
            GridError::LoadInProgress => "Still loading",
            GridError::Cancelled => "Cancelled",
            GridError::PricesRejected { .. } => "Prices were not saved",
            GridError::ReadOnly { .. } | GridError::ReadOnlyItem(_) => "Read-only",
            _ => "Something went wrong",
        };
        let detail = match err {
            GridError::Http { detail, .. } => detail.clone(),
            GridError::ConfigurationGap { missing } => {
                format!("Select a {} before editing or saving.", missing.join(", "))
            }
            other => other.to_string(),
        };
        Self::new(Severity::Error, title, detail)
    }

    pub fn from_report(report: &SaveReport) -> Self {
        let mut notes = Vec::new();
        if let PriceOutcome::PerItem { failed, .. } = &report.prices {
            if !failed.is_empty() {
                notes.push(format!("Prices for {} items were not saved.", failed.len()));
            }
        }
        if !report.skipped_items.is_empty() {
            notes.push(format!(
                "{} items have no backend identifier and were skipped.",
                report.skipped_items.len()
            ));
        }
        if let Err(reason) = &report.reconciled {
            notes.push(format!("Reloading saved values failed: {reason}"));
        }
        if report.pending_edits > 0 {
            notes.push(format!(
                "{} edits made during the save are not saved yet.",
                report.pending_edits
            ));
        }

        let saved = format!("{} cells saved.", report.cells_written);
        if notes.is_empty() {
            Self::new(Severity::Success, "Saved", saved)
        } else {
            notes.insert(0, saved);
            Self::new(Severity::Warning, "Saved with warnings", notes.join(" "))
        }
    }

    pub fn from_load(summary: &LoadSummary) -> Self {
        let detail = format!("{} cells loaded.", summary.applied);
        if summary.unmatched + summary.invalid == 0 {
            Self::new(Severity::Success, "Loaded", detail)
        } else {
            Self::new(
                Severity::Warning,
                "Loaded with warnings",
                format!(
                    "{detail} {} records matched no line item, {} were invalid.",
                    summary.unmatched, summary.invalid
                ),
            )
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
