//! Value types describing a report before it is laid out.
//!
//! A [`ReportMetadata`] is assembled once by the calling workflow (form input or
//! a narrative generator), handed to the renderer and then dropped.  None of the
//! types here know about PDF primitives, so they can be deserialized from JSON
//! and passed around freely.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Processing state of a case, shown as the coloured badge in the header.
///
/// Parsing is lenient: any value that is not recognised falls back to
/// [`CaseStatus::Open`] so that an unexpected status never hides a case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CaseStatus {
    /// New or untreated case.
    #[default]
    Open,
    /// Case being worked on.
    Processing,
    /// Case resolved and verified.
    Closed,
}

impl CaseStatus {
    /// Parses a status string, accepting the Norwegian aliases used in the forms.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "processing" | "in_progress" | "under behandling" | "under arbeid" => Self::Processing,
            "closed" | "lukket" | "løst" => Self::Closed,
            _ => Self::Open,
        }
    }

    /// Returns the canonical wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Processing => "processing",
            Self::Closed => "closed",
        }
    }
}

impl From<String> for CaseStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for CaseStatus {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical risk level of a report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "Lav")]
    Low,
    #[default]
    #[serde(rename = "Middels")]
    Medium,
    #[serde(rename = "Høy")]
    High,
}

impl Severity {
    /// All levels in ascending order.
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// Norwegian label as written in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Lav",
            Self::Medium => "Middels",
            Self::High => "Høy",
        }
    }

    /// Strict parse of the Norwegian label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|severity| severity.label() == label.trim())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the document renderer needs to produce one report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    title: String,
    #[serde(default)]
    status: CaseStatus,
    #[serde(default)]
    category: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    created_by: String,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    body_text: String,
    #[serde(default)]
    risk_rows: Vec<Vec<String>>,
    #[serde(default)]
    logo: Option<PathBuf>,
}

fn default_language() -> String {
    "no".to_string()
}

impl ReportMetadata {
    /// Creates metadata with the given title and empty remaining fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            language: default_language(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Free-form narrative; paragraphs are separated by line breaks.
    pub fn body_text(&self) -> &str {
        &self.body_text
    }

    /// Risk table rows; row 0 is the header row.
    pub fn risk_rows(&self) -> &[Vec<String>] {
        &self.risk_rows
    }

    /// Optional logo path; a missing file is skipped by the renderer.
    pub fn logo(&self) -> Option<&Path> {
        self.logo.as_deref()
    }

    pub fn with_status(mut self, status: impl Into<CaseStatus>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_body_text(mut self, body_text: impl Into<String>) -> Self {
        self.body_text = body_text.into();
        self
    }

    /// Replaces the risk table rows.
    pub fn with_risk_rows<I, R, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.risk_rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self
    }

    pub fn with_logo(mut self, logo: impl Into<Option<PathBuf>>) -> Self {
        self.logo = logo.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseStatus, ReportMetadata, Severity};

    #[test]
    fn unknown_status_is_treated_as_open() {
        assert_eq!(CaseStatus::parse("archived"), CaseStatus::Open);
        assert_eq!(CaseStatus::parse(""), CaseStatus::Open);
        assert_eq!(CaseStatus::parse(" Closed "), CaseStatus::Closed);
        assert_eq!(CaseStatus::parse("in_progress"), CaseStatus::Processing);
    }

    #[test]
    fn metadata_deserializes_with_defaults() {
        let meta: ReportMetadata =
            serde_json::from_str(r#"{"title": "Glatt gulv", "status": "weird"}"#).unwrap();
        assert_eq!(meta.title(), "Glatt gulv");
        assert_eq!(meta.status(), CaseStatus::Open);
        assert_eq!(meta.language(), "no");
        assert!(meta.risk_rows().is_empty());
        assert!(meta.logo().is_none());
    }

    #[test]
    fn severity_uses_norwegian_labels() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"Høy\"");
        assert_eq!(Severity::from_label("Middels"), Some(Severity::Medium));
        assert_eq!(Severity::from_label("High"), None);
    }
}
