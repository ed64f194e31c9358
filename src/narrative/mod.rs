//! Turning staff observations into structured Norwegian reports.
//!
//! A [`NarrativeSource`] maps a [`NarrativeInput`] (the submitted form) to a
//! [`NarrativeReport`].  Two sources exist: [`LocalNarrativeSource`], which
//! never fails and fills a fixed skeleton from the form fields, and
//! [`llm::LlmNarrativeSource`], which asks a language model and validates the
//! answer.  Whatever the source produced, the ordered [`rules::RuleSet`] is
//! applied afterwards and may replace the report wholesale.

pub mod analyzer;
pub mod fallback;
pub mod knowledge;
pub mod llm;
#[cfg(feature = "openai")]
pub mod openai;
pub mod risk;
pub mod rules;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::model::{CaseStatus, ReportMetadata, Severity};
use crate::paths::Category;

use self::rules::RuleSet;

/// Placeholder for a free-text field that was left empty.
pub const NOT_SPECIFIED: &str = "Ikke spesifisert";
/// Placeholder for an empty narrative body.
pub const DASH: &str = "—";

/// Header row used when a report carries no risk table of its own.
pub const RISK_TABLE_HEADER: [&str; 3] = ["Risiko", "Beskrivelse", "Tiltak"];

/// Form fields submitted for a new report.  Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeInput {
    pub category: String,
    pub reporter: String,
    pub date: String,
    pub location: String,
    pub incident_type: String,
    pub root_cause: String,
    pub impact: String,
    pub immediate_actions: String,
    pub corrective_actions: String,
    pub preventive_actions: String,
    pub responsible: String,
    pub due_date: String,
    /// Severity label estimated by the reporter ("Lav", "Middels", "Høy").
    pub risk_before: String,
    /// Likelihood label for the risk matrix, e.g. "Høy".
    pub likelihood: Option<String>,
    /// Consequence label for the risk matrix, e.g. "Alvorlig".
    pub consequence: Option<String>,
    pub free_notes: String,
}

impl NarrativeInput {
    /// Reporter name, defaulting to `admin`.
    pub fn reporter(&self) -> &str {
        non_empty(&self.reporter).unwrap_or("admin")
    }

    /// Person responsible for follow-up, defaulting to the reporter.
    pub fn responsible(&self) -> &str {
        non_empty(&self.responsible).unwrap_or_else(|| self.reporter())
    }

    /// Norwegian label of the category, or the capitalised code for unknown categories.
    pub fn category_label(&self) -> String {
        match Category::from_code(&self.category) {
            Ok(category) => category.label().to_string(),
            Err(_) => capitalize(self.category.trim()),
        }
    }

    /// The submitted fields folded into labelled note lines, skipping empty ones.
    pub fn notes(&self) -> String {
        let risk_before = non_empty(&self.risk_before).unwrap_or("Middels");
        let fields = [
            ("Sted", self.location.as_str()),
            ("Hendelsestype", self.incident_type.as_str()),
            ("Rotårsak", self.root_cause.as_str()),
            ("Konsekvens/effekt", self.impact.as_str()),
            ("Akutte tiltak (innmeldt)", self.immediate_actions.as_str()),
            ("Korrigerende tiltak (innmeldt)", self.corrective_actions.as_str()),
            ("Forebyggende tiltak (innmeldt)", self.preventive_actions.as_str()),
            ("Ansvarlig", self.responsible()),
            ("Frist", self.due_date.as_str()),
            ("Fritekst", self.free_notes.as_str()),
            ("Forhåndsvurdert risiko", risk_before),
        ];

        fields
            .iter()
            .filter_map(|(label, value)| non_empty(value).map(|value| format!("{label}: {value}")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lowercased text scanned by the keyword rules.
    pub fn searchable_text(&self) -> String {
        [
            self.notes(),
            self.free_notes.clone(),
            self.incident_type.clone(),
        ]
        .join(" ")
        .to_lowercase()
    }

    /// First non-empty action field, in immediate, corrective, preventive order.
    pub fn first_action(&self) -> Option<&str> {
        [
            &self.immediate_actions,
            &self.corrective_actions,
            &self.preventive_actions,
        ]
        .into_iter()
        .find_map(|value| non_empty(value))
    }
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Rapport".to_string(),
    }
}

/// One titled narrative section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl ReportSection {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// One line of the action plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(rename = "tiltak", alias = "action")]
    pub action: String,
    #[serde(rename = "ansvar", alias = "owner", default)]
    pub owner: String,
    #[serde(rename = "frist", alias = "due", default)]
    pub due: String,
    #[serde(default)]
    pub status: String,
}

impl ActionItem {
    pub fn new(
        action: impl Into<String>,
        owner: impl Into<String>,
        due: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            owner: owner.into(),
            due: due.into(),
            status: status.into(),
        }
    }

    /// Action not yet started.
    pub fn planned(action: impl Into<String>, owner: impl Into<String>, due: impl Into<String>) -> Self {
        Self::new(action, owner, due, "Planlagt")
    }
}

/// A structured report as produced by a narrative source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NarrativeReport {
    pub title: String,
    pub severity: Severity,
    #[serde(default)]
    pub status: CaseStatus,
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub actions: Vec<ActionItem>,
    #[serde(default)]
    pub risk_table: Vec<Vec<String>>,
}

impl NarrativeReport {
    /// Sections joined as `Title:\nBody` blocks separated by blank lines.
    pub fn description(&self) -> String {
        self.sections
            .iter()
            .map(|section| format!("{}:\n{}", section.title, section.body))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The risk table, or a one-row placeholder table when it is empty.
    pub fn risk_rows_or_default(&self) -> Vec<Vec<String>> {
        if !self.risk_table.is_empty() {
            return self.risk_table.clone();
        }
        vec![
            RISK_TABLE_HEADER.iter().map(|cell| cell.to_string()).collect(),
            vec![
                self.severity.label().to_string(),
                "Foreløpig vurdering basert på observasjoner".to_string(),
                "Oppfølging etter behov".to_string(),
            ],
        ]
    }

    /// Builds the renderer input for this report.
    pub fn to_metadata(&self, category: &str, date: &str, created_by: &str) -> ReportMetadata {
        let description = self.description();
        let body = if description.trim().is_empty() {
            format!("Foreløpig risiko: {}.", self.severity)
        } else {
            description
        };

        ReportMetadata::new(self.title.clone())
            .with_status(self.status)
            .with_category(category)
            .with_date(date)
            .with_created_by(created_by)
            .with_language("no")
            .with_body_text(body)
            .with_risk_rows(self.risk_rows_or_default())
    }
}

/// Anything that can turn form input into a structured report.
pub trait NarrativeSource {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn generate(&self, input: &NarrativeInput) -> Result<NarrativeReport, GenerationError>;
}

/// The rule-free local generator; see [`fallback::generate`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalNarrativeSource;

impl NarrativeSource for LocalNarrativeSource {
    fn name(&self) -> &str {
        "local"
    }

    fn generate(&self, input: &NarrativeInput) -> Result<NarrativeReport, GenerationError> {
        Ok(fallback::generate(input))
    }
}

/// Which generator produced a composed report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Primary,
    Fallback,
}

/// Result of [`compose_with_fallback`].
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedReport {
    pub report: NarrativeReport,
    pub origin: Origin,
    /// Name of the override rule that replaced the report, if any.
    pub applied_rule: Option<&'static str>,
}

/// Runs `source` and then the override rules.  Generation errors are returned as is.
pub fn compose_report(
    source: &dyn NarrativeSource,
    input: &NarrativeInput,
    rules: &RuleSet,
) -> Result<ComposedReport, GenerationError> {
    let report = source.generate(input)?;
    let (report, applied_rule) = rules.apply(input, report);
    Ok(ComposedReport {
        report,
        origin: Origin::Primary,
        applied_rule,
    })
}

/// Like [`compose_report`], but falls back to the local generator when the
/// primary source fails or is absent.
pub fn compose_with_fallback(
    primary: Option<&dyn NarrativeSource>,
    input: &NarrativeInput,
    rules: &RuleSet,
) -> ComposedReport {
    let (report, origin) = match primary.map(|source| (source.name(), source.generate(input))) {
        Some((_, Ok(report))) => (report, Origin::Primary),
        Some((name, Err(err))) => {
            warn!("narrative source '{}' failed, using local fallback: {}", name, err);
            (fallback::generate(input), Origin::Fallback)
        }
        None => (fallback::generate(input), Origin::Fallback),
    };

    let (report, applied_rule) = rules.apply(input, report);
    if let Some(rule) = applied_rule {
        info!("override rule '{}' replaced the generated report", rule);
    }

    ComposedReport {
        report,
        origin,
        applied_rule,
    }
}
