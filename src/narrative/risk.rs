//! Likelihood × consequence risk matrix.
//!
//! Both axes use five Norwegian labels scored 1 to 5.  Labels that are not
//! recognised score 3.  The product decides the level: 16 and above is
//! `Høy`, 9 and above `Middels`, anything lower `Lav`.

use serde::Serialize;

use crate::model::{CaseStatus, Severity};

use super::{non_empty, NarrativeInput, NarrativeReport, ReportSection, RISK_TABLE_HEADER};

pub const LIKELIHOOD_LABELS: [&str; 5] = ["Svært lav", "Lav", "Middels", "Høy", "Svært høy"];
pub const CONSEQUENCE_LABELS: [&str; 5] = ["Ubetydelig", "Liten", "Moderat", "Alvorlig", "Kritisk"];

const UNKNOWN_SCORE: u8 = 3;

fn axis_value(labels: &[&str; 5], label: &str) -> u8 {
    let label = label.trim();
    labels
        .iter()
        .position(|candidate| *candidate == label)
        .map(|index| index as u8 + 1)
        .unwrap_or(UNKNOWN_SCORE)
}

pub fn likelihood_value(label: &str) -> u8 {
    axis_value(&LIKELIHOOD_LABELS, label)
}

pub fn consequence_value(label: &str) -> u8 {
    axis_value(&CONSEQUENCE_LABELS, label)
}

/// Level for a matrix score.
pub fn level_for_score(score: u8) -> Severity {
    if score >= 16 {
        Severity::High
    } else if score >= 9 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub likelihood: u8,
    pub consequence: u8,
    pub score: u8,
    pub level: Severity,
}

/// Scores a likelihood and consequence label pair.
pub fn assess(likelihood: &str, consequence: &str) -> RiskAssessment {
    let likelihood = likelihood_value(likelihood);
    let consequence = consequence_value(consequence);
    let score = likelihood * consequence;
    RiskAssessment {
        likelihood,
        consequence,
        score,
        level: level_for_score(score),
    }
}

/// A report built purely from the matrix and the form fields.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixReport {
    pub report: NarrativeReport,
    pub assessment: RiskAssessment,
}

/// Builds the matrix-based report.  Missing labels default to `Middels` and `Moderat`.
pub fn matrix_report(input: &NarrativeInput) -> MatrixReport {
    let likelihood = input
        .likelihood
        .as_deref()
        .and_then(non_empty)
        .unwrap_or("Middels");
    let consequence = input
        .consequence
        .as_deref()
        .and_then(non_empty)
        .unwrap_or("Moderat");
    let assessment = assess(likelihood, consequence);
    let given = |value: &str, default: &'static str| non_empty(value).unwrap_or(default).to_string();

    let overview = format!(
        "Sted: {}\nHendelsestype: {}\nAnsvarlig: {}\nFrist: {}",
        given(&input.location, "Ikke oppgitt"),
        given(&input.incident_type, "Ikke oppgitt"),
        given(&input.responsible, "Ikke oppgitt"),
        given(&input.due_date, "Ikke oppgitt"),
    );
    let mut cause = format!(
        "- Rotårsak: {}\n- Virkning/konsekvens: {}",
        given(&input.root_cause, "Ikke identifisert enda"),
        given(&input.impact, "Ikke oppgitt"),
    );
    if let Some(notes) = non_empty(&input.free_notes) {
        cause.push_str(&format!("\n\nTilleggsnotat:\n{notes}"));
    }
    let actions = format!(
        "- Umiddelbare: {}\n- Korrigerende: {}\n- Forebyggende: {}",
        given(&input.immediate_actions, "Ingen registrert"),
        given(&input.corrective_actions, "Ingen registrert"),
        given(&input.preventive_actions, "Ingen registrert"),
    );
    let matrix = format!(
        "- Sannsynlighet: {likelihood} (verdi={})\n- Konsekvens: {consequence} (verdi={})\n- Skår: {} -> Nivå: {}",
        assessment.likelihood, assessment.consequence, assessment.score, assessment.level,
    );

    let report = NarrativeReport {
        title: format!("Hendelsesrapport – {}", input.category_label()),
        severity: assessment.level,
        status: CaseStatus::Open,
        sections: vec![
            ReportSection::new("Oversikt", overview),
            ReportSection::new("Beskrivelse og årsak", cause),
            ReportSection::new("Tiltak", actions),
            ReportSection::new("Risikomatrise (før tiltak)", matrix),
        ],
        actions: Vec::new(),
        risk_table: vec![
            RISK_TABLE_HEADER.iter().map(|cell| cell.to_string()).collect(),
            vec![
                assessment.level.label().to_string(),
                "Vurdering basert på matrise (S×K)".to_string(),
                "Oppfølging iht. ansvar og frist".to_string(),
            ],
        ],
    };

    MatrixReport { report, assessment }
}
