//! The local report skeleton used when no model is available.

use crate::model::{CaseStatus, Severity};

use super::{
    non_empty, risk, ActionItem, NarrativeInput, NarrativeReport, ReportSection, DASH,
    NOT_SPECIFIED, RISK_TABLE_HEADER,
};

/// Severity the reporter arrived at: the risk matrix when both of its labels
/// were given, then the reporter's own estimate, then `Middels`.
pub fn estimated_severity(input: &NarrativeInput) -> Severity {
    if let (Some(likelihood), Some(consequence)) = (&input.likelihood, &input.consequence) {
        return risk::assess(likelihood, consequence).level;
    }
    Severity::from_label(&input.risk_before).unwrap_or_default()
}

/// Builds the fixed eight-section report from the form fields.
pub fn generate(input: &NarrativeInput) -> NarrativeReport {
    let severity = estimated_severity(input);
    let location = non_empty(&input.location).unwrap_or("ukjent sted");
    let or_dash = |value: &str| non_empty(value).unwrap_or(DASH).to_string();

    let sections = vec![
        ReportSection::new(
            "Sammendrag",
            format!("Hendelse registrert på {location}. Foreløpig risiko: {severity}."),
        ),
        ReportSection::new(
            "Tema",
            non_empty(&input.incident_type).unwrap_or(NOT_SPECIFIED),
        ),
        ReportSection::new("Observasjoner", or_dash(&input.impact)),
        ReportSection::new("Årsaksanalyse (5 hvorfor)", or_dash(&input.root_cause)),
        ReportSection::new(
            "Risikovurdering",
            format!("Forhåndsvurdert nivå før tiltak: {severity}."),
        ),
        ReportSection::new("Tiltaksplan", "Se tabellen nedenfor."),
        ReportSection::new("Etterlevelse", "Vurdert mot HMS/HACCP for restaurantdrift."),
        ReportSection::new("Konklusjon", "Tiltak følges opp til lukking."),
    ];

    let due = |default: &str| non_empty(&input.due_date).unwrap_or(default).to_string();
    let mut actions = Vec::new();
    if let Some(action) = non_empty(&input.immediate_actions) {
        actions.push(ActionItem::planned(action, input.responsible(), due("+1 dag")));
    }
    if let Some(action) = non_empty(&input.corrective_actions) {
        actions.push(ActionItem::planned(action, input.responsible(), due("+7 dager")));
    }
    if let Some(action) = non_empty(&input.preventive_actions) {
        actions.push(ActionItem::planned(action, "HMS-ansvarlig", "+14 dager"));
    }

    let risk_table = vec![
        RISK_TABLE_HEADER.iter().map(|cell| cell.to_string()).collect(),
        vec![
            severity.label().to_string(),
            non_empty(&input.impact)
                .unwrap_or("Foreløpig vurdering")
                .to_string(),
            input.first_action().unwrap_or("Oppfølging").to_string(),
        ],
    ];

    NarrativeReport {
        title: format!("Hendelsesrapport – {}", input.category_label()),
        severity,
        status: CaseStatus::Open,
        sections,
        actions,
        risk_table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_uses_placeholders() {
        let report = generate(&NarrativeInput::default());
        assert_eq!(report.sections.len(), 8);
        assert_eq!(report.severity, Severity::Medium);
        assert_eq!(
            report.sections[0].body,
            "Hendelse registrert på ukjent sted. Foreløpig risiko: Middels."
        );
        assert_eq!(report.sections[1].body, NOT_SPECIFIED);
        assert_eq!(report.sections[2].body, DASH);
        assert!(report.actions.is_empty());
        assert_eq!(
            report.risk_table[1],
            vec!["Middels", "Foreløpig vurdering", "Oppfølging"]
        );
    }

    #[test]
    fn actions_follow_form_fields() {
        let input = NarrativeInput {
            category: "deviations".into(),
            reporter: "Kari".into(),
            immediate_actions: "Sperret av".into(),
            preventive_actions: "Opplæring".into(),
            risk_before: "Høy".into(),
            ..NarrativeInput::default()
        };
        let report = generate(&input);
        assert_eq!(report.title, "Hendelsesrapport – Avvik");
        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.actions.len(), 2);
        assert_eq!(report.actions[0].owner, "Kari");
        assert_eq!(report.actions[0].due, "+1 dag");
        assert_eq!(report.actions[1].owner, "HMS-ansvarlig");
        assert_eq!(report.actions[1].due, "+14 dager");
        assert_eq!(report.risk_table[1][2], "Sperret av");
    }

    #[test]
    fn matrix_labels_take_precedence_over_estimate() {
        let input = NarrativeInput {
            risk_before: "Lav".into(),
            likelihood: Some("Svært høy".into()),
            consequence: Some("Kritisk".into()),
            ..NarrativeInput::default()
        };
        assert_eq!(estimated_severity(&input), Severity::High);
    }
}
