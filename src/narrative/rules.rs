//! Keyword rules that replace a generated report outright.
//!
//! Rules are checked in order against [`NarrativeInput::searchable_text`] and
//! the first match wins.  A matching rule discards whatever the narrative
//! source produced, including a model's answer.

use crate::model::{CaseStatus, Severity};

use super::{non_empty, ActionItem, NarrativeInput, NarrativeReport, ReportSection, DASH};

/// One `(predicate, override)` pair.
#[derive(Clone, Copy)]
pub struct OverrideRule {
    pub name: &'static str,
    /// Receives the lowercased searchable text.
    pub matches: fn(&str) -> bool,
    pub build: fn(&NarrativeInput) -> NarrativeReport,
}

impl std::fmt::Debug for OverrideRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideRule").field("name", &self.name).finish()
    }
}

/// Ordered list of override rules.
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<OverrideRule>,
}

impl Default for RuleSet {
    /// The built-in rules: currently the electrical hazard rule.
    fn default() -> Self {
        Self {
            rules: vec![ELECTRICAL_HAZARD],
        }
    }
}

impl RuleSet {
    /// A rule set that never overrides anything.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends `rule` after the existing ones.
    pub fn with_rule(mut self, rule: OverrideRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    /// First rule matching `input`, if any.
    pub fn find(&self, input: &NarrativeInput) -> Option<&OverrideRule> {
        let text = input.searchable_text();
        self.rules.iter().find(|rule| (rule.matches)(&text))
    }

    /// Returns the override report when a rule matches, `report` otherwise.
    pub fn apply(
        &self,
        input: &NarrativeInput,
        report: NarrativeReport,
    ) -> (NarrativeReport, Option<&'static str>) {
        match self.find(input) {
            Some(rule) => ((rule.build)(input), Some(rule.name)),
            None => (report, None),
        }
    }
}

const ELECTRICAL_KEYWORDS: &[&str] = &[
    "ledning",
    "kabel",
    "elektr",
    "electri",
    "strøm",
    "kortslutning",
    "سلك",
    "كهرب",
];

pub const ELECTRICAL_TITLE: &str = "Hendelsesrapport – Elektrisk fare (eksponert ledning)";

/// Exposed wiring, cables, shorts and anything else electrical.
pub const ELECTRICAL_HAZARD: OverrideRule = OverrideRule {
    name: "electrical-hazard",
    matches: mentions_electrical_hazard,
    build: electrical_report,
};

fn mentions_electrical_hazard(text: &str) -> bool {
    ELECTRICAL_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

fn electrical_report(input: &NarrativeInput) -> NarrativeReport {
    let location = non_empty(&input.location).unwrap_or("ukjent område");

    let sections = vec![
        ReportSection::new(
            "Sammendrag",
            format!(
                "Oppdaget eksponert elektrisk ledning i {location}. Umiddelbar avsperring og varsling. Risiko vurdert som Høy."
            ),
        ),
        ReportSection::new("Tema", "Elektrisk fare – eksponert ledning"),
        ReportSection::new("Bakgrunn", non_empty(&input.free_notes).unwrap_or(DASH)),
        ReportSection::new(
            "Observasjoner",
            non_empty(&input.impact)
                .unwrap_or("Fare for elektrisk støt, brann og personskade ved berøring."),
        ),
        ReportSection::new(
            "Årsaksanalyse (5 hvorfor)",
            non_empty(&input.root_cause).unwrap_or(
                "Foreløpig antatt: mekanisk skade/feil montasje/manglende vedlikehold.",
            ),
        ),
        ReportSection::new(
            "Risikovurdering",
            "Sannsynlighet: Middels–Høy. Konsekvens: Alvorlig. Samlet nivå: Høy før tiltak.",
        ),
        ReportSection::new(
            "Tiltaksplan",
            "Se tabellen for akutte, korrigerende og forebyggende tiltak.",
        ),
        ReportSection::new(
            "Etterlevelse",
            "Krav iht. NEK 400, internkontrollforskriften og bedriftens HMS-rutiner.",
        ),
        ReportSection::new(
            "Konklusjon",
            "Tiltak gjennomføres umiddelbart. Saken lukkes etter verifikasjon fra autorisert elektriker.",
        ),
    ];

    let actions = vec![
        ActionItem::new(
            "Sperr området og kutt strømkrets hvis mulig.",
            "Skiftleder",
            "Straks",
            "Igangsatt",
        ),
        ActionItem::planned(
            "Isoler den eksponerte lederen midlertidig til elektriker er på plass.",
            "HMS-ansvarlig",
            "Straks",
        ),
        ActionItem::planned(
            "Kontakt autorisert elektriker for permanent utbedring og dokumentasjon.",
            "Daglig leder",
            "+1 dag",
        ),
        ActionItem::planned(
            "Kontroller tilstøtende kabler og oppdater vedlikeholdsloggen.",
            "HMS-ansvarlig",
            "+3 dager",
        ),
        ActionItem::planned(
            "Gjennomfør en kort vernerunde og minn om plikten til å melde avvik.",
            "Verneombud",
            "+7 dager",
        ),
    ];

    let risk_table = vec![
        vec![
            "Risiko".to_string(),
            "Beskrivelse".to_string(),
            "Tiltak (før/etter)".to_string(),
        ],
        vec![
            Severity::High.label().to_string(),
            "Eksponert elektrisk ledning; støt/brannskade".to_string(),
            "FØR: Avsperring/strøm av. ETTER: Fagmessig utbedring + kontroll.".to_string(),
        ],
    ];

    NarrativeReport {
        title: ELECTRICAL_TITLE.to_string(),
        severity: Severity::High,
        status: CaseStatus::Open,
        sections,
        actions,
        risk_table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::fallback;

    fn input_with_notes(notes: &str) -> NarrativeInput {
        NarrativeInput {
            category: "maintenance".into(),
            free_notes: notes.into(),
            ..NarrativeInput::default()
        }
    }

    #[test]
    fn electrical_keyword_forces_high_severity_regardless_of_case() {
        let input = input_with_notes("Eksponert LEDNING ved kassa");
        let (report, rule) = RuleSet::default().apply(&input, fallback::generate(&input));
        assert_eq!(rule, Some("electrical-hazard"));
        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.status, CaseStatus::Open);
        assert_eq!(report.title, ELECTRICAL_TITLE);
        assert_eq!(report.sections.len(), 9);
        assert_eq!(report.actions.len(), 5);
        assert_eq!(report.risk_table.len(), 2);
        assert_eq!(report.sections[2].body, "Eksponert LEDNING ved kassa");
    }

    #[test]
    fn arabic_stem_matches() {
        let input = input_with_notes("سلك مكشوف قرب الفرن");
        assert!(RuleSet::default().find(&input).is_some());
    }

    #[test]
    fn unrelated_text_keeps_generated_report() {
        let input = input_with_notes("Glatt gulv ved oppvasken");
        let generated = fallback::generate(&input);
        let (report, rule) = RuleSet::default().apply(&input, generated.clone());
        assert_eq!(rule, None);
        assert_eq!(report, generated);
    }

    #[test]
    fn first_matching_rule_wins() {
        fn always(_: &str) -> bool {
            true
        }
        fn custom(_: &NarrativeInput) -> NarrativeReport {
            fallback::generate(&NarrativeInput::default())
        }
        let rules = RuleSet::default().with_rule(OverrideRule {
            name: "always",
            matches: always,
            build: custom,
        });
        assert_eq!(rules.names(), vec!["electrical-hazard", "always"]);
        let input = input_with_notes("kortslutning i sikringsskapet");
        assert_eq!(rules.find(&input).map(|rule| rule.name), Some("electrical-hazard"));
        assert_eq!(
            rules.find(&input_with_notes("tørt")).map(|rule| rule.name),
            Some("always")
        );
        assert!(RuleSet::empty().find(&input).is_none());
    }
}
