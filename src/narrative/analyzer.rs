//! Keyword triage of free-text observations.
//!
//! High-risk keywords add two points and medium-risk keywords one point.
//! Three points or more is `Høy`, exactly two is `Middels`.

use serde::Serialize;

use crate::model::Severity;

const HIGH_RISK: &[&str] = &[
    "brann",
    "røyk",
    "eksplosjon",
    "skli",
    "elektr",
    "kortslutning",
    "kvelning",
    "gift",
    "gass",
];

const MEDIUM_RISK: &[&str] = &[
    "lekkasje",
    "olje",
    "fett",
    "forurens",
    "knust",
    "defekt",
    "søl",
    "fukt",
];

struct Suggestion {
    triggers: &'static [&'static str],
    text: &'static str,
}

const SUGGESTIONS: &[Suggestion] = &[
    Suggestion {
        triggers: &["fett", "olje", "smøre"],
        text: "Planlegg tømming av fettutskiller og gå gjennom vedlikeholdsloggen.",
    },
    Suggestion {
        triggers: &["elektr", "kortslutning", "sikring"],
        text: "Tilkall elektriker, kontroller sikringene og dokumenter målingene.",
    },
    Suggestion {
        triggers: &["skli", "søl", "fukt"],
        text: "Tørk gulvet, sett opp varselskilt og undersøk lekkasjen.",
    },
    Suggestion {
        triggers: &["avfall", "sortering", "kommune"],
        text: "Send skriftlig henvendelse til kommunen, dokumenter svaret og lag en midlertidig sorteringsplan.",
    },
];

/// Outcome of [`analyze`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub severity: Severity,
    pub score: u32,
    /// Matched keywords in match order, without duplicates.
    pub tags: Vec<String>,
    pub suggestions: Vec<String>,
}

pub fn analyze(text: &str) -> Analysis {
    let text = text.to_lowercase();
    let mut score = 0;
    let mut tags = Vec::new();

    for (keywords, points) in [(HIGH_RISK, 2), (MEDIUM_RISK, 1)] {
        for keyword in keywords.iter().filter(|keyword| text.contains(*keyword)) {
            score += points;
            tags.push(keyword.to_string());
        }
    }

    let severity = match score {
        0 | 1 => Severity::Low,
        2 => Severity::Medium,
        _ => Severity::High,
    };

    let suggestions = SUGGESTIONS
        .iter()
        .filter(|suggestion| suggestion.triggers.iter().any(|trigger| text.contains(trigger)))
        .map(|suggestion| suggestion.text.to_string())
        .collect();

    Analysis {
        severity,
        score,
        tags,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_text_is_low() {
        let analysis = analyze("Alt i orden på lageret.");
        assert_eq!(analysis.severity, Severity::Low);
        assert!(analysis.tags.is_empty());
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn single_high_keyword_is_medium() {
        let analysis = analyze("Lukt av RØYK ved ovnen");
        assert_eq!(analysis.score, 2);
        assert_eq!(analysis.severity, Severity::Medium);
        assert_eq!(analysis.tags, vec!["røyk"]);
    }

    #[test]
    fn combined_keywords_are_high_with_suggestions() {
        let analysis = analyze("Fettsøl på gulvet, ansatt holdt på å skli");
        assert_eq!(analysis.severity, Severity::High);
        assert_eq!(analysis.tags, vec!["skli", "fett", "søl"]);
        assert_eq!(analysis.suggestions.len(), 2);
    }
}
