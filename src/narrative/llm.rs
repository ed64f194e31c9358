//! Narrative source backed by a chat-completion model.
//!
//! The model is asked for a JSON document matching the report schema.  A
//! response is accepted only after [`validate_payload`] passes; it is then
//! cleaned by [`post_process`].  Failed attempts are retried once after a
//! short pause, and if every attempt fails the caller gets
//! [`GenerationError::Exhausted`] and decides whether to fall back.

use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde_json::{json, Value};

use crate::error::GenerationError;
use crate::model::{CaseStatus, Severity};

use super::{NarrativeInput, NarrativeReport, NarrativeSource, RISK_TABLE_HEADER};

/// Number of completion attempts before giving up.
pub const DEFAULT_ATTEMPTS: usize = 2;
/// Pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);

pub const STATUS_VALUES: [&str; 3] = ["open", "processing", "closed"];

const REQUIRED_KEYS: [&str; 5] = ["title", "severity", "status", "sections", "actions"];
const REQUIRED_SECTIONS: [&str; 6] = [
    "sammendrag",
    "observasjoner",
    "årsaksanalyse",
    "risikovurdering",
    "tiltaksplan",
    "konklusjon",
];
const MIN_SECTIONS: usize = 3;

pub const SYSTEM_PROMPT: &str = "Du er en HMS-rådgiver for restaurantdrift i Norge (serveringssteder).
Skriv ALLTID på norsk (bokmål), profesjonelt, kort og presist. Ikke gjenta fritekst; bygg rapporten selv.
Fokuser på kjøkken, HACCP, allergener, varme arbeider, brannsikkerhet, renhold, glatte gulv, skarpe gjenstander, kjemikalier.
Struktur-krav:
- Seksjoner (i denne rekkefølgen): Sammendrag; Tema; Bakgrunn; Observasjoner; Årsaksanalyse (5 hvorfor); Risikovurdering; Tiltaksplan; Etterlevelse; Konklusjon.
- Tiltaksplan: SMART (konkret ansvar/frist/status).
- Risikovurdering: kort begrunnelse + tabell (før/etter tiltak hvis relevant).
Returner KUN JSON i henhold til skjemaet.
";

const JSON_INSTRUCTIONS: &str = r#"Skjema (JSON):
{
  "title": string,
  "severity": "Lav" | "Middels" | "Høy",
  "status": "open" | "processing" | "closed",
  "sections": [{"title": string, "body": string}, ...],
  "actions": [{"tiltak": string, "ansvar": string, "frist": string, "status": string}, ...],
  "risk_table": [[string]]  // 2D-tabell. Første rad headers. Minst: ["Risiko","Beskrivelse","Tiltak"]
}
Skriv kort og konsist. Unngå generisk fyll. Oppgi kun gyldig JSON.
"#;

/// A single chat completion backend.
pub trait CompletionClient {
    /// Sends one system and one user message and returns the raw reply text.
    fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;
}

/// A known restaurant hazard given to the model as background knowledge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HazardTemplate {
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
}

impl HazardTemplate {
    pub fn new(title: &str, description: &str, actions: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            actions: actions.iter().map(|action| action.to_string()).collect(),
        }
    }

    fn context_line(&self) -> String {
        format!(
            "- {}: {}. Tiltak: {}",
            self.title,
            self.description,
            self.actions.join(" • ")
        )
    }
}

/// Hazards used when the caller supplies none.
pub fn default_hazards() -> Vec<HazardTemplate> {
    vec![
        HazardTemplate::new(
            "Brann-/skåldingsfare ved frityr",
            "Risiko ved håndtering av varm olje i frityrgryter, påfyll og filtrering",
            &[
                "Stans varmekilde ved søl",
                "Bruk varmebestandige hansker/forkle",
                "Prosedyre for filtrering/avkjøling",
                "Kontroller brannteppe/slokker",
            ],
        ),
        HazardTemplate::new(
            "Kuttfare (kniver/utstyr)",
            "Risiko for kutt ved bruk av kniver, mandolin og food processor",
            &[
                "Regelmessig sliping",
                "Kuttbestandige hansker ved behov",
                "Opplæring i teknikk og ryddighet",
                "Vedlikehold av verktøy",
            ],
        ),
        HazardTemplate::new(
            "Sklirisiko (våte gulv/fett)",
            "Våte eller oljete gulv i kjøkken, oppvask og lager",
            &[
                "Absorber søl umiddelbart",
                "Skilt 'vått gulv'",
                "Sklisikre matter og fast renholdsrutine",
                "Sklisikre arbeidssko",
            ],
        ),
        HazardTemplate::new(
            "Allergenhåndtering",
            "Risiko for feil merking og krysskontaminering mellom matvarer",
            &[
                "HACCP-flyt",
                "Oppdatert allergenliste og opplæring",
                "Separate redskaper og områder",
                "Dobbelkontroll før servering",
            ],
        ),
    ]
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Checks that a parsed response has the report shape.
pub fn validate_payload(payload: &Value) -> Result<(), String> {
    let object = payload
        .as_object()
        .ok_or_else(|| "payload is not an object".to_string())?;

    if let Some(key) = REQUIRED_KEYS.iter().find(|key| !object.contains_key(**key)) {
        return Err(format!("missing key: {key}"));
    }

    let severity = object["severity"].as_str().unwrap_or_default();
    if Severity::from_label(severity).is_none() {
        return Err(format!("bad severity: {}", object["severity"]));
    }
    let status = object["status"].as_str().unwrap_or_default();
    if !STATUS_VALUES.contains(&status) {
        return Err(format!("bad status: {}", object["status"]));
    }

    let sections = object["sections"]
        .as_array()
        .filter(|sections| sections.len() >= MIN_SECTIONS)
        .ok_or_else(|| "sections too short".to_string())?;
    if let Some(table) = object.get("risk_table") {
        if !table.is_array() && !table.is_null() {
            return Err("risk_table is not a list".to_string());
        }
    }
    if !object["actions"].is_array() {
        return Err("actions is not a list".to_string());
    }

    let titles: Vec<String> = sections
        .iter()
        .map(|section| {
            section
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase()
        })
        .collect();
    for wanted in REQUIRED_SECTIONS {
        if !titles.iter().any(|title| title.contains(wanted)) {
            return Err(format!("missing section: {wanted}"));
        }
    }

    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => clean_text(text),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn clean_field(object: &mut serde_json::Map<String, Value>, key: &str) {
    let cleaned = object.get(key).map(cell_text).unwrap_or_default();
    object.insert(key.to_string(), Value::String(cleaned));
}

/// Normalises a validated payload: whitespace in sections and actions is
/// collapsed, table cells become strings, and the risk table gets a
/// three-column header (or a default table when it is missing).
pub fn post_process(mut payload: Value) -> Value {
    let severity = payload["severity"].as_str().unwrap_or("Middels").to_string();

    if let Some(sections) = payload["sections"].as_array_mut() {
        for section in sections.iter_mut().filter_map(Value::as_object_mut) {
            clean_field(section, "body");
        }
    }
    if let Some(actions) = payload["actions"].as_array_mut() {
        for action in actions.iter_mut().filter_map(Value::as_object_mut) {
            for key in ["tiltak", "ansvar", "frist", "status"] {
                clean_field(action, key);
            }
        }
    }

    let mut rows: Vec<Vec<String>> = payload["risk_table"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| match row.as_array() {
                    Some(cells) => cells.iter().map(cell_text).collect(),
                    None => vec![cell_text(row)],
                })
                .collect()
        })
        .unwrap_or_default();

    let header: Vec<String> = RISK_TABLE_HEADER.iter().map(|cell| cell.to_string()).collect();
    if rows.is_empty() {
        rows = vec![
            header,
            vec![
                severity,
                "Foreløpig vurdering".to_string(),
                "Oppfølging etter behov".to_string(),
            ],
        ];
    } else if rows[0].len() < 3 {
        rows[0] = header;
    }
    payload["risk_table"] = json!(rows);
    payload
}

/// Turns one raw completion into a report, or explains why it was rejected.
pub fn parse_response(content: &str, status: CaseStatus) -> Result<NarrativeReport, GenerationError> {
    let mut payload: Value = serde_json::from_str(content)?;
    validate_payload(&payload).map_err(GenerationError::Invalid)?;
    payload["status"] = Value::String(status.as_str().to_string());
    let report = serde_json::from_value(post_process(payload))?;
    Ok(report)
}

/// [`NarrativeSource`] that asks a [`CompletionClient`] for the report.
pub struct LlmNarrativeSource<C> {
    client: C,
    attempts: usize,
    retry_delay: Duration,
    status: CaseStatus,
    hazards: Vec<HazardTemplate>,
    excerpts: Vec<String>,
}

impl<C: CompletionClient> LlmNarrativeSource<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            status: CaseStatus::Open,
            hazards: default_hazards(),
            excerpts: Vec::new(),
        }
    }

    /// Sets the number of attempts; zero is treated as one.
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Status written into every accepted report, whatever the model said.
    pub fn with_status(mut self, status: CaseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_hazards(mut self, hazards: Vec<HazardTemplate>) -> Self {
        self.hazards = hazards;
        self
    }

    /// Document excerpts passed to the model as extra knowledge.
    pub fn with_excerpts(mut self, excerpts: Vec<String>) -> Self {
        self.excerpts = excerpts;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Builds the user message for `input`.
    pub fn user_prompt(&self, input: &NarrativeInput) -> String {
        let excerpts = if self.excerpts.is_empty() {
            "Ingen utdrag tilgjengelig.".to_string()
        } else {
            self.excerpts
                .iter()
                .map(|excerpt| excerpt.chars().take(1200).collect::<String>())
                .collect::<Vec<_>>()
                .join("\n---\n")
        };
        let hazards = self
            .hazards
            .iter()
            .map(HazardTemplate::context_line)
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Kategori: {category}
Notater (intern, ikke vis ordrett): {notes}

Kunnskap (utdrag):
{excerpts}

Restaurant-farer (lokal kunnskap):
{hazards}

Krav:
- Følg seksjonsrekkefølgen obligatorisk.
- Tiltaksplan med ansvar (rolle), frist (f.eks. +7 dager), status (Planlagt/Igangsatt/Ferdig).
- Risikovurdering praktisk og relatert til kjøkkendrift.
{JSON_INSTRUCTIONS}",
            category = input.category.trim(),
            notes = clean_text(&input.notes()),
        )
    }
}

impl<C: CompletionClient> NarrativeSource for LlmNarrativeSource<C> {
    fn name(&self) -> &str {
        "llm"
    }

    fn generate(&self, input: &NarrativeInput) -> Result<NarrativeReport, GenerationError> {
        let user = self.user_prompt(input);
        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            let outcome = self
                .client
                .complete(SYSTEM_PROMPT, &user)
                .and_then(|content| parse_response(&content, self.status));

            match outcome {
                Ok(report) => {
                    debug!("completion accepted on attempt {}", attempt);
                    return Ok(report);
                }
                Err(err) => {
                    warn!("completion attempt {}/{} rejected: {}", attempt, self.attempts, err);
                    last_error = err.to_string();
                    if attempt < self.attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        Err(GenerationError::Exhausted {
            attempts: self.attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    struct ScriptedClient {
        replies: RefCell<VecDeque<Result<String, GenerationError>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        fn complete(&self, _system: &str, _user: &str) -> Result<String, GenerationError> {
            *self.calls.borrow_mut() += 1;
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Client("no more replies".into())))
        }
    }

    fn valid_reply() -> String {
        json!({
            "title": "Hendelsesrapport – Glatt gulv",
            "severity": "Middels",
            "status": "closed",
            "sections": [
                {"title": "Sammendrag", "body": "Glatt   gulv\n ved oppvask."},
                {"title": "Observasjoner", "body": "Vann på gulvet."},
                {"title": "Årsaksanalyse (5 hvorfor)", "body": "Lekkasje."},
                {"title": "Risikovurdering", "body": "Middels."},
                {"title": "Tiltaksplan", "body": "Se tabell."},
                {"title": "Konklusjon", "body": "Følges opp."}
            ],
            "actions": [{"tiltak": "Tørk  opp", "ansvar": "Skiftleder", "frist": "Straks", "status": "Planlagt"}],
            "risk_table": [["Risiko", "Beskrivelse"], ["Middels", 3]]
        })
        .to_string()
    }

    fn source(client: ScriptedClient) -> LlmNarrativeSource<ScriptedClient> {
        LlmNarrativeSource::new(client).with_retry_delay(Duration::ZERO)
    }

    #[test]
    fn accepted_reply_is_cleaned_and_status_forced() {
        let source = source(ScriptedClient::new(vec![Ok(valid_reply())]));
        let report = source.generate(&NarrativeInput::default()).unwrap();
        assert_eq!(report.status, CaseStatus::Open);
        assert_eq!(report.sections[0].body, "Glatt gulv ved oppvask.");
        assert_eq!(report.actions[0].action, "Tørk opp");
        assert_eq!(report.risk_table[0], vec!["Risiko", "Beskrivelse", "Tiltak"]);
        assert_eq!(report.risk_table[1], vec!["Middels", "3"]);
    }

    #[test]
    fn invalid_reply_is_retried_once() {
        let source = source(ScriptedClient::new(vec![
            Ok("not json".to_string()),
            Ok(valid_reply()),
        ]));
        assert!(source.generate(&NarrativeInput::default()).is_ok());
        assert_eq!(*source.client().calls.borrow(), 2);
    }

    #[test]
    fn exhausted_attempts_report_last_error() {
        let mut bad_severity: Value = serde_json::from_str(&valid_reply()).unwrap();
        bad_severity["severity"] = json!("Kritisk");
        let source = source(ScriptedClient::new(vec![
            Ok("{}".to_string()),
            Ok(bad_severity.to_string()),
        ]));
        match source.generate(&NarrativeInput::default()) {
            Err(GenerationError::Exhausted { attempts, last_error }) => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("bad severity"), "{last_error}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn validation_requires_core_sections() {
        let mut payload: Value = serde_json::from_str(&valid_reply()).unwrap();
        payload["sections"].as_array_mut().unwrap().remove(5);
        assert_eq!(
            validate_payload(&payload),
            Err("missing section: konklusjon".to_string())
        );
        payload["sections"] = json!([{"title": "Sammendrag"}]);
        assert_eq!(validate_payload(&payload), Err("sections too short".to_string()));
        assert_eq!(
            validate_payload(&json!({"title": "x"})),
            Err("missing key: severity".to_string())
        );
    }

    #[test]
    fn missing_risk_table_gets_default() {
        let mut payload: Value = serde_json::from_str(&valid_reply()).unwrap();
        payload.as_object_mut().unwrap().remove("risk_table");
        let processed = post_process(payload);
        assert_eq!(
            processed["risk_table"],
            json!([["Risiko", "Beskrivelse", "Tiltak"], ["Middels", "Foreløpig vurdering", "Oppfølging etter behov"]])
        );
    }

    #[test]
    fn prompt_mentions_category_and_hazards() {
        let source = source(ScriptedClient::new(Vec::new()));
        let input = NarrativeInput {
            category: "risk".into(),
            location: "Kjøkken".into(),
            ..NarrativeInput::default()
        };
        let prompt = source.user_prompt(&input);
        assert!(prompt.starts_with("Kategori: risk\n"));
        assert!(prompt.contains("Sted: Kjøkken"));
        assert!(prompt.contains("Sklirisiko (våte gulv/fett)"));
        assert!(prompt.contains("Ingen utdrag tilgjengelig."));
    }
}
