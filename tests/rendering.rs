mod common;

use std::fs;

use hms_report::layout::{self, LayoutConfig, BODY_ROW_BACKGROUND, HEADER_ROW_BACKGROUND};
use hms_report::narrative::{self, risk, rules::RuleSet, NarrativeInput, Origin};
use hms_report::surface::{DrawOp, RecordingSurface};
use hms_report::{pdf, CaseStatus, ReportMetadata};

fn incident(body: &str) -> ReportMetadata {
    ReportMetadata::new("Avvik i lager")
        .with_status("under behandling")
        .with_category("deviations")
        .with_date("2024-05-02")
        .with_created_by("Kari")
        .with_body_text(body)
        .with_risk_rows(vec![
            vec!["Risiko", "Beskrivelse", "Tiltak"],
            vec!["Middels", "Olje på gulvet", "Absorbent og skilting"],
        ])
}

fn long_body(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|index| format!("Avsnitt {index}: observasjon registrert ved varemottaket."))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn render_creates_missing_directories_and_a_valid_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smart_reports").join("deviations").join("report.pdf");

    let summary = pdf::render(&path, &incident("Kort beskrivelse."), None).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(summary.pages, 1);
    assert_eq!(common::page_count(&path), 1);
    assert_eq!(summary.table_rows, 2);
    assert!(!summary.logo_drawn);
}

#[test]
fn long_body_spans_several_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.pdf");

    let summary = pdf::render(&path, &incident(&long_body(150)), None).unwrap();

    assert!(summary.pages >= 3, "expected at least 3 pages, got {}", summary.pages);
    assert_eq!(summary.body_lines, 150);
    assert_eq!(common::page_count(&path), summary.pages);
}

#[test]
fn empty_report_is_a_single_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.pdf");

    let summary = pdf::render(&path, &ReportMetadata::new(""), None).unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.body_lines, 0);
    assert_eq!(summary.table_rows, 0);
    assert_eq!(common::page_count(&path), 1);
}

#[test]
fn empty_report_draws_only_title_badge_and_metadata() {
    let metadata = ReportMetadata::new("Tomt avvik")
        .with_category("risk")
        .with_date("2024-05-02")
        .with_created_by("Kari");

    let mut surface = RecordingSurface::new();
    layout::render_report(&mut surface, &metadata, None, &LayoutConfig::default());

    assert_eq!(
        surface.texts(),
        vec![
            "Tomt avvik",
            "Åpen sak",
            "Kategori: risk",
            "Dato: 2024-05-02",
            "Opprettet av: Kari",
            "Språk: NO",
        ]
    );
    assert_eq!(surface.page_count(), 1);
    assert!(!surface
        .ops()
        .iter()
        .any(|op| matches!(op, DrawOp::FillRect { .. } | DrawOp::NewPage)));
}

#[test]
fn long_risk_table_breaks_between_whole_rows() {
    let config = LayoutConfig::default();
    let mut rows = vec![vec![
        "Risiko".to_string(),
        "Beskrivelse".to_string(),
        "Tiltak".to_string(),
    ]];
    let labels: Vec<String> = (1..=40).map(|index| format!("R{index:02}")).collect();
    for label in &labels {
        rows.push(vec![label.clone(), format!("Funn {label}"), "Følges opp".to_string()]);
    }
    // The body ends just above the table threshold of the first page, so only
    // the header row fits before the break.
    let metadata = ReportMetadata::new("Lang risikotabell")
        .with_body_text(long_body(26))
        .with_risk_rows(rows);

    let mut surface = RecordingSurface::new();
    let summary = layout::render_report(&mut surface, &metadata, None, &config);
    assert_eq!(summary.table_rows, 41);

    let texts = surface.texts();
    for label in &labels {
        let count = texts.iter().filter(|text| **text == label.as_str()).count();
        assert_eq!(count, 1, "{label} drawn {count} times");
    }

    let ops = surface.ops();
    let first_fill = ops
        .iter()
        .position(|op| matches!(op, DrawOp::FillRect { .. }))
        .unwrap();
    let mut breaks_in_table = 0;
    let mut after_break = false;
    let mut last_fill = None;
    for op in &ops[first_fill..] {
        match op {
            DrawOp::NewPage => {
                breaks_in_table += 1;
                after_break = true;
            }
            DrawOp::FillRect { page, rect, .. } => {
                assert!(
                    rect.y >= config.table_min_y - config.row_height - 1e-9,
                    "row bottom {} below the table threshold",
                    rect.y
                );
                if after_break {
                    assert!((rect.top() - config.page_top()).abs() < 1e-9);
                    after_break = false;
                }
                last_fill = Some((*page, *rect));
            }
            DrawOp::Text { page, text, y, .. } if labels.iter().any(|label| label == text) => {
                let (fill_page, rect) = last_fill.unwrap();
                assert_eq!(*page, fill_page, "{text} split from its row");
                assert!(*y > rect.y && *y < rect.top());
            }
            _ => {}
        }
    }
    assert!(breaks_in_table >= 1, "table never crossed a page");
    assert_eq!(summary.pages, surface.page_count());
}

fn win_ansi(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}')
        || "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ".contains(c)
}

#[test]
fn matrix_report_uses_only_builtin_font_glyphs() {
    let form = NarrativeInput {
        category: "environment".to_string(),
        location: "Bakgård".to_string(),
        likelihood: Some("Svært høy".to_string()),
        consequence: Some("Kritisk".to_string()),
        free_notes: "Oljesøl ved avfallscontainer".to_string(),
        ..NarrativeInput::default()
    };
    let metadata = risk::matrix_report(&form)
        .report
        .to_metadata("environment", "2024-05-02", "Kari");

    let mut surface = RecordingSurface::new();
    layout::render_report(&mut surface, &metadata, None, &LayoutConfig::default());

    let texts = surface.texts();
    assert!(texts.iter().any(|text| text.contains("Skår: 25 -> Nivå: Høy")));
    for text in texts {
        assert!(text.chars().all(win_ansi), "{text:?} has glyphs Helvetica cannot show");
    }
}

#[test]
fn table_rows_use_header_and_body_backgrounds() {
    let mut surface = RecordingSurface::new();
    layout::render_report(&mut surface, &incident("Tekst."), None, &LayoutConfig::default());

    let fills: Vec<_> = surface
        .ops()
        .iter()
        .filter_map(|op| match op {
            DrawOp::FillRect { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    assert_eq!(fills, vec![HEADER_ROW_BACKGROUND, BODY_ROW_BACKGROUND]);
}

#[test]
fn logo_is_drawn_when_it_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let logo = common::write_logo(dir.path());

    let mut surface = RecordingSurface::new();
    let summary = layout::render_report(
        &mut surface,
        &incident("Tekst."),
        Some(&logo),
        &LayoutConfig::default(),
    );

    assert!(summary.logo_drawn);
    assert!(surface.ops().iter().any(|op| matches!(
        op,
        DrawOp::Image { page: 0, pixels: (40, 20), .. }
    )));

    let path = dir.path().join("with_logo.pdf");
    let rendered = pdf::render(&path, &incident("Tekst."), Some(&logo)).unwrap();
    assert!(rendered.logo_drawn);
    assert_eq!(common::page_count(&path), 1);
}

#[test]
fn unreadable_logo_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("logo.png");
    fs::write(&logo, b"not an image").unwrap();

    let path = dir.path().join("report.pdf");
    let summary = pdf::render(&path, &incident("Tekst."), Some(&logo)).unwrap();

    assert!(!summary.logo_drawn);
    assert_eq!(common::page_count(&path), 1);
}

#[test]
fn layout_is_deterministic() {
    let metadata = incident(&long_body(80));
    let config = LayoutConfig::default();

    let mut first = RecordingSurface::new();
    let mut second = RecordingSurface::new();
    layout::render_report(&mut first, &metadata, None, &config);
    layout::render_report(&mut second, &metadata, None, &config);

    assert_eq!(first.ops(), second.ops());
}

#[test]
fn pdf_output_is_deterministic_after_metadata_normalization() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = incident(&long_body(60));
    let first = dir.path().join("a.pdf");
    let second = dir.path().join("b.pdf");

    pdf::render(&first, &metadata, None).unwrap();
    pdf::render(&second, &metadata, None).unwrap();

    let hash_a = common::normalized_hash(&fs::read(&first).unwrap());
    let hash_b = common::normalized_hash(&fs::read(&second).unwrap());
    assert_eq!(
        hash_a, hash_b,
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn electrical_incident_renders_the_override_report() {
    let form = NarrativeInput {
        category: "risk".to_string(),
        reporter: "Ola".to_string(),
        location: "Lager 2".to_string(),
        incident_type: "Eksponert ledning ved inngangen".to_string(),
        impact: "Fare for støt".to_string(),
        ..NarrativeInput::default()
    };

    let composed = narrative::compose_with_fallback(None, &form, &RuleSet::default());
    assert_eq!(composed.origin, Origin::Fallback);
    assert!(composed.applied_rule.is_some());

    let metadata = composed
        .report
        .to_metadata("risk", "2024-05-02", form.reporter());
    assert_eq!(metadata.status(), CaseStatus::Open);

    let mut surface = RecordingSurface::new();
    let summary =
        layout::render_report(&mut surface, &metadata, None, &LayoutConfig::default());
    let texts = surface.texts();

    assert!(texts.contains(&narrative::rules::ELECTRICAL_TITLE));
    assert!(texts.contains(&"Risikovurdering:"));
    assert!(summary.table_rows >= 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("electrical.pdf");
    let rendered = pdf::render(&path, &metadata, None).unwrap();
    assert_eq!(common::page_count(&path), rendered.pages);
}
