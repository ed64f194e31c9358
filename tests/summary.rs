mod common;

use std::fs;

use chrono::{NaiveDate, NaiveDateTime};
use hms_report::fonts;
use hms_report::paths::ReportKind;
use hms_report::scheduler::{self, SCHEDULER_AUTHOR};
use hms_report::summary::{self, CategorySnapshot, RecordEntry, SmartReportEntry};
use hms_report::{CaseStatus, Category, UploadLayout};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(hour, 30, 0)
        .unwrap()
}

fn snapshot() -> CategorySnapshot {
    let mut snapshot = CategorySnapshot::new(Category::Deviations);
    snapshot.total_records_all_categories = 42;
    snapshot.records = (1..=14)
        .map(|day| RecordEntry {
            title: format!("Avvik {day}"),
            status: match day % 3 {
                0 => CaseStatus::Closed,
                1 => CaseStatus::Open,
                _ => CaseStatus::Processing,
            },
            created_at: at(day, 9),
            created_by: Some("Kari".to_string()),
        })
        .collect();
    snapshot.smart_reports = vec![SmartReportEntry {
        title: "Hendelsesrapport – olje på gulv".to_string(),
        status: CaseStatus::Processing,
        created_at: at(3, 14),
    }];
    snapshot
}

fn fonts_missing() -> bool {
    if fonts::default_fonts_available() {
        return false;
    }
    eprintln!("Skipping summary render: no usable fonts found");
    true
}

#[test]
fn summary_render_is_deterministic_after_metadata_normalization() {
    if fonts_missing() {
        return;
    }

    let snapshot = snapshot();
    let first = summary::render_summary(&snapshot, at(20, 7), "Admin", None).unwrap();
    let second = summary::render_summary(&snapshot, at(20, 7), "Admin", None).unwrap();

    assert!(first.starts_with(b"%PDF"));
    let hash_a = common::normalized_hash(&first);
    let hash_b = common::normalized_hash(&second);
    assert_eq!(
        hash_a, hash_b,
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn category_summary_is_written_under_auto_reports() {
    if fonts_missing() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let layout = UploadLayout::new(dir.path());
    let logo = common::write_logo(dir.path());

    let path = summary::generate_category_summary(
        &layout,
        &snapshot(),
        at(20, 7),
        "Ola Nordmann",
        Some(&logo),
    )
    .unwrap();

    assert_eq!(path.parent(), Some(layout.report_dir(Category::Deviations, ReportKind::Auto).as_path()));
    assert!(path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.ends_with("_by_Ola_Nordmann.pdf")));
    assert!(common::page_count(&path) >= 1);
}

#[test]
fn scheduled_pass_skips_a_broken_snapshot() {
    if fonts_missing() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let layout = UploadLayout::new(dir.path());

    let broken = scheduler::snapshot_path(&layout, Category::Risk);
    fs::create_dir_all(broken.parent().unwrap()).unwrap();
    fs::write(&broken, "{ not json").unwrap();

    let good = scheduler::snapshot_path(&layout, Category::Deviations);
    fs::create_dir_all(good.parent().unwrap()).unwrap();
    fs::write(&good, serde_json::to_string(&snapshot()).unwrap()).unwrap();

    let report = scheduler::generate_summaries(
        &layout,
        &[Category::Risk, Category::Deviations, Category::Ppe],
        None,
    );

    assert_eq!(report.generated.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, Category::Risk);
    for path in &report.generated {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap();
        assert!(name.contains(&format!("_by_{SCHEDULER_AUTHOR}")));
        assert!(common::page_count(path) >= 1);
    }
}
