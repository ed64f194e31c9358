//! Categories and the on-disk layout of generated reports.
//!
//! Every category owns a directory under the uploads root, with one
//! subdirectory per kind of generated report:
//!
//! ```text
//! <uploads>/<category>/smart_reports/smart_<category>_<id>.pdf
//! <uploads>/<category>/auto_reports/HMS_Rapport_<label>_<stamp>_by_<author>.pdf
//! <uploads>/<category>/manual_reports/...
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{CategoryError, RenderError};

/// HMS categories known to the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Reports,
    Deviations,
    Workers,
    Environment,
    Risk,
    Ppe,
    Emergency,
    Maintenance,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Reports,
        Category::Deviations,
        Category::Workers,
        Category::Environment,
        Category::Risk,
        Category::Ppe,
        Category::Emergency,
        Category::Maintenance,
    ];

    /// Code used in URLs, directory names and file names.
    pub fn code(self) -> &'static str {
        match self {
            Self::Reports => "reports",
            Self::Deviations => "deviations",
            Self::Workers => "workers",
            Self::Environment => "environment",
            Self::Risk => "risk",
            Self::Ppe => "ppe",
            Self::Emergency => "emergency",
            Self::Maintenance => "maintenance",
        }
    }

    /// Norwegian display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Reports => "Rapporter",
            Self::Deviations => "Avvik",
            Self::Workers => "Arbeidere",
            Self::Environment => "Miljø",
            Self::Risk => "Risiko",
            Self::Ppe => "Verneutstyr",
            Self::Emergency => "Beredskap",
            Self::Maintenance => "Vedlikehold",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, CategoryError> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.code() == code)
            .ok_or_else(|| CategoryError {
                code: code.to_string(),
                available: Self::ALL.map(Category::code).join(", "),
            })
    }

    /// Parses a comma separated list, silently dropping unknown codes and duplicates.
    pub fn parse_list(csv: &str) -> Vec<Category> {
        let mut categories = Vec::new();
        for category in csv.split(',').filter_map(|code| Self::from_code(code).ok()) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

/// Kind of generated document, each stored in its own subdirectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Scheduled category summaries.
    Auto,
    /// Reports composed from a narrative source.
    Smart,
    /// Reports generated from manually registered records.
    Manual,
}

impl ReportKind {
    pub fn directory_name(self) -> &'static str {
        match self {
            Self::Auto => "auto_reports",
            Self::Smart => "smart_reports",
            Self::Manual => "manual_reports",
        }
    }
}

/// Resolves report locations below an uploads root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadLayout {
    root: PathBuf,
}

impl UploadLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `kind` reports of `category`, without creating it.
    pub fn report_dir(&self, category: Category, kind: ReportKind) -> PathBuf {
        self.root.join(category.code()).join(kind.directory_name())
    }

    /// Creates (if needed) and returns the directory for `kind` reports of `category`.
    pub fn ensure_report_dir(
        &self,
        category: Category,
        kind: ReportKind,
    ) -> Result<PathBuf, RenderError> {
        let dir = self.report_dir(category, kind);
        fs::create_dir_all(&dir).map_err(|err| RenderError::io(&dir, err))?;
        Ok(dir)
    }

    /// Creates the category directories for every known category.
    pub fn ensure_all(&self) -> Result<(), RenderError> {
        for category in Category::ALL {
            let dir = self.root.join(category.code());
            fs::create_dir_all(&dir).map_err(|err| RenderError::io(&dir, err))?;
        }
        Ok(())
    }

    /// Path of the PDF for smart report `report_id`.
    pub fn smart_report_path(&self, category: Category, report_id: u64) -> PathBuf {
        self.report_dir(category, ReportKind::Smart)
            .join(smart_report_file_name(category, report_id))
    }

    /// Path of a category summary generated at `generated_at` by `created_by`.
    pub fn auto_report_path(
        &self,
        category: Category,
        generated_at: NaiveDateTime,
        created_by: &str,
    ) -> PathBuf {
        self.report_dir(category, ReportKind::Auto)
            .join(auto_report_file_name(category, generated_at, created_by))
    }

    /// Path relative to the uploads root, with forward slashes, as stored in the database.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect();
        Some(parts.join("/"))
    }
}

/// `smart_<category>_<id>.pdf`
pub fn smart_report_file_name(category: Category, report_id: u64) -> String {
    format!("smart_{}_{}.pdf", category.code(), report_id)
}

/// `HMS_Rapport_<label>_<YYYY-MM-DD_HH-MM>_by_<author>.pdf`
///
/// Spaces and path separators in the author become `_`, so the name is always
/// a single path component.
pub fn auto_report_file_name(
    category: Category,
    generated_at: NaiveDateTime,
    created_by: &str,
) -> String {
    format!(
        "HMS_Rapport_{}_{}_by_{}.pdf",
        category.label(),
        generated_at.format("%Y-%m-%d_%H-%M"),
        created_by
            .trim()
            .replace(|c: char| c == ' ' || c == '/' || c == '\\', "_")
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn smart_report_path_follows_naming_convention() {
        let layout = UploadLayout::new("/srv/uploads");
        assert_eq!(
            layout.smart_report_path(Category::Deviations, 42),
            PathBuf::from("/srv/uploads/deviations/smart_reports/smart_deviations_42.pdf")
        );
    }

    #[test]
    fn auto_report_name_includes_label_stamp_and_author() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        assert_eq!(
            auto_report_file_name(Category::Environment, at, "Auto Scheduler"),
            "HMS_Rapport_Miljø_2024-03-09_07-05_by_Auto_Scheduler.pdf"
        );
    }

    #[test]
    fn auto_report_path_stays_in_auto_reports() {
        let layout = UploadLayout::new("/srv/uploads");
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        for author in ["../x", "..\\x", "a/b\\c"] {
            let path = layout.auto_report_path(Category::Risk, at, author);
            assert_eq!(
                path.parent(),
                Some(layout.report_dir(Category::Risk, ReportKind::Auto).as_path()),
                "{author:?} escaped the report directory"
            );
        }
        assert_eq!(
            auto_report_file_name(Category::Risk, at, "../x"),
            "HMS_Rapport_Risiko_2024-03-09_07-05_by_.._x.pdf"
        );
    }

    #[test]
    fn parse_list_drops_unknown_and_duplicate_codes() {
        assert_eq!(
            Category::parse_list("risk, bogus,,ppe,risk"),
            vec![Category::Risk, Category::Ppe]
        );
    }

    #[test]
    fn unknown_category_lists_available_codes() {
        let err = Category::from_code("kitchen").unwrap_err();
        assert_eq!(err.code, "kitchen");
        assert!(err.available.contains("maintenance"));
    }

    #[test]
    fn ensure_report_dir_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = UploadLayout::new(dir.path());
        let created = layout
            .ensure_report_dir(Category::Ppe, ReportKind::Manual)
            .unwrap();
        assert!(created.is_dir());
        assert_eq!(
            layout.relative_path(&created.join("a.pdf")).as_deref(),
            Some("ppe/manual_reports/a.pdf")
        );
    }
}
