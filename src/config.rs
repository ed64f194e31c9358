//! Runtime configuration read from environment variables.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::paths::{Category, UploadLayout};
use crate::scheduler::WeeklySchedule;

pub const DEFAULT_UPLOAD_ROOT: &str = "uploads";
pub const DEFAULT_LOGO_PATH: &str = "static/images/logo.png";
pub const DEFAULT_KNOWLEDGE_DIR: &str = "kb";

/// Settings shared by the CLI commands.
///
/// Font lookup is not part of it: [`crate::fonts`] reads `HMS_FONTS_DIR`
/// itself whenever a summary is rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct HmsConfig {
    pub upload_root: PathBuf,
    /// Logo drawn on reports; `None` when unset and the default file is missing.
    pub logo_path: Option<PathBuf>,
    /// Directory of `.txt` files offered to the language model as background.
    pub knowledge_dir: PathBuf,
    pub auto_reports_enabled: bool,
    pub schedule: WeeklySchedule,
    pub auto_report_categories: Vec<Category>,
    pub openai_api_key: Option<String>,
}

impl Default for HmsConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from(DEFAULT_UPLOAD_ROOT),
            logo_path: None,
            knowledge_dir: PathBuf::from(DEFAULT_KNOWLEDGE_DIR),
            auto_reports_enabled: false,
            schedule: WeeklySchedule::default(),
            auto_report_categories: Vec::new(),
            openai_api_key: None,
        }
    }
}

impl HmsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = WeeklySchedule::default();

        let logo_path = match value("HMS_LOGO_PATH") {
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_LOGO_PATH)).filter(|path| path.is_file()),
        };

        let schedule = WeeklySchedule::new(
            parse_number("HMS_AUTO_REPORTS_WEEKDAY", value("HMS_AUTO_REPORTS_WEEKDAY"), defaults.weekday())?,
            parse_number("HMS_AUTO_REPORTS_HOUR", value("HMS_AUTO_REPORTS_HOUR"), defaults.hour())?,
            parse_number("HMS_AUTO_REPORTS_MINUTE", value("HMS_AUTO_REPORTS_MINUTE"), defaults.minute())?,
        )?;

        Ok(Self {
            upload_root: value("HMS_UPLOAD_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_ROOT)),
            logo_path,
            knowledge_dir: value("HMS_KB_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KNOWLEDGE_DIR)),
            auto_reports_enabled: parse_flag(
                "HMS_AUTO_REPORTS_ENABLED",
                value("HMS_AUTO_REPORTS_ENABLED"),
            )?,
            schedule,
            auto_report_categories: value("HMS_AUTO_REPORTS_CATEGORIES")
                .map(|csv| Category::parse_list(&csv))
                .unwrap_or_default(),
            openai_api_key: value("OPENAI_API_KEY"),
        })
    }

    pub fn upload_layout(&self) -> UploadLayout {
        UploadLayout::new(&self.upload_root)
    }
}

fn parse_number(name: &'static str, value: Option<String>, default: u8) -> Result<u8, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|err: std::num::ParseIntError| ConfigError::Invalid {
            name,
            value,
            reason: err.to_string(),
        }),
    }
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some(_) => Err(ConfigError::Invalid {
            name,
            value: value.unwrap_or_default(),
            reason: "expected 1 or 0".to_string(),
        }),
    }
}
