//! HMS incident reports: narrative generation and PDF rendering.
//!
//! The single-report path is [`narrative`] (turn a submitted form into a
//! [`narrative::NarrativeReport`]) followed by [`pdf::render`], which lays out
//! a [`model::ReportMetadata`] on A4 pages.  Category summaries are built
//! with `genpdf` in [`summary`] and can be produced weekly by
//! [`scheduler::AutoReportScheduler`].

pub mod builder;
pub mod config;
pub mod error;
pub mod fonts;
pub mod images;
pub mod layout;
pub mod model;
pub mod narrative;
pub mod paths;
pub mod pdf;
pub mod scheduler;
pub mod summary;
pub mod surface;

pub use config::HmsConfig;
pub use error::{CategoryError, ConfigError, GenerationError, RenderError, ScheduleError};
pub use layout::{LayoutConfig, LayoutSummary};
pub use model::{CaseStatus, ReportMetadata, Severity};
pub use paths::{Category, UploadLayout};
