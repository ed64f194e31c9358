//! Font discovery for the flowing-layout summary reports.
//!
//! `genpdf` embeds TrueType fonts, so the category summaries need a font
//! family on disk.  The search order is:
//!
//! 1. `HMS_FONTS_DIR`
//! 2. `assets/fonts` next to the running binary
//! 3. `assets/fonts` in this crate
//!
//! Each candidate must contain the four Liberation Sans styles.  When none
//! does, the DejaVu Sans family shipped by most Linux distributions is used
//! (`HMS_SYSTEM_FONTS_DIR` overrides its location).  The single-report
//! renderer in [`crate::pdf`] uses the PDF built-in fonts and needs none of
//! this.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{self, FontData, FontFamily};
use log::warn;

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "LiberationSans";

const FONT_FILES: &[&str] = &[
    "LiberationSans-Regular.ttf",
    "LiberationSans-Bold.ttf",
    "LiberationSans-Italic.ttf",
    "LiberationSans-BoldItalic.ttf",
];

const SYSTEM_FALLBACK_FAMILY_NAME: &str = "DejaVu Sans";
const SYSTEM_FALLBACK_DIR: &str = "/usr/share/fonts/truetype/dejavu";

struct SystemFontFiles {
    regular: &'static str,
    bold: &'static str,
    italic: &'static str,
    bold_italic: &'static str,
}

const SYSTEM_FONT_FILES: SystemFontFiles = SystemFontFiles {
    regular: "DejaVuSans.ttf",
    bold: "DejaVuSans-Bold.ttf",
    italic: "DejaVuSans-Oblique.ttf",
    bold_italic: "DejaVuSans-BoldOblique.ttf",
};

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

/// Directory holding the fonts that ship with this crate.
pub fn bundled_fonts_source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env_path("HMS_FONTS_DIR") {
        candidates.push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = bundled_fonts_source_dir();
    if !candidates.contains(&manifest_candidate) {
        candidates.push(manifest_candidate);
    }

    candidates
}

fn missing_font_files(path: &Path) -> Vec<PathBuf> {
    FONT_FILES
        .iter()
        .map(|name| path.join(name))
        .filter(|candidate| !candidate.is_file())
        .collect()
}

fn resolve_font_directory() -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates() {
        let exists = candidate.is_dir();
        let missing = missing_font_files(&candidate);

        if exists && missing.is_empty() {
            return Ok(candidate);
        }

        let reason = if !exists {
            "directory missing".to_owned()
        } else {
            let missing_list = missing
                .iter()
                .map(|path| path.file_name().unwrap_or_default().to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ");
            format!("missing files [{}]", missing_list)
        };

        attempts.push(format!("{} ({})", candidate.display(), reason));
    }

    Err(Error::new(
        format!(
            "Unable to locate report fonts. Checked: {}. See assets/fonts/README.md or set HMS_FONTS_DIR.",
            attempts.join(", ")
        ),
        io::Error::new(io::ErrorKind::NotFound, "report fonts directory not found"),
    ))
}

fn load_bundled_font_family() -> Result<FontFamily<FontData>, Error> {
    let directory = resolve_font_directory()?;

    fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                DEFAULT_FONT_FAMILY_NAME,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

fn system_font_directory() -> PathBuf {
    env_path("HMS_SYSTEM_FONTS_DIR").unwrap_or_else(|| PathBuf::from(SYSTEM_FALLBACK_DIR))
}

fn load_system_font(directory: &Path, file: &str, style: &str) -> Result<FontData, Error> {
    let path = directory.join(file);
    FontData::load(&path, None).map_err(|err| {
        let io_kind = if path.is_file() {
            io::ErrorKind::Other
        } else {
            io::ErrorKind::NotFound
        };
        Error::new(
            format!(
                "Failed to load fallback {} font at {}: {}",
                style,
                path.display(),
                err
            ),
            io::Error::new(io_kind, err.to_string()),
        )
    })
}

fn system_fallback_font_family() -> Result<FontFamily<FontData>, Error> {
    let directory = system_font_directory();

    Ok(FontFamily {
        regular: load_system_font(&directory, SYSTEM_FONT_FILES.regular, "regular")?,
        bold: load_system_font(&directory, SYSTEM_FONT_FILES.bold, "bold")?,
        italic: load_system_font(&directory, SYSTEM_FONT_FILES.italic, "italic")?,
        bold_italic: load_system_font(&directory, SYSTEM_FONT_FILES.bold_italic, "bold italic")?,
    })
}

fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err)
            if io_err.kind() == io::ErrorKind::NotFound
                || io_err.kind() == io::ErrorKind::PermissionDenied
    )
}

/// Returns the Liberation Sans family if available and falls back to the
/// system DejaVu Sans family when it is missing.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    match load_bundled_font_family() {
        Ok(family) => Ok(family),
        Err(err) if fonts_missing(&err) => match system_fallback_font_family() {
            Ok(fallback) => {
                warn!(
                    "Report fonts unavailable ({}); falling back to '{}'.",
                    err, SYSTEM_FALLBACK_FAMILY_NAME
                );
                Ok(fallback)
            }
            Err(fallback_err) => Err(Error::new(
                format!(
                    "Report fonts unavailable ({}) and system fallback failed: {}",
                    err, fallback_err
                ),
                io::Error::new(io::ErrorKind::NotFound, "default fonts are not available"),
            )),
        },
        Err(err) => Err(err),
    }
}

/// Indicates whether any usable font family can be found.
pub fn default_fonts_available() -> bool {
    if resolve_font_directory().is_ok() {
        return true;
    }
    let directory = system_font_directory();
    [
        SYSTEM_FONT_FILES.regular,
        SYSTEM_FONT_FILES.bold,
        SYSTEM_FONT_FILES.italic,
        SYSTEM_FONT_FILES.bold_italic,
    ]
    .iter()
    .all(|file| directory.join(file).is_file())
}
