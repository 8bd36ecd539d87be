//! Pure formatting functions for UI output.
//!
//! Messages are built as strings first so they can be tested; the
//! `display_*` functions only print them.

use crate::boundary::BoundaryWarning;
use crate::error::TagverError;
use console::style;

/// Error line: red `ERROR:` prefix.
pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red().bold(), message)
}

/// Warning line: yellow `WARNING:` prefix.
pub fn format_warning(warning: &BoundaryWarning) -> String {
    format!("{} {}", style("⚠ WARNING:").yellow(), warning)
}

/// Hint shown under an error, when there is something the user can do.
pub fn error_hint(err: &TagverError) -> Option<&'static str> {
    match err {
        TagverError::NoVcsFound { .. } => {
            Some("Run inside a working copy, pass --path, or export an archive with archival metadata")
        }
        TagverError::PatternMismatch { .. } => {
            Some("Use --pattern default-unprefixed or a custom expression with a (?P<base>...) group")
        }
        TagverError::VcsCommandFailure { .. } => {
            Some("Check that the VCS executable is installed and the working copy is readable")
        }
        _ => None,
    }
}

/// Print an error message in red to stderr.
pub fn display_error(message: &str) {
    eprintln!("{}", format_error(message));
}

/// Print a boundary warning to stderr.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{}", format_warning(warning));
}

/// Print a resolved version to stdout, unstyled so it can be captured.
pub fn display_version(version: &str) {
    println!("{}", version);
}

/// Print a dimmed hint line to stderr.
pub fn display_hint(hint: &str) {
    eprintln!("  {}", style(hint).dim());
}
