//! Freeform version validation
//!
//! Checks caller-supplied strings against a style grammar. No repository,
//! tag pattern or [crate::domain::Version] is involved.

use crate::domain::Style;
use crate::error::Result;

/// Check that `version` conforms to `style`
///
/// # Errors
/// * [crate::error::TagverError::NonConformantVersion] - With the reason for rejection
///
/// # Example
/// ```ignore
/// assert!(check("0.1.0", Style::SemVer).is_ok());
/// assert!(check("0.01.0", Style::SemVer).is_err());
/// ```
pub fn check(version: &str, style: Style) -> Result<()> {
    style.validate(version.trim_end_matches(['\r', '\n']))
}
