//! Custom format templates
//!
//! Templates substitute `{name}` placeholders with version fields. Every
//! placeholder is always replaced: zero distance renders as `0`, the dirty
//! flag as `clean` or `dirty`, and absent fields as an empty string. Use
//! `{{` and `}}` for literal braces.
//!
//! `{base}` is only the dotted numeric release, so a pre-release tag renders
//! its stage through `{stage}{revision}`: `v{base}{stage}{revision}` turns
//! `v0.1.0rc5` back into `v0.1.0rc5`.

use crate::domain::Version;
use crate::error::{Result, TagverError};

/// Placeholder names accepted in templates
pub const PLACEHOLDERS: [&str; 11] = [
    "base",
    "stage",
    "revision",
    "distance",
    "commit",
    "dirty",
    "tagged_metadata",
    "epoch",
    "branch",
    "branch_escaped",
    "timestamp",
];

/// Render `template` with the fields of `version`
///
/// # Example
/// ```ignore
/// let v = Version::new("0.2.0")?.with_distance(7).with_commit("g29045e8");
/// assert_eq!(render(&v, "v{base}+{distance}.{commit}")?, "v0.2.0+7.g29045e8");
/// ```
pub fn render(version: &Version, template: &str) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(TagverError::format(format!(
                                "Unterminated placeholder '{{{}' in '{}'",
                                name, template
                            )))
                        }
                    }
                }
                out.push_str(&placeholder(version, &name)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(TagverError::format(format!(
                    "Unbalanced '}}' in '{}'",
                    template
                )))
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn placeholder(version: &Version, name: &str) -> Result<String> {
    let value = match name {
        "base" => version.base().to_string(),
        "stage" => version.stage().unwrap_or_default().to_string(),
        "revision" => version.revision().map(|r| r.to_string()).unwrap_or_default(),
        "distance" => version.distance().to_string(),
        "commit" => version.commit().unwrap_or_default().to_string(),
        "dirty" => (if version.dirty() { "dirty" } else { "clean" }).to_string(),
        "tagged_metadata" => version.tagged_metadata().unwrap_or_default().to_string(),
        "epoch" => version.epoch().map(|e| e.to_string()).unwrap_or_default(),
        "branch" => version.branch().unwrap_or_default().to_string(),
        "branch_escaped" => escape_branch(version.branch().unwrap_or_default()),
        "timestamp" => version
            .timestamp()
            .map(|t| t.format("%Y%m%d%H%M%S").to_string())
            .unwrap_or_default(),
        unknown => {
            return Err(TagverError::format(format!(
                "Unknown placeholder '{{{}}}' (expected one of: {})",
                unknown,
                PLACEHOLDERS.join(", ")
            )))
        }
    };
    Ok(value)
}

/// Branch name with everything outside `[A-Za-z0-9]` removed
pub fn escape_branch(branch: &str) -> String {
    branch.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
