//! Version style grammars
//!
//! Each [Style] renders a [Version] in its own grammar and validates
//! arbitrary strings against that grammar:
//!
//! - **PEP 440**: `epoch!base[stage revision][.postN][.devN][+local]`
//! - **SemVer**: `base[-stage.revision][.post|pre.distance][+metadata]`
//! - **PVP**: dot separated identifiers only

use crate::domain::Version;
use crate::error::{Result, TagverError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const PEP440_BASE: &str = r"^(\d+!)?\d+(\.\d+)*";
const PEP440_FULL: &str =
    r"^(\d+!)?\d+(\.\d+)*((a|b|rc)\d+)?(\.post\d+)?(\.dev\d+)?(\+[a-zA-Z0-9]+(\.[a-zA-Z0-9]+)*)?$";

const MISSING_BASE: &str = "missing required base segment";
const LEADING_ZERO: &str = "leading zero in numeric identifier";

/// Supported version grammars
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    #[value(name = "pep440")]
    Pep440,
    #[value(name = "semver")]
    SemVer,
    #[value(name = "pvp")]
    Pvp,
}

/// Options recognized by [Version::serialize]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Grammar to render; PEP 440 when unset
    pub style: Option<Style>,
    /// `Some(true)` always appends the commit, `Some(false)` never does,
    /// `None` appends it only past the tag
    pub metadata: Option<bool>,
    /// Append `dirty` when the working tree has modifications
    pub dirty: bool,
    /// Custom template replacing style rendering
    pub format: Option<String>,
    /// Bump before rendering when past the tag
    pub bump: bool,
    /// Include metadata embedded in the tag itself
    pub tagged_metadata: bool,
}

impl Style {
    /// All styles, in the order they are listed to users
    pub const ALL: [Style; 3] = [Style::Pep440, Style::SemVer, Style::Pvp];

    /// Render `version` in this grammar without validating the result
    pub fn serialize(&self, version: &Version, options: &SerializeOptions) -> String {
        let metadata = metadata_parts(version, options);
        match self {
            Style::Pep440 => serialize_pep440(version, &metadata),
            Style::SemVer => serialize_semver(version, &metadata),
            Style::Pvp => serialize_pvp(version, &metadata),
        }
    }

    /// Check `version` against this grammar
    ///
    /// Accepts any string, not only ones produced by this crate.
    ///
    /// # Errors
    /// * [TagverError::NonConformantVersion] - With the reason the string was rejected
    pub fn validate(&self, version: &str) -> Result<()> {
        let outcome = match self {
            Style::Pep440 => validate_pep440(version),
            Style::SemVer => validate_semver(version),
            Style::Pvp => validate_pvp(version),
        };
        outcome.map_err(|reason| TagverError::non_conformant(version, self.to_string(), reason))
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Pep440 => write!(f, "PEP 440"),
            Style::SemVer => write!(f, "SemVer"),
            Style::Pvp => write!(f, "PVP"),
        }
    }
}

impl FromStr for Style {
    type Err = TagverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pep440" => Ok(Style::Pep440),
            "semver" => Ok(Style::SemVer),
            "pvp" => Ok(Style::Pvp),
            other => Err(TagverError::config(format!(
                "Unknown style '{}' (expected pep440, semver or pvp)",
                other
            ))),
        }
    }
}

fn metadata_parts(version: &Version, options: &SerializeOptions) -> Vec<String> {
    let mut parts = Vec::new();

    if options.tagged_metadata {
        if let Some(meta) = version.tagged_metadata() {
            parts.push(meta.to_string());
        }
    }

    let wants_commit = match options.metadata {
        Some(forced) => forced,
        None => version.distance() > 0,
    };
    if wants_commit {
        if let Some(commit) = version.commit() {
            parts.push(commit.to_string());
        }
    }

    if options.dirty && version.dirty() {
        parts.push("dirty".to_string());
    }

    parts
}

/// Stage and distance identifiers shared by SemVer and PVP
fn pre_parts(version: &Version) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(stage) = version.stage_info() {
        parts.push(stage.label().to_string());
        parts.push(stage.revision().to_string());
    }
    if version.is_bumped() {
        parts.push("pre".to_string());
        parts.push(version.distance().to_string());
    } else if version.distance() > 0 {
        parts.push("post".to_string());
        parts.push(version.distance().to_string());
    }
    parts
}

fn serialize_pep440(version: &Version, metadata: &[String]) -> String {
    let mut out = String::new();
    if let Some(epoch) = version.epoch() {
        out.push_str(&format!("{}!", epoch));
    }
    out.push_str(version.base());

    let mut post = None;
    let mut dev = None;
    match version.stage_info() {
        Some(stage) if stage.is_post() => post = Some(stage.revision()),
        Some(stage) if stage.is_dev() => dev = Some(stage.revision()),
        Some(stage) => {
            out.push_str(&stage.pep440_label());
            out.push_str(&stage.revision().to_string());
        }
        None => {}
    }

    let distance = version.distance();
    if version.is_bumped() {
        dev = Some(distance);
    } else if distance > 0 {
        match (post, dev) {
            (_, Some(d)) => dev = Some(d + distance),
            (Some(p), None) => {
                post = Some(p + distance);
                dev = Some(0);
            }
            (None, None) => {
                post = Some(distance);
                dev = Some(0);
            }
        }
    }

    if let Some(post) = post {
        out.push_str(&format!(".post{}", post));
    }
    if let Some(dev) = dev {
        out.push_str(&format!(".dev{}", dev));
    }
    if !metadata.is_empty() {
        out.push('+');
        out.push_str(&metadata.join("."));
    }
    out
}

fn serialize_semver(version: &Version, metadata: &[String]) -> String {
    let mut out = version.base().to_string();
    let pre = pre_parts(version);
    if !pre.is_empty() {
        out.push('-');
        out.push_str(&pre.join("."));
    }
    if !metadata.is_empty() {
        out.push('+');
        out.push_str(&metadata.join("."));
    }
    out
}

fn serialize_pvp(version: &Version, metadata: &[String]) -> String {
    let mut parts = vec![version.base().to_string()];
    parts.extend(pre_parts(version));
    parts.extend(metadata.iter().cloned());
    parts.join(".")
}

fn regex(cell: &'static OnceLock<Regex>, expr: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(expr).expect("style grammars are valid regexes"))
}

fn validate_pep440(version: &str) -> std::result::Result<(), String> {
    static BASE: OnceLock<Regex> = OnceLock::new();
    static FULL: OnceLock<Regex> = OnceLock::new();

    if !regex(&BASE, PEP440_BASE).is_match(version) {
        return Err(MISSING_BASE.to_string());
    }

    if let Some((_, local)) = version.split_once('+') {
        let valid_local = local
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
        if !valid_local {
            return Err(
                "local version label must be dot-separated alphanumeric identifiers".to_string(),
            );
        }
    }

    if !regex(&FULL, PEP440_FULL).is_match(version) {
        return Err("invalid pre-release, post-release or development segment".to_string());
    }

    Ok(())
}

fn has_leading_zero(identifier: &str) -> bool {
    identifier.len() > 1
        && identifier.starts_with('0')
        && identifier.bytes().all(|b| b.is_ascii_digit())
}

fn validate_semver(version: &str) -> std::result::Result<(), String> {
    let without_build = version.split_once('+').map_or(version, |(head, _)| head);
    let (core, pre) = match without_build.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (without_build, None),
    };

    if !core.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(MISSING_BASE.to_string());
    }

    let zero_padded = core.split('.').any(has_leading_zero)
        || pre.is_some_and(|pre| pre.split('.').any(has_leading_zero));
    if zero_padded {
        return Err(LEADING_ZERO.to_string());
    }

    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn validate_pvp(version: &str) -> std::result::Result<(), String> {
    if version.is_empty() {
        return Err(MISSING_BASE.to_string());
    }

    if let Some(c) = version.chars().find(|c| matches!(c, '-' | '+' | '!')) {
        return Err(format!("punctuation '{}' is not permitted", c));
    }

    if let Some(c) = version
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.')
    {
        return Err(format!("invalid character '{}'", c));
    }

    let identifiers: Vec<&str> = version.split('.').collect();
    if identifiers.iter().any(|part| part.is_empty()) {
        return Err("empty identifier".to_string());
    }

    if !identifiers[0].bytes().all(|b| b.is_ascii_digit()) {
        return Err(MISSING_BASE.to_string());
    }

    Ok(())
}
