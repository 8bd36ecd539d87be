//! Tag patterns and the fields extracted from matching tags

use crate::domain::Stage;
use crate::error::{Result, TagverError};
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;

/// Expression behind the `default` preset: requires a `v` prefix
pub const DEFAULT_PATTERN: &str = r"^v((?P<epoch>\d+)!)?(?P<base>\d+(\.\d+)*)([-._]?((?P<stage>[a-zA-Z]+)[-._]?(?P<revision>\d+)?))?(\+(?P<tagged_metadata>.+))?$";

/// Expression behind the `default-unprefixed` preset: the `v` is optional
pub const DEFAULT_UNPREFIXED_PATTERN: &str = r"^v?((?P<epoch>\d+)!)?(?P<base>\d+(\.\d+)*)([-._]?((?P<stage>[a-zA-Z]+)[-._]?(?P<revision>\d+)?))?(\+(?P<tagged_metadata>.+))?$";

const DEFAULT_NAME: &str = "default";
const DEFAULT_UNPREFIXED_NAME: &str = "default-unprefixed";

/// Fields extracted from a tag that matched a [Pattern]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub base: String,
    pub stage: Option<Stage>,
    pub epoch: Option<u32>,
    pub tagged_metadata: Option<String>,
}

impl ParsedTag {
    /// A parsed tag with only a base
    pub fn new(base: impl Into<String>) -> Self {
        ParsedTag {
            base: base.into(),
            stage: None,
            epoch: None,
            tagged_metadata: None,
        }
    }

    /// Rebuild a tag string from these fields
    ///
    /// Example: prefix="v", base="1.2.3", stage=rc2 -> "v1.2.3rc2"
    pub fn to_tag(&self, prefix: &str) -> String {
        let mut out = String::from(prefix);
        if let Some(epoch) = self.epoch {
            out.push_str(&format!("{}!", epoch));
        }
        out.push_str(&self.base);
        if let Some(stage) = &self.stage {
            out.push_str(&stage.to_string());
        }
        if let Some(meta) = &self.tagged_metadata {
            out.push('+');
            out.push_str(meta);
        }
        out
    }
}

/// Compiled tag-matching expression
///
/// The expression must contain a named `base` group. The optional groups
/// `stage`, `revision`, `epoch` and `tagged_metadata` are read when present.
#[derive(Debug, Clone)]
pub struct Pattern {
    preset: Option<&'static str>,
    regex: Regex,
}

impl Pattern {
    /// The `default` preset (`v1.2.3`, `v1!2.0rc1+linux`)
    pub fn default_prefixed() -> Self {
        Pattern::preset(DEFAULT_NAME, DEFAULT_PATTERN)
    }

    /// The `default-unprefixed` preset (`1.2.3` or `v1.2.3`)
    pub fn default_unprefixed() -> Self {
        Pattern::preset(DEFAULT_UNPREFIXED_NAME, DEFAULT_UNPREFIXED_PATTERN)
    }

    fn preset(name: &'static str, expr: &str) -> Self {
        Pattern {
            preset: Some(name),
            regex: Regex::new(expr).expect("preset patterns are valid regexes"),
        }
    }

    /// Compile a custom expression
    pub fn custom(expr: &str) -> Result<Self> {
        let regex = Regex::new(expr).map_err(|e| TagverError::InvalidPattern {
            pattern: expr.to_string(),
            reason: e.to_string(),
        })?;

        if !regex.capture_names().flatten().any(|name| name == "base") {
            return Err(TagverError::InvalidPattern {
                pattern: expr.to_string(),
                reason: "Pattern must contain a named 'base' group".to_string(),
            });
        }

        Ok(Pattern {
            preset: None,
            regex,
        })
    }

    /// Regular expression source
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether `tag` matches this pattern
    pub fn is_match(&self, tag: &str) -> bool {
        self.extract(tag).is_ok()
    }

    /// Extract structured fields from `tag`
    pub fn extract(&self, tag: &str) -> Result<ParsedTag> {
        let mismatch = || TagverError::PatternMismatch {
            tag: Some(tag.to_string()),
            pattern: self.to_string(),
        };

        let captures = self.regex.captures(tag).ok_or_else(mismatch)?;

        let base = group(&captures, "base").ok_or_else(mismatch)?;

        let stage = match group(&captures, "stage") {
            Some(label) => {
                let revision = match group(&captures, "revision") {
                    Some(digits) => digits.parse::<u64>().map_err(|_| mismatch())?,
                    None => 0,
                };
                Some(Stage::new(label, revision))
            }
            None => None,
        };

        let epoch = match group(&captures, "epoch") {
            Some(digits) => Some(digits.parse::<u32>().map_err(|_| mismatch())?),
            None => None,
        };

        Ok(ParsedTag {
            base: base.to_string(),
            stage,
            epoch,
            tagged_metadata: group(&captures, "tagged_metadata").map(|s| s.to_string()),
        })
    }
}

fn group<'t>(captures: &Captures<'t>, name: &str) -> Option<&'t str> {
    captures
        .name(name)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::default_prefixed()
    }
}

impl FromStr for Pattern {
    type Err = TagverError;

    /// Accepts a preset name or a custom expression
    fn from_str(s: &str) -> Result<Self> {
        match s {
            DEFAULT_NAME => Ok(Pattern::default_prefixed()),
            DEFAULT_UNPREFIXED_NAME => Ok(Pattern::default_unprefixed()),
            custom => Pattern::custom(custom),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preset {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.regex.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern_plain() {
        let parsed = Pattern::default().extract("v0.1.0").unwrap();
        assert_eq!(parsed, ParsedTag::new("0.1.0"));
    }

    #[test]
    fn test_default_pattern_all_fields() {
        let parsed = Pattern::default().extract("v1!2.0.3rc4+linux.x86").unwrap();
        assert_eq!(parsed.base, "2.0.3");
        assert_eq!(parsed.stage, Some(Stage::new("rc", 4)));
        assert_eq!(parsed.epoch, Some(1));
        assert_eq!(parsed.tagged_metadata.as_deref(), Some("linux.x86"));
    }

    #[test]
    fn test_default_pattern_separated_stage() {
        let parsed = Pattern::default().extract("v1.2.3-beta.2").unwrap();
        assert_eq!(parsed.base, "1.2.3");
        assert_eq!(parsed.stage, Some(Stage::new("beta", 2)));
    }

    #[test]
    fn test_stage_without_revision_defaults_to_zero() {
        let parsed = Pattern::default().extract("v1.0rc").unwrap();
        assert_eq!(parsed.stage, Some(Stage::new("rc", 0)));
    }

    #[test]
    fn test_default_pattern_requires_prefix() {
        let err = Pattern::default().extract("0.1.0").unwrap_err();
        assert!(matches!(err, TagverError::PatternMismatch { .. }));
        assert!(!Pattern::default().is_match("release-1"));
    }

    #[test]
    fn test_unprefixed_pattern() {
        let pattern = Pattern::default_unprefixed();
        assert_eq!(pattern.extract("0.1.0").unwrap().base, "0.1.0");
        assert_eq!(pattern.extract("v0.1.0").unwrap().base, "0.1.0");
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = Pattern::custom(r"^release-(?P<base>\d+\.\d+)$").unwrap();
        assert_eq!(pattern.extract("release-3.4").unwrap().base, "3.4");
        assert!(pattern.extract("v3.4").is_err());
    }

    #[test]
    fn test_custom_pattern_without_base_group() {
        let err = Pattern::custom(r"^v(\d+)$").unwrap_err();
        assert!(matches!(err, TagverError::InvalidPattern { .. }));
    }

    #[test]
    fn test_custom_pattern_invalid_regex() {
        assert!(Pattern::custom(r"^v(?P<base>\d+").is_err());
    }

    #[test]
    fn test_from_str_presets() {
        assert_eq!("default".parse::<Pattern>().unwrap().to_string(), "default");
        assert_eq!(
            "default-unprefixed".parse::<Pattern>().unwrap().to_string(),
            "default-unprefixed"
        );
        let custom: Pattern = r"^(?P<base>\d+)$".parse().unwrap();
        assert_eq!(custom.to_string(), r"^(?P<base>\d+)$");
    }

    #[test]
    fn test_tag_round_trip() {
        let pattern = Pattern::default();
        for tag in ["v0.1.0", "v0.1.0rc5", "v2!1.0.0b3+build.7", "v1.2.3.4a0"] {
            let parsed = pattern.extract(tag).unwrap();
            let rebuilt = parsed.to_tag("v");
            let reparsed = pattern.extract(&rebuilt).unwrap();
            assert_eq!(parsed, reparsed, "round trip of {} via {}", tag, rebuilt);
        }
    }
}
