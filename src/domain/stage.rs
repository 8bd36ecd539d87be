//! Pre-release stage handling
//!
//! A stage is a label such as `rc` or `beta` paired with a revision number.
//! The revision is never absent: a tag like `v1.0rc` is read as `rc` revision 0.

use std::fmt;

/// Pre-release stage with its revision
///
/// # Examples
/// - "rc5" -> Stage { label: "rc", revision: 5 }
/// - "beta" -> Stage { label: "beta", revision: 0 }
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stage {
    label: String,
    revision: u64,
}

impl Stage {
    /// Create a new stage
    pub fn new(label: impl Into<String>, revision: u64) -> Self {
        Stage {
            label: label.into(),
            revision,
        }
    }

    /// The stage label exactly as it appeared in the tag
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The stage revision
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Label in PEP 440 normal form
    ///
    /// `alpha` and `beta` shorten to `a` and `b`; `c`, `pre` and `preview`
    /// are spellings of `rc`. Anything else is only lowercased.
    pub fn pep440_label(&self) -> String {
        let lower = self.label.to_lowercase();
        match lower.as_str() {
            "alpha" => "a".to_string(),
            "beta" => "b".to_string(),
            "c" | "pre" | "preview" => "rc".to_string(),
            _ => lower,
        }
    }

    /// Whether the label marks a PEP 440 post-release (`post`)
    pub fn is_post(&self) -> bool {
        self.label.eq_ignore_ascii_case("post")
    }

    /// Whether the label marks a PEP 440 development release (`dev`)
    pub fn is_dev(&self) -> bool {
        self.label.eq_ignore_ascii_case("dev")
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.label, self.revision)
    }
}
