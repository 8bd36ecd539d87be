use std::fmt;

/// Non-fatal conditions met while resolving a version.
/// These are returned alongside the result and should be reported to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Several matching tags point at the same commit and none can be
    /// ordered by creation time; `chosen` won the lexicographic tie-break
    AmbiguousTag {
        commit: String,
        chosen: String,
        candidates: Vec<String>,
    },
    /// Tags exist but none matches the configured pattern
    UnmatchedTags { pattern: String, seen: usize },
    /// An archival metadata file was found but never expanded by the VCS
    UnsubstitutedArchival { path: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::AmbiguousTag {
                commit,
                chosen,
                candidates,
            } => {
                let short_commit: String = commit.chars().take(7).collect();
                write!(
                    f,
                    "Commit {} carries several matching tags with no reliable order ({}); using '{}'",
                    short_commit,
                    candidates.join(", "),
                    chosen
                )
            }
            BoundaryWarning::UnmatchedTags { pattern, seen } => {
                write!(
                    f,
                    "None of the {} tag(s) found match pattern '{}'; falling back to 0.0.0",
                    seen, pattern
                )
            }
            BoundaryWarning::UnsubstitutedArchival { path } => {
                write!(
                    f,
                    "Ignoring archival file '{}': its placeholders were never substituted",
                    path
                )
            }
        }
    }
}
