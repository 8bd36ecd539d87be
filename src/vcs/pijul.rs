use crate::domain::Pattern;
use crate::error::{Result, TagverError};
use crate::vcs::command::{has_lines, lines, CommandRunner};
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Pijul facts read through the `pijul` executable
///
/// Pijul tags name channel states. A tag is attached to the change whose
/// application produced that state.
pub struct PijulFacts {
    root: PathBuf,
}

/// One entry of `pijul log --output-format json --state`
#[derive(Debug, Clone, Deserialize)]
struct Change {
    hash: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// A tag from `pijul tag`
#[derive(Debug, Clone, PartialEq, Eq)]
struct StateTag {
    state: String,
    name: String,
    created: Option<i64>,
}

impl PijulFacts {
    pub fn new(root: &Path) -> Self {
        PijulFacts {
            root: root.to_path_buf(),
        }
    }

    fn pijul(&self) -> CommandRunner<'_> {
        CommandRunner::new("pijul", &self.root)
    }

    fn changes(&self) -> Result<Vec<Change>> {
        let output = self
            .pijul()
            .run(&["log", "--output-format", "json", "--state"])?;
        if output.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&output)
            .map_err(|e| TagverError::command("pijul log --output-format json", e.to_string()))
    }
}

/// Parse `pijul tag` blocks: a `State` line, headers, then an indented message
fn parse_tags(output: &str) -> Vec<StateTag> {
    let mut tags = Vec::new();
    let mut current: Option<StateTag> = None;

    for line in output.lines() {
        if let Some(state) = line.strip_prefix("State ") {
            tags.extend(current.take().filter(|t| !t.name.is_empty()));
            current = Some(StateTag {
                state: state.trim().to_string(),
                name: String::new(),
                created: None,
            });
        } else if let Some(tag) = current.as_mut() {
            if let Some(date) = line.strip_prefix("Date:") {
                tag.created = DateTime::parse_from_rfc3339(date.trim())
                    .ok()
                    .map(|d| d.timestamp());
            } else if line.starts_with(char::is_whitespace) && tag.name.is_empty() {
                tag.name = line.trim().to_string();
            }
        }
    }
    tags.extend(current.filter(|t| !t.name.is_empty()));
    tags
}

/// The channel marked `*` in `pijul channel` output
fn current_channel(output: &str) -> Option<String> {
    lines(output)
        .find_map(|l| l.strip_prefix("* "))
        .map(|c| c.trim().to_string())
}

impl FactSource for PijulFacts {
    fn vcs(&self) -> Vcs {
        Vcs::Pijul
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        let changes = self.changes()?;
        if changes.is_empty() {
            return Ok(TagLookup::NoTags);
        }
        let tags = parse_tags(&self.pijul().run(&["tag"])?);

        let history = changes.into_iter().map(|change| {
            let candidates = tags
                .iter()
                .filter(|t| change.state.as_deref() == Some(t.state.as_str()))
                .map(|t| TagCandidate::new(t.name.clone(), t.created))
                .collect();
            (change.hash, candidates)
        });
        Ok(nearest_match(history, pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        let changes = self.changes()?;
        let distance = match tag_commit {
            Some(hash) => changes
                .iter()
                .position(|c| c.hash == hash)
                .unwrap_or(changes.len()),
            None => changes.len(),
        };
        Ok(distance as u64)
    }

    fn is_dirty(&self) -> Result<bool> {
        let output = self.pijul().run(&["diff", "--short"])?;
        Ok(has_lines(&output))
    }

    fn commit_id(&self, length: CommitLength) -> Result<Option<String>> {
        Ok(self.changes()?.into_iter().next().map(|c| match length {
            CommitLength::Full => c.hash,
            CommitLength::Short => c.hash.chars().take(7).collect(),
        }))
    }

    fn branch(&self) -> Result<Option<String>> {
        let output = self.pijul().run(&["channel"])?;
        Ok(current_channel(&output))
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .changes()?
            .into_iter()
            .next()
            .and_then(|c| c.timestamp)
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
            .map(|d| d.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let output = "State AAAA\nAuthor: dev\nDate: 2024-01-02T03:04:05Z\n\n    v0.2.0\n\nState BBBB\nAuthor: dev\nDate: 2024-01-01T00:00:00Z\n\n    v0.1.0\n";
        let tags = parse_tags(output);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].state, "AAAA");
        assert_eq!(tags[0].name, "v0.2.0");
        assert_eq!(tags[0].created, Some(1704164645));
        assert_eq!(tags[1].name, "v0.1.0");
    }

    #[test]
    fn test_current_channel() {
        assert_eq!(current_channel("  feature\n* main\n"), Some("main".to_string()));
        assert_eq!(current_channel("  feature\n"), None);
        assert_eq!(current_channel(""), None);
    }

    #[test]
    fn test_change_json() {
        let json = r#"[{"hash":"H2","authors":[],"timestamp":"2024-01-02T03:04:05Z","message":"m","state":"S2"},{"hash":"H1","authors":[],"timestamp":"2024-01-01T00:00:00Z","message":"init"}]"#;
        let changes: Vec<Change> = serde_json::from_str(json).unwrap();
        assert_eq!(changes[0].state.as_deref(), Some("S2"));
        assert_eq!(changes[1].state, None);
    }
}
