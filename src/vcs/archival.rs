//! Version facts from exported archives
//!
//! `git archive` expands `$Format:...$` placeholders in `.git_archival.json`
//! when the file carries the `export-subst` attribute, and `hg archive`
//! writes `.hg_archival.txt`. Either file stands in for a repository when
//! the source tree was exported without VCS metadata.

use crate::domain::Pattern;
use crate::error::{Result, TagverError};
use crate::vcs::{pick_at_commit, CommitLength, FactSource, TagCandidate, TagLookup, TagMatch, Vcs};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const GIT_ARCHIVAL_FILE: &str = ".git_archival.json";
pub const HG_ARCHIVAL_FILE: &str = ".hg_archival.txt";

/// Result of looking for an archival file in a directory
#[derive(Debug)]
pub enum ArchivalLookup {
    Ready(ArchivalFacts),
    /// The file exists but was committed, not exported
    Unsubstituted(PathBuf),
    Absent,
}

/// Facts recorded at archive time; an archive is never dirty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchivalFacts {
    vcs: Option<Vcs>,
    /// Tags on the archived commit itself
    exact_tags: Vec<String>,
    /// Nearest tag and its distance when the commit is not tagged
    latest_tag: Option<(String, u64)>,
    commit_full: Option<String>,
    commit_short: Option<String>,
    branch: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GitArchival {
    #[serde(rename = "hash-full", default)]
    hash_full: Option<String>,
    #[serde(rename = "hash-short", default)]
    hash_short: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    refs: Option<String>,
    #[serde(default)]
    describe: Option<String>,
}

impl ArchivalFacts {
    /// Look for the archival file `vcs` writes in `dir`
    pub fn find(dir: &Path, vcs: Vcs) -> Result<ArchivalLookup> {
        let file = match vcs {
            Vcs::Git => dir.join(GIT_ARCHIVAL_FILE),
            Vcs::Mercurial => dir.join(HG_ARCHIVAL_FILE),
            _ => return Ok(ArchivalLookup::Absent),
        };
        if !file.is_file() {
            return Ok(ArchivalLookup::Absent);
        }

        tracing::debug!(file = %file.display(), "reading archival metadata");
        let content = fs::read_to_string(&file)?;
        let parsed = match vcs {
            Vcs::Git => ArchivalFacts::parse_git(&content)?,
            _ => Some(ArchivalFacts::parse_hg(&content)?),
        };

        Ok(match parsed {
            Some(facts) => ArchivalLookup::Ready(facts),
            None => ArchivalLookup::Unsubstituted(file),
        })
    }

    /// Parse `.git_archival.json`; `None` when placeholders were not expanded
    pub fn parse_git(content: &str) -> Result<Option<Self>> {
        let raw: GitArchival = serde_json::from_str(content)
            .map_err(|e| TagverError::archival(format!("{}: {}", GIT_ARCHIVAL_FILE, e)))?;

        let unexpanded = |field: &Option<String>| {
            field
                .as_deref()
                .map(|v| v.contains("$Format"))
                .unwrap_or(false)
        };
        if unexpanded(&raw.hash_full) || unexpanded(&raw.refs) || unexpanded(&raw.describe) {
            return Ok(None);
        }

        let non_empty = |field: Option<String>| field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut facts = ArchivalFacts {
            vcs: Some(Vcs::Git),
            commit_full: non_empty(raw.hash_full),
            commit_short: non_empty(raw.hash_short),
            timestamp: non_empty(raw.timestamp)
                .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                .map(|d| d.with_timezone(&Utc)),
            ..ArchivalFacts::default()
        };

        if let Some(refs) = non_empty(raw.refs) {
            for entry in refs.split(',').map(str::trim) {
                if let Some(tag) = entry.strip_prefix("tag: ") {
                    facts.exact_tags.push(tag.to_string());
                } else if let Some(branch) = entry.strip_prefix("HEAD -> ") {
                    facts.branch = Some(branch.to_string());
                }
            }
        }

        if let Some(describe) = non_empty(raw.describe) {
            facts.latest_tag = Some(parse_describe(&describe));
        }

        Ok(Some(facts))
    }

    /// Parse the `key: value` lines of `.hg_archival.txt`
    pub fn parse_hg(content: &str) -> Result<Self> {
        let fields: HashMap<&str, &str> = content
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        let node = fields
            .get("node")
            .map(|n| n.to_string())
            .ok_or_else(|| TagverError::archival(format!("{}: missing 'node'", HG_ARCHIVAL_FILE)))?;

        let mut facts = ArchivalFacts {
            vcs: Some(Vcs::Mercurial),
            commit_short: Some(node.chars().take(12).collect()),
            commit_full: Some(node),
            branch: fields.get("branch").map(|b| b.to_string()),
            ..ArchivalFacts::default()
        };

        if let Some(tag) = fields.get("tag") {
            facts.exact_tags.push(tag.to_string());
        }
        if let Some(tag) = fields.get("latesttag") {
            let distance = fields
                .get("latesttagdistance")
                .and_then(|d| d.parse::<u64>().ok())
                .unwrap_or(0);
            facts.latest_tag = Some((tag.to_string(), distance));
        }

        Ok(facts)
    }
}

/// Split `git describe` output into tag and distance
///
/// `v0.1.0-5-g644252b` -> (`v0.1.0`, 5); `v0.1.0` -> (`v0.1.0`, 0)
fn parse_describe(describe: &str) -> (String, u64) {
    static DESCRIBE: OnceLock<Regex> = OnceLock::new();
    let re = DESCRIBE.get_or_init(|| {
        Regex::new(r"^(?P<tag>.+)-(?P<distance>\d+)-g[0-9a-f]+$").expect("describe expression compiles")
    });

    match re.captures(describe) {
        Some(caps) => {
            let distance = caps["distance"].parse().unwrap_or(0);
            (caps["tag"].to_string(), distance)
        }
        None => (describe.to_string(), 0),
    }
}

impl FactSource for ArchivalFacts {
    fn vcs(&self) -> Vcs {
        self.vcs.unwrap_or(Vcs::Git)
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        let commit = self.commit_full.clone().unwrap_or_default();

        let exact: Vec<TagCandidate> = self
            .exact_tags
            .iter()
            .map(|t| TagCandidate::new(t.as_str(), None))
            .collect();
        if let Some(mut found) = pick_at_commit(&commit, exact, pattern) {
            found.distance = Some(0);
            return Ok(TagLookup::Found(found));
        }

        if let Some((tag, distance)) = &self.latest_tag {
            if let Ok(parsed) = pattern.extract(tag) {
                return Ok(TagLookup::Found(TagMatch {
                    name: tag.clone(),
                    commit: String::new(),
                    parsed,
                    distance: Some(*distance),
                    ambiguous_with: Vec::new(),
                }));
            }
        }

        let seen = self.exact_tags.len() + usize::from(self.latest_tag.is_some());
        let nearest = self
            .exact_tags
            .iter()
            .max()
            .cloned()
            .or_else(|| self.latest_tag.as_ref().map(|(t, _)| t.clone()));

        Ok(match nearest {
            Some(nearest) => TagLookup::Unmatched { nearest, seen },
            None => TagLookup::NoTags,
        })
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        // Archives record only the distance to their nearest tag.
        match (tag_commit, &self.latest_tag) {
            (Some(_), Some((_, distance))) => Ok(*distance),
            _ => Ok(0),
        }
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(false)
    }

    fn commit_id(&self, length: CommitLength) -> Result<Option<String>> {
        Ok(match length {
            CommitLength::Full => self.commit_full.clone(),
            CommitLength::Short => self.commit_short.clone().or_else(|| {
                self.commit_full
                    .as_ref()
                    .map(|full| full.chars().take(7).collect())
            }),
        })
    }

    fn branch(&self) -> Result<Option<String>> {
        Ok(self.branch.clone())
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GIT_EXPORTED: &str = r#"{
  "hash-full": "644252b0d5e0c6e3b0b5d2c2b1a0e9f8d7c6b5a4",
  "hash-short": "644252b",
  "timestamp": "2024-03-09T14:05:59+01:00",
  "refs": "HEAD -> main, origin/main",
  "describe": "v0.1.0rc5-44-g644252b"
}"#;

    const GIT_COMMITTED: &str = r#"{
  "hash-full": "$Format:%H$",
  "hash-short": "$Format:%h$",
  "timestamp": "$Format:%cI$",
  "refs": "$Format:%D$",
  "describe": "$Format:%(describe:tags=true,match=v[0-9]*)$"
}"#;

    #[test]
    fn test_git_exported() {
        let facts = ArchivalFacts::parse_git(GIT_EXPORTED).unwrap().unwrap();
        assert_eq!(facts.branch().unwrap().as_deref(), Some("main"));
        assert_eq!(
            facts.commit_id(CommitLength::Short).unwrap().as_deref(),
            Some("644252b")
        );
        assert_eq!(
            facts.timestamp().unwrap().unwrap().to_rfc3339(),
            "2024-03-09T13:05:59+00:00"
        );

        match facts.latest_matching_tag(&Pattern::default()).unwrap() {
            TagLookup::Found(found) => {
                assert_eq!(found.name, "v0.1.0rc5");
                assert_eq!(found.distance, Some(44));
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
        assert!(!facts.is_dirty().unwrap());
    }

    #[test]
    fn test_git_exact_tag_in_refs() {
        let content = r#"{"hash-full": "abc", "refs": "HEAD -> main, tag: v1.2.0, tag: nightly", "describe": "v1.2.0"}"#;
        let facts = ArchivalFacts::parse_git(content).unwrap().unwrap();
        match facts.latest_matching_tag(&Pattern::default()).unwrap() {
            TagLookup::Found(found) => {
                assert_eq!(found.name, "v1.2.0");
                assert_eq!(found.distance, Some(0));
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_git_committed_is_unsubstituted() {
        assert!(ArchivalFacts::parse_git(GIT_COMMITTED).unwrap().is_none());
    }

    #[test]
    fn test_git_invalid_json() {
        let err = ArchivalFacts::parse_git("not json").unwrap_err();
        assert!(matches!(err, TagverError::Archival(_)));
    }

    #[test]
    fn test_hg_archival() {
        let content = "repo: 0123\nnode: 644252b0d5e0c6e3b0b5d2c2b1a0e9f8d7c6b5a4\nbranch: default\nlatesttag: v0.1.0\nlatesttagdistance: 3\nchangessincelatesttag: 3\n";
        let facts = ArchivalFacts::parse_hg(content).unwrap();
        assert_eq!(facts.vcs(), Vcs::Mercurial);
        assert_eq!(
            facts.commit_id(CommitLength::Short).unwrap().as_deref(),
            Some("644252b0d5e0")
        );
        match facts.latest_matching_tag(&Pattern::default()).unwrap() {
            TagLookup::Found(found) => {
                assert_eq!(found.name, "v0.1.0");
                assert_eq!(found.distance, Some(3));
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_archival_tag() {
        let content = "node: abc\nlatesttag: release-1\nlatesttagdistance: 2\n";
        let facts = ArchivalFacts::parse_hg(content).unwrap();
        assert_eq!(
            facts.latest_matching_tag(&Pattern::default()).unwrap(),
            TagLookup::Unmatched {
                nearest: "release-1".to_string(),
                seen: 1
            }
        );
    }

    #[test]
    fn test_find_in_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ArchivalFacts::find(dir.path(), Vcs::Git).unwrap(),
            ArchivalLookup::Absent
        ));

        fs::write(dir.path().join(GIT_ARCHIVAL_FILE), GIT_COMMITTED).unwrap();
        assert!(matches!(
            ArchivalFacts::find(dir.path(), Vcs::Git).unwrap(),
            ArchivalLookup::Unsubstituted(_)
        ));

        fs::write(dir.path().join(GIT_ARCHIVAL_FILE), GIT_EXPORTED).unwrap();
        assert!(matches!(
            ArchivalFacts::find(dir.path(), Vcs::Git).unwrap(),
            ArchivalLookup::Ready(_)
        ));
    }

    #[test]
    fn test_describe_parsing() {
        assert_eq!(parse_describe("v0.1.0-5-g644252b"), ("v0.1.0".to_string(), 5));
        assert_eq!(parse_describe("v1.0-rc-1-2-gabc"), ("v1.0-rc-1".to_string(), 2));
        assert_eq!(parse_describe("v0.1.0"), ("v0.1.0".to_string(), 0));
    }
}
