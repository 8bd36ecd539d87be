use crate::domain::Pattern;
use crate::error::{Result, TagverError};
use crate::vcs::command::{has_lines, lines, CommandRunner};
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Subversion facts read through the `svn` executable
///
/// Tags are the directories under `<repository root>/tags`, each attributed
/// to the revision that created it. Commit ids are revision numbers.
pub struct SubversionFacts {
    root: PathBuf,
}

impl SubversionFacts {
    pub fn new(root: &Path) -> Self {
        SubversionFacts {
            root: root.to_path_buf(),
        }
    }

    fn svn(&self) -> CommandRunner<'_> {
        CommandRunner::new("svn", &self.root)
    }

    fn info(&self, item: &str) -> Result<String> {
        self.svn().run(&["info", "--show-item", item])
    }

    fn revision(&self) -> Result<u64> {
        parse_revision(&self.info("revision")?)
    }

    fn commits_between(&self, from: u64, to: u64) -> Result<u64> {
        if from > to {
            return Ok(0);
        }
        let range = format!("{}:{}", from, to);
        let output = self.svn().run(&["log", "-q", "-r", &range])?;
        let count = lines(&output).filter(|l| is_log_header(l)).count();
        Ok(count as u64)
    }
}

/// Parse a revision number; an empty working copy reports no revision
fn parse_revision(output: &str) -> Result<u64> {
    if output.is_empty() {
        return Ok(0);
    }
    output.parse().map_err(|_| {
        TagverError::command(
            "svn info --show-item revision",
            format!("unexpected revision '{}'", output),
        )
    })
}

/// Whether `err` reports a path missing from the repository
fn is_missing_path(err: &TagverError) -> bool {
    match err {
        TagverError::VcsCommandFailure { reason, .. } => MISSING_PATH_CODES
            .iter()
            .any(|code| reason.contains(code)),
        _ => false,
    }
}

const MISSING_PATH_CODES: [&str; 3] = ["E200009", "W160013", "E170000"];

fn is_log_header(line: &str) -> bool {
    line.strip_prefix('r')
        .and_then(|rest| rest.split_whitespace().next())
        .map(|rev| rev.chars().all(|c| c.is_ascii_digit()) && !rev.is_empty())
        .unwrap_or(false)
}

/// Parse `svn ls -v` into tags grouped by revision, highest first,
/// keeping revisions up to `current`
fn parse_tags(output: &str, current: u64) -> Vec<(String, Vec<TagCandidate>)> {
    let mut by_revision: BTreeMap<u64, Vec<TagCandidate>> = BTreeMap::new();

    for line in lines(output) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (Some(rev), Some(name)) = (fields.first(), fields.last()) else {
            continue;
        };
        let Ok(rev) = rev.parse::<u64>() else {
            continue;
        };
        let name = name.trim_end_matches('/');
        if name == "." || name.is_empty() || rev > current {
            continue;
        }
        by_revision
            .entry(rev)
            .or_default()
            .push(TagCandidate::new(name, None));
    }

    by_revision
        .into_iter()
        .rev()
        .map(|(rev, tags)| (rev.to_string(), tags))
        .collect()
}

impl FactSource for SubversionFacts {
    fn vcs(&self) -> Vcs {
        Vcs::Subversion
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        let current = self.revision()?;
        if current == 0 {
            return Ok(TagLookup::NoTags);
        }
        let root = self.info("repos-root-url")?;
        let tags_url = format!("{}/tags", root);
        let listing = match self.svn().run(&["ls", "-v", &tags_url]) {
            Ok(listing) => listing,
            Err(e) if is_missing_path(&e) => {
                tracing::debug!(error = %e, "no tags directory");
                return Ok(TagLookup::NoTags);
            }
            Err(e) => return Err(e),
        };
        Ok(nearest_match(parse_tags(&listing, current), pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        let current = self.revision()?;
        if current == 0 {
            return Ok(0);
        }
        let from = match tag_commit {
            Some(rev) => parse_revision(rev)? + 1,
            None => 1,
        };
        self.commits_between(from, current)
    }

    fn is_dirty(&self) -> Result<bool> {
        let output = self.svn().run(&["status", "-q"])?;
        Ok(has_lines(&output))
    }

    fn commit_id(&self, _length: CommitLength) -> Result<Option<String>> {
        let current = self.revision()?;
        Ok(Some(current.to_string()).filter(|_| current > 0))
    }

    fn branch(&self) -> Result<Option<String>> {
        let relative = self.info("relative-url")?;
        let branch = relative.trim_start_matches("^/").to_string();
        Ok(Some(branch).filter(|b| !b.is_empty()))
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        if self.revision()? == 0 {
            return Ok(None);
        }
        let date = self.info("last-changed-date")?;
        Ok(DateTime::parse_from_rfc3339(&date)
            .ok()
            .map(|d| d.with_timezone(&Utc)))
    }
}
