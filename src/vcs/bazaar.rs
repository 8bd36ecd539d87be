use crate::domain::Pattern;
use crate::error::{Result, TagverError};
use crate::vcs::command::{lines, CommandRunner};
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Bazaar facts read through the `bzr` executable
///
/// Commit ids are mainline revision numbers; tags on merged revisions
/// (dotted revnos) are not part of the mainline and are skipped.
pub struct BazaarFacts {
    root: PathBuf,
}

impl BazaarFacts {
    pub fn new(root: &Path) -> Self {
        BazaarFacts {
            root: root.to_path_buf(),
        }
    }

    fn bzr(&self) -> CommandRunner<'_> {
        CommandRunner::new("bzr", &self.root)
    }

    fn revno(&self) -> Result<u64> {
        parse_revno(&self.bzr().run(&["revno"])?)
    }
}

fn parse_revno(output: &str) -> Result<u64> {
    output.parse().map_err(|_| {
        TagverError::command("bzr revno", format!("unexpected revno '{}'", output))
    })
}

/// Any `bzr status -S` entry other than an unknown file
fn status_is_dirty(output: &str) -> bool {
    lines(output).any(|line| !line.starts_with('?'))
}

/// Parse `bzr tags` into tags grouped by revno, highest first
fn parse_tags(output: &str, current: u64) -> Vec<(String, Vec<TagCandidate>)> {
    let mut by_revno: BTreeMap<u64, Vec<TagCandidate>> = BTreeMap::new();

    for line in lines(output) {
        let Some((name, revno)) = line.rsplit_once(char::is_whitespace) else {
            continue;
        };
        let Ok(revno) = revno.trim().parse::<u64>() else {
            continue;
        };
        if revno > current {
            continue;
        }
        by_revno
            .entry(revno)
            .or_default()
            .push(TagCandidate::new(name.trim(), None));
    }

    by_revno
        .into_iter()
        .rev()
        .map(|(revno, tags)| (revno.to_string(), tags))
        .collect()
}

impl FactSource for BazaarFacts {
    fn vcs(&self) -> Vcs {
        Vcs::Bazaar
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        let current = self.revno()?;
        if current == 0 {
            return Ok(TagLookup::NoTags);
        }
        let output = self.bzr().run(&["tags"])?;
        Ok(nearest_match(parse_tags(&output, current), pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        let current = self.revno()?;
        let tagged = match tag_commit {
            Some(revno) => parse_revno(revno)?,
            None => 0,
        };
        Ok(current.saturating_sub(tagged))
    }

    fn is_dirty(&self) -> Result<bool> {
        let output = self.bzr().run(&["status", "-S"])?;
        Ok(status_is_dirty(&output))
    }

    fn commit_id(&self, _length: CommitLength) -> Result<Option<String>> {
        let current = self.revno()?;
        Ok(Some(current.to_string()).filter(|_| current > 0))
    }

    fn branch(&self) -> Result<Option<String>> {
        let nick = self.bzr().run(&["nick"])?;
        Ok(Some(nick).filter(|n| !n.is_empty()))
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        if self.revno()? == 0 {
            return Ok(None);
        }
        let date = self
            .bzr()
            .run(&["version-info", "--custom", "--template={date}"])?;
        Ok(DateTime::parse_from_str(&date, "%Y-%m-%d %H:%M:%S %z")
            .ok()
            .map(|d| d.with_timezone(&Utc)))
    }
}
