use crate::domain::Pattern;
use crate::error::Result;
use crate::vcs::command::{has_lines, lines, CommandRunner};
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};

/// Fossil facts read through the `fossil` executable
pub struct FossilFacts {
    root: PathBuf,
}

/// Ancestors of the checkout, newest first, with their tags
type Timeline = Vec<(String, Vec<TagCandidate>)>;

impl FossilFacts {
    pub fn new(root: &Path) -> Self {
        FossilFacts {
            root: root.to_path_buf(),
        }
    }

    fn fossil(&self) -> CommandRunner<'_> {
        CommandRunner::new("fossil", &self.root)
    }

    fn timeline(&self) -> Result<Timeline> {
        let output = self.fossil().run(&[
            "timeline",
            "ancestors",
            "current",
            "-t",
            "ci",
            "-n",
            "0",
            "-W",
            "0",
            "-F",
            "%H %t",
        ])?;
        Ok(parse_timeline(&output))
    }

    /// Hash and UTC date of the checkout from `fossil info`
    fn checkout(&self) -> Result<Option<(String, String)>> {
        let output = self.fossil().run(&["info"])?;
        Ok(parse_checkout(&output))
    }
}

fn is_hash(token: &str) -> bool {
    token.len() >= 40 && token.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_timeline(output: &str) -> Timeline {
    lines(output)
        .filter_map(|line| {
            let (hash, tags) = match line.split_once(' ') {
                Some((hash, tags)) => (hash, tags),
                None => (line, ""),
            };
            if !is_hash(hash) {
                return None;
            }
            let tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| TagCandidate::new(t, None))
                .collect();
            Some((hash.to_string(), tags))
        })
        .collect()
}

fn parse_checkout(info: &str) -> Option<(String, String)> {
    let line = lines(info).find(|l| l.starts_with("checkout:"))?;
    let mut fields = line.trim_start_matches("checkout:").split_whitespace();
    let hash = fields.next()?;
    let date = fields.next()?;
    let time = fields.next()?;
    if !is_hash(hash) {
        return None;
    }
    Some((hash.to_string(), format!("{} {}", date, time)))
}

impl FactSource for FossilFacts {
    fn vcs(&self) -> Vcs {
        Vcs::Fossil
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        Ok(nearest_match(self.timeline()?, pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        let timeline = self.timeline()?;
        let distance = match tag_commit {
            Some(hash) => timeline
                .iter()
                .position(|(h, _)| h == hash)
                .unwrap_or(timeline.len()),
            None => timeline.len(),
        };
        Ok(distance as u64)
    }

    fn is_dirty(&self) -> Result<bool> {
        let output = self.fossil().run(&["changes"])?;
        Ok(has_lines(&output))
    }

    fn commit_id(&self, length: CommitLength) -> Result<Option<String>> {
        Ok(self.checkout()?.map(|(hash, _)| match length {
            CommitLength::Full => hash,
            CommitLength::Short => hash.chars().take(10).collect(),
        }))
    }

    fn branch(&self) -> Result<Option<String>> {
        let branch = self.fossil().run(&["branch", "current"])?;
        Ok(Some(branch).filter(|b| !b.is_empty()))
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.checkout()?.and_then(|(_, date)| {
            NaiveDateTime::parse_from_str(&date, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|d| d.and_utc())
        }))
    }
}
