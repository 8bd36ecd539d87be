use crate::domain::Pattern;
use crate::error::{Result, TagverError};
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, Utc};

/// In-memory facts for testing without a real repository
///
/// Commits are added oldest first; the last one added is the current commit.
#[derive(Debug, Clone)]
pub struct MockFacts {
    vcs: Vcs,
    commits: Vec<(String, Vec<TagCandidate>)>,
    dirty: bool,
    branch: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    failure: Option<String>,
}

impl MockFacts {
    /// Create an empty mock repository
    pub fn new(vcs: Vcs) -> Self {
        MockFacts {
            vcs,
            commits: Vec::new(),
            dirty: false,
            branch: None,
            timestamp: None,
            failure: None,
        }
    }

    /// Add a commit on top of the current one
    pub fn commit(mut self, id: impl Into<String>) -> Self {
        self.commits.push((id.into(), Vec::new()));
        self
    }

    /// Tag the current commit with a lightweight tag
    pub fn tag(self, name: impl Into<String>) -> Self {
        self.tag_at(name, None)
    }

    /// Tag the current commit, recording a creation time
    pub fn tag_at(mut self, name: impl Into<String>, created: Option<i64>) -> Self {
        if let Some((_, tags)) = self.commits.last_mut() {
            tags.push(TagCandidate::new(name, created));
        }
        self
    }

    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Make every query fail as if the VCS command had failed
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(reason) => Err(TagverError::command(
                format!("{} (mock)", self.vcs),
                reason.clone(),
            )),
            None => Ok(()),
        }
    }
}

impl FactSource for MockFacts {
    fn vcs(&self) -> Vcs {
        self.vcs
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        self.check()?;
        Ok(nearest_match(self.commits.iter().rev().cloned(), pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        self.check()?;
        let distance = match tag_commit {
            Some(commit) => self
                .commits
                .iter()
                .rev()
                .position(|(id, _)| id == commit)
                .unwrap_or(self.commits.len()),
            None => self.commits.len(),
        };
        Ok(distance as u64)
    }

    fn is_dirty(&self) -> Result<bool> {
        self.check()?;
        Ok(self.dirty)
    }

    fn commit_id(&self, length: CommitLength) -> Result<Option<String>> {
        self.check()?;
        Ok(self.commits.last().map(|(id, _)| match length {
            CommitLength::Full => id.clone(),
            CommitLength::Short => id.chars().take(7).collect(),
        }))
    }

    fn branch(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.branch.clone())
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.check()?;
        Ok(self.timestamp)
    }
}
