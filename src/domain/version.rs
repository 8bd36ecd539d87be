use crate::domain::format;
use crate::domain::style::{SerializeOptions, Style};
use crate::domain::{ParsedTag, Stage};
use crate::error::{Result, TagverError};
use chrono::{DateTime, Utc};
use std::borrow::Cow;

/// Base used when no tag matched
pub const UNTAGGED_BASE: &str = "0.0.0";

/// Repository facts that do not depend on any tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsFacts {
    pub commit_short: Option<String>,
    pub commit_full: Option<String>,
    /// Commits since the matched tag, or since the first commit when untagged
    pub distance: u64,
    pub dirty: bool,
    pub branch: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl VcsFacts {
    fn commit(&self, full: bool) -> Option<String> {
        if full {
            self.commit_full.clone().or_else(|| self.commit_short.clone())
        } else {
            self.commit_short.clone().or_else(|| self.commit_full.clone())
        }
    }
}

/// Version derived from a tag and the state of the repository
///
/// Values are immutable once built: [Version::bump] and the serializers
/// return new values instead of editing this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    base: String,
    stage: Option<Stage>,
    distance: u64,
    commit: Option<String>,
    dirty: bool,
    tagged_metadata: Option<String>,
    epoch: Option<u32>,
    branch: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    bumped: bool,
}

impl Version {
    /// Create a version at exactly `base`, with no distance and a clean tree
    ///
    /// # Errors
    /// * [TagverError::InvalidBase] - If `base` is not dot-separated numbers
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let base = base.into();
        if !is_dotted_numeric(&base) {
            return Err(TagverError::InvalidBase { base });
        }

        Ok(Version {
            base,
            stage: None,
            distance: 0,
            commit: None,
            dirty: false,
            tagged_metadata: None,
            epoch: None,
            branch: None,
            timestamp: None,
            bumped: false,
        })
    }

    /// Combine a matched tag with repository facts
    ///
    /// `full_commit` selects the full commit id over the short one.
    pub fn from_tag(tag: ParsedTag, facts: &VcsFacts, full_commit: bool) -> Result<Self> {
        let mut version = Version::new(tag.base)?.with_facts(facts, full_commit);
        version.stage = tag.stage;
        version.epoch = tag.epoch;
        version.tagged_metadata = tag.tagged_metadata;
        Ok(version)
    }

    /// Version for a repository where no tag matched
    ///
    /// The base is `0.0.0`; the facts' distance counts from the first commit.
    pub fn untagged(facts: &VcsFacts, full_commit: bool) -> Self {
        Version {
            base: UNTAGGED_BASE.to_string(),
            stage: None,
            distance: 0,
            commit: None,
            dirty: false,
            tagged_metadata: None,
            epoch: None,
            branch: None,
            timestamp: None,
            bumped: false,
        }
        .with_facts(facts, full_commit)
    }

    fn with_facts(mut self, facts: &VcsFacts, full_commit: bool) -> Self {
        self.distance = facts.distance;
        self.commit = facts.commit(full_commit);
        self.dirty = facts.dirty;
        self.branch = facts.branch.clone();
        self.timestamp = facts.timestamp;
        self
    }

    pub fn with_stage(mut self, label: impl Into<String>, revision: u64) -> Self {
        self.stage = Some(Stage::new(label, revision));
        self
    }

    pub fn with_distance(mut self, distance: u64) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    pub fn with_tagged_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.tagged_metadata = Some(metadata.into());
        self
    }

    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_ref().map(|s| s.label())
    }

    /// Present exactly when [Version::stage] is
    pub fn revision(&self) -> Option<u64> {
        self.stage.as_ref().map(|s| s.revision())
    }

    pub(crate) fn stage_info(&self) -> Option<&Stage> {
        self.stage.as_ref()
    }

    pub fn distance(&self) -> u64 {
        self.distance
    }

    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn tagged_metadata(&self) -> Option<&str> {
        self.tagged_metadata.as_deref()
    }

    pub fn epoch(&self) -> Option<u32> {
        self.epoch
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Whether the distance counts toward the base (pre-release) rather
    /// than past it (post-release)
    pub fn is_bumped(&self) -> bool {
        self.bumped
    }

    /// Bump to the next anticipated release
    ///
    /// Increments the last component of the base by one and reads the
    /// distance as progress toward that new base. The distance value itself
    /// is unchanged.
    ///
    /// # Example
    /// ```ignore
    /// let v = Version::new("0.1.0")?.with_distance(3);
    /// let bumped = v.bump();
    /// assert_eq!(bumped.base(), "0.1.1");
    /// assert_eq!(bumped.distance(), 3);
    /// ```
    pub fn bump(&self) -> Version {
        let mut parts: Vec<String> = self.base.split('.').map(|s| s.to_string()).collect();
        if let Some(last) = parts.last_mut() {
            *last = increment_decimal(last);
        }

        Version {
            base: parts.join("."),
            bumped: true,
            ..self.clone()
        }
    }

    /// Serialize under a style, or render a custom format
    ///
    /// With `options.bump` the version is bumped first, but only when it is
    /// past its tag: an exactly tagged commit already is that release.
    ///
    /// # Errors
    /// * [TagverError::NonConformantVersion] - If the output breaks the style grammar
    /// * [TagverError::Format] - If the custom format is malformed
    pub fn serialize(&self, options: &SerializeOptions) -> Result<String> {
        let version = if options.bump && self.distance > 0 && !self.bumped {
            Cow::Owned(self.bump())
        } else {
            Cow::Borrowed(self)
        };

        if let Some(template) = &options.format {
            let out = format::render(&version, template)?;
            if let Some(style) = options.style {
                style.validate(&out)?;
            }
            return Ok(out);
        }

        let style = options.style.unwrap_or(Style::Pep440);
        let out = style.serialize(&version, options);
        style.validate(&out)?;
        Ok(out)
    }
}

fn is_dotted_numeric(base: &str) -> bool {
    !base.is_empty()
        && base
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

/// Add one to a string of ASCII digits, keeping its width where possible
fn increment_decimal(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}
