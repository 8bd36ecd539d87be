//! Version control fact providers
//!
//! Each supported VCS has a backend implementing [FactSource], the narrow
//! contract the resolver consumes: the nearest matching tag, the distance
//! from it, the dirty flag, the commit id, the branch and the commit time.
//!
//! # Overview
//!
//! - [git::GitFacts]: reads the repository in-process with `git2`
//! - [mercurial::MercurialFacts], [subversion::SubversionFacts],
//!   [bazaar::BazaarFacts], [fossil::FossilFacts], [darcs::DarcsFacts],
//!   [pijul::PijulFacts]: invoke the VCS executable
//! - [archival::ArchivalFacts]: pre-baked metadata from an exported archive
//! - [mock::MockFacts]: in-memory facts for tests
//!
//! [detect] walks from a directory up through its ancestors and opens the
//! first backend whose marker it finds, trying backends in
//! [Vcs::DETECTION_ORDER] within each directory.

pub mod archival;
pub mod bazaar;
pub(crate) mod command;
pub mod darcs;
pub mod fossil;
pub mod git;
pub mod mercurial;
pub mod mock;
pub mod pijul;
pub mod subversion;

pub use archival::ArchivalFacts;
pub use git::GitFacts;
pub use mock::MockFacts;

use crate::boundary::BoundaryWarning;
use crate::domain::{ParsedTag, Pattern};
use crate::error::{Result, TagverError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported version control systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vcs {
    Git,
    #[serde(rename = "hg")]
    Mercurial,
    Darcs,
    #[serde(rename = "svn")]
    Subversion,
    #[serde(rename = "bzr")]
    Bazaar,
    Fossil,
    Pijul,
}

impl Vcs {
    /// Priority used when several markers exist in the same directory
    pub const DETECTION_ORDER: [Vcs; 7] = [
        Vcs::Git,
        Vcs::Mercurial,
        Vcs::Darcs,
        Vcs::Subversion,
        Vcs::Bazaar,
        Vcs::Fossil,
        Vcs::Pijul,
    ];

    /// Short name used on the command line and in configuration
    pub fn name(&self) -> &'static str {
        match self {
            Vcs::Git => "git",
            Vcs::Mercurial => "hg",
            Vcs::Darcs => "darcs",
            Vcs::Subversion => "svn",
            Vcs::Bazaar => "bzr",
            Vcs::Fossil => "fossil",
            Vcs::Pijul => "pijul",
        }
    }

    /// Entries whose presence marks a working copy root
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            Vcs::Git => &[".git"],
            Vcs::Mercurial => &[".hg"],
            Vcs::Darcs => &["_darcs"],
            Vcs::Subversion => &[".svn"],
            Vcs::Bazaar => &[".bzr"],
            Vcs::Fossil => &[".fslckout", "_FOSSIL_"],
            Vcs::Pijul => &[".pijul"],
        }
    }

    /// Whether `dir` contains one of this backend's markers
    pub fn is_root(&self, dir: &Path) -> bool {
        self.markers().iter().any(|marker| dir.join(marker).exists())
    }

    /// Open the backend rooted at `root`
    ///
    /// # Errors
    /// * [TagverError::NoVcsFound] - If `root` is not a working copy of this VCS
    pub fn open(&self, root: &Path, options: &OpenOptions) -> Result<Box<dyn FactSource>> {
        tracing::debug!(vcs = self.name(), root = %root.display(), "opening backend");
        let source: Box<dyn FactSource> = match self {
            Vcs::Git => Box::new(git::GitFacts::open(root, options.tag_branch.clone())?),
            Vcs::Mercurial => Box::new(mercurial::MercurialFacts::new(root)),
            Vcs::Darcs => Box::new(darcs::DarcsFacts::new(root)),
            Vcs::Subversion => Box::new(subversion::SubversionFacts::new(root)),
            Vcs::Bazaar => Box::new(bazaar::BazaarFacts::new(root)),
            Vcs::Fossil => Box::new(fossil::FossilFacts::new(root)),
            Vcs::Pijul => Box::new(pijul::PijulFacts::new(root)),
        };
        Ok(source)
    }
}

impl fmt::Display for Vcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Vcs {
    type Err = TagverError;

    fn from_str(s: &str) -> Result<Self> {
        Vcs::DETECTION_ORDER
            .into_iter()
            .find(|vcs| vcs.name() == s)
            .ok_or_else(|| TagverError::config(format!("Unknown VCS '{}'", s)))
    }
}

/// Commit id length requested from a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitLength {
    Short,
    Full,
}

/// Options applied when opening a backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Resolve from this branch or ref instead of the checked-out commit (git)
    pub tag_branch: Option<String>,
}

/// A tag chosen as the version source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub name: String,
    /// Backend id of the tagged commit
    pub commit: String,
    pub parsed: ParsedTag,
    /// Distance when the backend already knows it (archives)
    pub distance: Option<u64>,
    /// Every matching tag on the commit when no reliable order exists
    /// between them; empty otherwise
    pub ambiguous_with: Vec<String>,
}

/// Outcome of looking for the nearest matching tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagLookup {
    Found(TagMatch),
    /// Tags exist in the history but none matches; `nearest` is the closest
    Unmatched { nearest: String, seen: usize },
    NoTags,
}

/// Facts a backend provides about the current state of a repository
///
/// ## Implementations
///
/// One per [Vcs] variant, plus [ArchivalFacts] and [MockFacts].
pub trait FactSource {
    /// Which VCS the facts come from
    fn vcs(&self) -> Vcs;

    /// Nearest tag in the history of the current commit matching `pattern`
    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup>;

    /// Commits between `tag_commit` and the current commit, or all commits
    /// up to the current one when `tag_commit` is `None`
    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64>;

    /// Whether tracked files have uncommitted modifications
    fn is_dirty(&self) -> Result<bool>;

    /// Current commit id; `None` before the first commit
    fn commit_id(&self, length: CommitLength) -> Result<Option<String>>;

    /// Current branch; `None` when detached or not applicable
    fn branch(&self) -> Result<Option<String>>;

    /// Commit time of the current commit
    fn timestamp(&self) -> Result<Option<DateTime<Utc>>>;
}

/// A tag name together with its creation time when the backend records one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCandidate {
    pub name: String,
    /// Seconds since the epoch; `None` for tags without a creation record
    pub created: Option<i64>,
}

impl TagCandidate {
    pub fn new(name: impl Into<String>, created: Option<i64>) -> Self {
        TagCandidate {
            name: name.into(),
            created,
        }
    }
}

/// Pick the tag to use among those on a single commit
///
/// Tags with a creation time win over tags without one, newest first.
/// Remaining ties go to the lexicographically greatest name and are
/// reported through [TagMatch::ambiguous_with].
pub fn pick_at_commit(
    commit: &str,
    candidates: Vec<TagCandidate>,
    pattern: &Pattern,
) -> Option<TagMatch> {
    let mut matching: Vec<(TagCandidate, ParsedTag)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let parsed = pattern.extract(&candidate.name).ok()?;
            Some((candidate, parsed))
        })
        .collect();

    // Option<i64> orders None first, so the newest dated tag sorts last.
    matching.sort_by(|(a, _), (b, _)| a.created.cmp(&b.created).then(a.name.cmp(&b.name)));

    let (best, parsed) = matching.pop()?;
    let mut tied: Vec<String> = matching
        .iter()
        .filter(|(other, _)| other.created == best.created)
        .map(|(other, _)| other.name.clone())
        .collect();

    let ambiguous_with = if tied.is_empty() {
        Vec::new()
    } else {
        tied.push(best.name.clone());
        tied.sort();
        tied
    };

    Some(TagMatch {
        name: best.name,
        commit: commit.to_string(),
        parsed,
        distance: None,
        ambiguous_with,
    })
}

/// Find the nearest matching tag in a history ordered newest first
///
/// Each item is a commit id with the tags placed on it.
pub fn nearest_match<I>(history: I, pattern: &Pattern) -> TagLookup
where
    I: IntoIterator<Item = (String, Vec<TagCandidate>)>,
{
    let mut seen = 0;
    let mut nearest = None;

    for (commit, candidates) in history {
        if candidates.is_empty() {
            continue;
        }
        seen += candidates.len();
        if nearest.is_none() {
            nearest = candidates.iter().map(|c| c.name.clone()).max();
        }
        if let Some(found) = pick_at_commit(&commit, candidates, pattern) {
            return TagLookup::Found(found);
        }
    }

    match nearest {
        Some(nearest) => TagLookup::Unmatched { nearest, seen },
        None => TagLookup::NoTags,
    }
}

/// A fact source found by [detect]
pub struct Detected {
    pub source: Box<dyn FactSource>,
    pub root: PathBuf,
    pub warnings: Vec<BoundaryWarning>,
}

/// Find the working copy containing `path`
///
/// With `only` set, just that backend (and its archival format) is
/// considered. Opening a backend that reports [TagverError::NoVcsFound]
/// moves on to the next candidate; any other error stops detection.
///
/// # Errors
/// * [TagverError::NoVcsFound] - If no marker or archival file is found
pub fn detect(path: &Path, only: Option<Vcs>, options: &OpenOptions) -> Result<Detected> {
    let start = path.canonicalize()?;
    let candidates: Vec<Vcs> = match only {
        Some(vcs) => vec![vcs],
        None => Vcs::DETECTION_ORDER.to_vec(),
    };
    let mut warnings = Vec::new();

    for dir in start.ancestors() {
        for vcs in &candidates {
            if !vcs.is_root(dir) {
                continue;
            }
            match vcs.open(dir, options) {
                Ok(source) => {
                    return Ok(Detected {
                        source,
                        root: dir.to_path_buf(),
                        warnings,
                    })
                }
                Err(TagverError::NoVcsFound { .. }) => {
                    tracing::debug!(vcs = vcs.name(), dir = %dir.display(), "marker present but not a working copy");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        for vcs in &candidates {
            match archival::ArchivalFacts::find(dir, *vcs)? {
                archival::ArchivalLookup::Ready(facts) => {
                    return Ok(Detected {
                        source: Box::new(facts),
                        root: dir.to_path_buf(),
                        warnings,
                    })
                }
                archival::ArchivalLookup::Unsubstituted(file) => {
                    let warning = BoundaryWarning::UnsubstitutedArchival {
                        path: file.display().to_string(),
                    };
                    tracing::debug!(%warning, "archival file not substituted");
                    warnings.push(warning);
                }
                archival::ArchivalLookup::Absent => {}
            }
        }
    }

    Err(TagverError::NoVcsFound { path: start })
}
