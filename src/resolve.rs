//! Turn repository facts into a [Version]

use crate::boundary::BoundaryWarning;
use crate::domain::{Pattern, VcsFacts, Version};
use crate::error::{Result, TagverError};
use crate::vcs::{self, CommitLength, FactSource, OpenOptions, TagLookup, Vcs};
use std::path::Path;

/// How to pick and interpret tags
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub pattern: Pattern,
    /// Fail instead of falling back to `0.0.0` when no tag matches
    pub strict: bool,
    /// Record the full commit id instead of the short one
    pub full_commit: bool,
}

/// A resolved version with where it came from
#[derive(Debug, Clone)]
pub struct Resolution {
    pub version: Version,
    /// Tag the version was derived from; `None` when untagged
    pub tag: Option<String>,
    pub vcs: Vcs,
    pub warnings: Vec<BoundaryWarning>,
}

/// Derive a version from `source`
///
/// # Errors
/// * [TagverError::PatternMismatch] - In strict mode, if no tag matches
/// * VCS errors from `source` are propagated unchanged
pub fn resolve(source: &dyn FactSource, options: &ResolveOptions) -> Result<Resolution> {
    let mut warnings = Vec::new();
    let lookup = source.latest_matching_tag(&options.pattern)?;

    let (found, distance) = match lookup {
        TagLookup::Found(found) => {
            let distance = match found.distance {
                Some(distance) => distance,
                None => source.distance_since(Some(&found.commit))?,
            };
            (Some(found), distance)
        }
        TagLookup::Unmatched { nearest, seen } => {
            if options.strict {
                return Err(TagverError::PatternMismatch {
                    tag: Some(nearest),
                    pattern: options.pattern.to_string(),
                });
            }
            warnings.push(BoundaryWarning::UnmatchedTags {
                pattern: options.pattern.to_string(),
                seen,
            });
            (None, source.distance_since(None)?)
        }
        TagLookup::NoTags => {
            if options.strict {
                return Err(TagverError::PatternMismatch {
                    tag: None,
                    pattern: options.pattern.to_string(),
                });
            }
            (None, source.distance_since(None)?)
        }
    };

    let facts = VcsFacts {
        commit_short: source.commit_id(CommitLength::Short)?,
        commit_full: if options.full_commit {
            source.commit_id(CommitLength::Full)?
        } else {
            None
        },
        distance,
        dirty: source.is_dirty()?,
        branch: source.branch()?,
        timestamp: source.timestamp()?,
    };

    let (version, tag) = match found {
        Some(found) => {
            if !found.ambiguous_with.is_empty() {
                warnings.push(BoundaryWarning::AmbiguousTag {
                    commit: found.commit.clone(),
                    chosen: found.name.clone(),
                    candidates: found.ambiguous_with.clone(),
                });
            }
            tracing::debug!(tag = %found.name, distance, "matched tag");
            (
                Version::from_tag(found.parsed, &facts, options.full_commit)?,
                Some(found.name),
            )
        }
        None => {
            tracing::debug!(distance, "no matching tag, using untagged version");
            (Version::untagged(&facts, options.full_commit), None)
        }
    };

    for warning in &warnings {
        tracing::debug!(%warning, "boundary warning");
    }

    Ok(Resolution {
        version,
        tag,
        vcs: source.vcs(),
        warnings,
    })
}

/// Detect the working copy containing `path` and resolve its version
///
/// `only` restricts detection to one VCS. Warnings raised during detection
/// are returned ahead of those raised during resolution.
pub fn from_path(
    path: &Path,
    only: Option<Vcs>,
    open: &OpenOptions,
    options: &ResolveOptions,
) -> Result<Resolution> {
    let detected = vcs::detect(path, only, open)?;
    tracing::info!(vcs = %detected.source.vcs(), root = %detected.root.display(), "detected repository");

    let mut resolution = resolve(detected.source.as_ref(), options)?;
    let mut warnings = detected.warnings;
    warnings.append(&mut resolution.warnings);
    resolution.warnings = warnings;
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SerializeOptions, Style};
    use crate::vcs::MockFacts;

    fn pep440(version: &Version) -> String {
        version.serialize(&SerializeOptions::default()).unwrap()
    }

    #[test]
    fn test_exact_tag() {
        let facts = MockFacts::new(Vcs::Git).commit("644252b").tag("v0.1.0");
        let resolution = resolve(&facts, &ResolveOptions::default()).unwrap();
        assert_eq!(resolution.tag.as_deref(), Some("v0.1.0"));
        assert_eq!(pep440(&resolution.version), "0.1.0");
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_past_tag() {
        let facts = MockFacts::new(Vcs::Git)
            .commit("1111111aaaa")
            .tag("v0.1.0rc5")
            .commit("2222222bbbb")
            .commit("644252bcccc");
        let resolution = resolve(&facts, &ResolveOptions::default()).unwrap();
        assert_eq!(resolution.version.distance(), 2);
        assert_eq!(resolution.version.commit(), Some("644252b"));
        assert_eq!(pep440(&resolution.version), "0.1.0rc5.post2.dev0+644252b");
    }

    #[test]
    fn test_no_tags_falls_back() {
        let facts = MockFacts::new(Vcs::Git).commit("aaa").commit("bbb");
        let resolution = resolve(&facts, &ResolveOptions::default()).unwrap();
        assert_eq!(resolution.tag, None);
        assert_eq!(resolution.version.base(), "0.0.0");
        assert_eq!(resolution.version.distance(), 2);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_unmatched_tags_warn() {
        let facts = MockFacts::new(Vcs::Git).commit("aaa").tag("release-1");
        let resolution = resolve(&facts, &ResolveOptions::default()).unwrap();
        assert_eq!(resolution.version.base(), "0.0.0");
        assert_eq!(
            resolution.warnings,
            vec![BoundaryWarning::UnmatchedTags {
                pattern: "default".to_string(),
                seen: 1
            }]
        );
    }

    #[test]
    fn test_strict_mode() {
        let options = ResolveOptions {
            strict: true,
            ..ResolveOptions::default()
        };

        let unmatched = MockFacts::new(Vcs::Git).commit("aaa").tag("release-1");
        match resolve(&unmatched, &options) {
            Err(TagverError::PatternMismatch { tag, .. }) => {
                assert_eq!(tag.as_deref(), Some("release-1"))
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.tag)),
        }

        let untagged = MockFacts::new(Vcs::Git).commit("aaa");
        match resolve(&untagged, &options) {
            Err(TagverError::PatternMismatch { tag, .. }) => assert_eq!(tag, None),
            other => panic!("unexpected result: {:?}", other.map(|r| r.tag)),
        }
    }

    #[test]
    fn test_ambiguous_tags_warn() {
        let facts = MockFacts::new(Vcs::Git)
            .commit("abcdef0123")
            .tag("v1.0.0")
            .tag("v1.0.1");
        let resolution = resolve(&facts, &ResolveOptions::default()).unwrap();
        assert_eq!(resolution.tag.as_deref(), Some("v1.0.1"));
        assert!(matches!(
            resolution.warnings.as_slice(),
            [BoundaryWarning::AmbiguousTag { chosen, .. }] if chosen == "v1.0.1"
        ));
    }

    #[test]
    fn test_dirty_and_branch_carried() {
        let facts = MockFacts::new(Vcs::Mercurial)
            .commit("aaa")
            .tag("v2.0.0")
            .dirty(true)
            .branch("default");
        let resolution = resolve(&facts, &ResolveOptions::default()).unwrap();
        assert!(resolution.version.dirty());
        assert_eq!(resolution.version.branch(), Some("default"));
        assert_eq!(resolution.vcs, Vcs::Mercurial);
    }

    #[test]
    fn test_full_commit() {
        let facts = MockFacts::new(Vcs::Git)
            .commit("1111111")
            .tag("v1.0.0")
            .commit("644252b0d5e0c6e3");
        let options = ResolveOptions {
            full_commit: true,
            ..ResolveOptions::default()
        };
        let resolution = resolve(&facts, &options).unwrap();
        assert_eq!(resolution.version.commit(), Some("644252b0d5e0c6e3"));
    }

    #[test]
    fn test_vcs_failure_propagates() {
        let facts = MockFacts::new(Vcs::Subversion).commit("1").failing("svn: E155007");
        let err = resolve(&facts, &ResolveOptions::default()).unwrap_err();
        assert!(err.is_vcs_failure());
    }

    #[test]
    fn test_semver_past_tag() {
        let facts = MockFacts::new(Vcs::Git)
            .commit("aaaaaaa")
            .tag("v0.1.0rc5")
            .commit("644252b");
        let resolution = resolve(&facts, &ResolveOptions::default()).unwrap();
        let rendered = resolution
            .version
            .serialize(&SerializeOptions {
                style: Some(Style::SemVer),
                ..SerializeOptions::default()
            })
            .unwrap();
        assert_eq!(rendered, "0.1.0-rc.5.post.1+644252b");
    }
}
