use crate::domain::Pattern;
use crate::error::{Result, TagverError};
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, Utc};
use git2::{ErrorCode, Oid, Repository, Sort, StatusOptions};
use std::collections::HashMap;
use std::path::Path;

/// Git facts read in-process through libgit2
pub struct GitFacts {
    repo: Repository,
    tag_branch: Option<String>,
}

impl GitFacts {
    /// Open the repository whose working copy (or `.git` file) is at `root`
    ///
    /// With `tag_branch` set, facts are read from that branch or ref instead
    /// of the checked-out commit.
    pub fn open(root: &Path, tag_branch: Option<String>) -> Result<Self> {
        let repo = Repository::open(root).map_err(|e| match e.code() {
            ErrorCode::NotFound => TagverError::NoVcsFound {
                path: root.to_path_buf(),
            },
            _ => TagverError::Git(e),
        })?;

        Ok(GitFacts { repo, tag_branch })
    }

    /// Wrap an already opened repository
    pub fn from_git2(repo: Repository) -> Self {
        GitFacts {
            repo,
            tag_branch: None,
        }
    }

    /// Commit the facts describe; `None` before the first commit
    fn target(&self) -> Result<Option<Oid>> {
        if let Some(branch) = &self.tag_branch {
            let object = self.repo.revparse_single(branch)?;
            return Ok(Some(object.peel_to_commit()?.id()));
        }

        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Tags grouped by the commit they point at
    fn tags_by_commit(&self) -> Result<HashMap<Oid, Vec<TagCandidate>>> {
        let mut by_commit: HashMap<Oid, Vec<TagCandidate>> = HashMap::new();

        for name in self.repo.tag_names(None)?.iter().flatten() {
            let reference = match self.repo.find_reference(&format!("refs/tags/{}", name)) {
                Ok(reference) => reference,
                Err(e) => {
                    tracing::debug!(tag = name, error = %e, "skipping unreadable tag");
                    continue;
                }
            };
            // Tags on trees or blobs never label a commit.
            let commit = match reference.peel_to_commit() {
                Ok(commit) => commit,
                Err(_) => continue,
            };
            let created = reference
                .peel_to_tag()
                .ok()
                .and_then(|tag| tag.tagger().map(|sig| sig.when().seconds()));

            by_commit
                .entry(commit.id())
                .or_default()
                .push(TagCandidate::new(name, created));
        }

        Ok(by_commit)
    }

    fn history(&self, from: Oid) -> Result<Vec<Oid>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(from)?;

        let mut oids = Vec::new();
        for oid in revwalk {
            oids.push(oid?);
        }
        Ok(oids)
    }
}

impl FactSource for GitFacts {
    fn vcs(&self) -> Vcs {
        Vcs::Git
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        let target = match self.target()? {
            Some(oid) => oid,
            None => return Ok(TagLookup::NoTags),
        };

        let mut by_commit = self.tags_by_commit()?;
        if by_commit.is_empty() {
            return Ok(TagLookup::NoTags);
        }

        let history = self.history(target)?.into_iter().map(|oid| {
            let tags = by_commit.remove(&oid).unwrap_or_default();
            (oid.to_string(), tags)
        });

        Ok(nearest_match(history, pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        let target = match self.target()? {
            Some(oid) => oid,
            None => return Ok(0),
        };

        match tag_commit {
            Some(commit) => {
                let tagged = Oid::from_str(commit)?;
                let (ahead, _behind) = self.repo.graph_ahead_behind(target, tagged)?;
                Ok(ahead as u64)
            }
            None => Ok(self.history(target)?.len() as u64),
        }
    }

    fn is_dirty(&self) -> Result<bool> {
        if self.repo.is_bare() {
            return Ok(false);
        }

        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .any(|entry| !entry.status().is_empty() && !entry.status().is_ignored()))
    }

    fn commit_id(&self, length: CommitLength) -> Result<Option<String>> {
        let target = match self.target()? {
            Some(oid) => oid,
            None => return Ok(None),
        };

        match length {
            CommitLength::Full => Ok(Some(target.to_string())),
            CommitLength::Short => {
                let object = self.repo.find_object(target, None)?;
                let short = object.short_id()?;
                Ok(short.as_str().map(|s| s.to_string()))
            }
        }
    }

    fn branch(&self) -> Result<Option<String>> {
        if let Some(branch) = &self.tag_branch {
            return Ok(Some(branch.clone()));
        }

        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(|s| s.to_string())),
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // HEAD still names the branch the first commit will land on.
                let head = self.repo.find_reference("HEAD")?;
                Ok(head
                    .symbolic_target()
                    .map(|target| target.trim_start_matches("refs/heads/").to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let target = match self.target()? {
            Some(oid) => oid,
            None => return Ok(None),
        };

        let commit = self.repo.find_commit(target)?;
        Ok(DateTime::from_timestamp(commit.time().seconds(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn commit(repo: &Repository, file: &str, content: &str) -> Oid {
        let root = repo.workdir().unwrap().to_path_buf();
        fs::write(root.join(file), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parent_refs)
            .unwrap()
    }

    fn lightweight_tag(repo: &Repository, name: &str, oid: Oid) {
        let object = repo.find_object(oid, None).unwrap();
        repo.tag_lightweight(name, &object, false).unwrap();
    }

    #[test]
    fn test_empty_repository() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let facts = GitFacts::open(dir.path(), None).unwrap();

        assert_eq!(facts.latest_matching_tag(&Pattern::default()).unwrap(), TagLookup::NoTags);
        assert_eq!(facts.distance_since(None).unwrap(), 0);
        assert_eq!(facts.commit_id(CommitLength::Short).unwrap(), None);
        assert_eq!(facts.timestamp().unwrap(), None);
        assert!(facts.branch().unwrap().is_some());
    }

    #[test]
    fn test_open_non_repository() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GitFacts::open(dir.path(), None),
            Err(TagverError::NoVcsFound { .. })
        ));
    }

    #[test]
    fn test_nearest_tag_and_distance() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit(&repo, "a.txt", "1");
        lightweight_tag(&repo, "v0.1.0", first);
        commit(&repo, "a.txt", "2");
        let third = commit(&repo, "a.txt", "3");

        let facts = GitFacts::from_git2(repo);
        let found = match facts.latest_matching_tag(&Pattern::default()).unwrap() {
            TagLookup::Found(found) => found,
            other => panic!("unexpected lookup: {:?}", other),
        };
        assert_eq!(found.name, "v0.1.0");
        assert_eq!(found.commit, first.to_string());
        assert_eq!(facts.distance_since(Some(&found.commit)).unwrap(), 2);
        assert_eq!(facts.distance_since(None).unwrap(), 3);
        assert_eq!(
            facts.commit_id(CommitLength::Full).unwrap(),
            Some(third.to_string())
        );
        let short = facts.commit_id(CommitLength::Short).unwrap().unwrap();
        assert!(third.to_string().starts_with(&short));
    }

    #[test]
    fn test_dirty_ignores_untracked() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, "a.txt", "1");
        let facts = GitFacts::from_git2(repo);

        fs::write(dir.path().join("untracked.txt"), "new").unwrap();
        assert!(!facts.is_dirty().unwrap());

        fs::write(dir.path().join("a.txt"), "modified").unwrap();
        assert!(facts.is_dirty().unwrap());
    }

    #[test]
    fn test_unmatched_tags() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit(&repo, "a.txt", "1");
        lightweight_tag(&repo, "release-1", first);

        let facts = GitFacts::from_git2(repo);
        assert_eq!(
            facts.latest_matching_tag(&Pattern::default()).unwrap(),
            TagLookup::Unmatched {
                nearest: "release-1".to_string(),
                seen: 1
            }
        );
    }

    #[test]
    fn test_tag_branch() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit(&repo, "a.txt", "1");
        lightweight_tag(&repo, "v1.0.0", first);
        {
            let head = repo.find_commit(first).unwrap();
            repo.branch("release", &head, false).unwrap();
        }
        commit(&repo, "a.txt", "2");
        drop(repo);

        let facts = GitFacts::open(dir.path(), Some("release".to_string())).unwrap();
        assert_eq!(facts.distance_since(Some(&first.to_string())).unwrap(), 0);
        assert_eq!(facts.branch().unwrap().as_deref(), Some("release"));
    }
}
