use crate::domain::Pattern;
use crate::error::Result;
use crate::vcs::command::{has_lines, lines, CommandRunner};
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

const NULL_NODE: &str = "0000000000000000000000000000000000000000";

/// Mercurial facts read through the `hg` executable
pub struct MercurialFacts {
    root: PathBuf,
}

impl MercurialFacts {
    pub fn new(root: &Path) -> Self {
        MercurialFacts {
            root: root.to_path_buf(),
        }
    }

    fn hg(&self) -> CommandRunner<'_> {
        CommandRunner::new("hg", &self.root)
    }

    fn current_node(&self) -> Result<Option<String>> {
        let node = self.hg().run(&["log", "-r", ".", "--template", "{node}"])?;
        if node.is_empty() || node == NULL_NODE {
            Ok(None)
        } else {
            Ok(Some(node))
        }
    }

    fn count(&self, revset: &str) -> Result<u64> {
        let output = self.hg().run(&["log", "-r", revset, "--template", "{node}\n"])?;
        let count = lines(&output).count();
        Ok(count as u64)
    }
}

/// Parse `{node}\t{tags}` lines, dropping the implicit `tip` tag
fn parse_tagged(output: &str) -> Vec<(String, Vec<TagCandidate>)> {
    lines(output)
        .filter_map(|line| {
            let (node, tags) = line.split_once('\t')?;
            let tags: Vec<TagCandidate> = tags
                .split_whitespace()
                .filter(|tag| *tag != "tip")
                .map(|tag| TagCandidate::new(tag, None))
                .collect();
            Some((node.to_string(), tags))
        })
        .collect()
}

impl FactSource for MercurialFacts {
    fn vcs(&self) -> Vcs {
        Vcs::Mercurial
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        if self.current_node()?.is_none() {
            return Ok(TagLookup::NoTags);
        }
        let output = self.hg().run(&[
            "log",
            "-r",
            "reverse(ancestors(.) and tag())",
            "--template",
            "{node}\t{tags}\n",
        ])?;
        Ok(nearest_match(parse_tagged(&output), pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        if self.current_node()?.is_none() {
            return Ok(0);
        }
        match tag_commit {
            Some(node) => self.count(&format!("only(., {})", node)),
            None => self.count("ancestors(.)"),
        }
    }

    fn is_dirty(&self) -> Result<bool> {
        let output = self.hg().run(&["status", "-mard"])?;
        Ok(has_lines(&output))
    }

    fn commit_id(&self, length: CommitLength) -> Result<Option<String>> {
        Ok(self.current_node()?.map(|node| match length {
            CommitLength::Full => node,
            CommitLength::Short => node.chars().take(12).collect(),
        }))
    }

    fn branch(&self) -> Result<Option<String>> {
        let branch = self.hg().run(&["branch"])?;
        Ok(Some(branch).filter(|b| !b.is_empty()))
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        if self.current_node()?.is_none() {
            return Ok(None);
        }
        let date = self
            .hg()
            .run(&["log", "-r", ".", "--template", "{date|rfc3339date}"])?;
        Ok(DateTime::parse_from_rfc3339(&date)
            .ok()
            .map(|d| d.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_drops_tip() {
        let parsed = parse_tagged("abc\ttip v0.2.0\ndef\tv0.1.0 stable\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, "abc");
        assert_eq!(parsed[0].1, vec![TagCandidate::new("v0.2.0", None)]);
        assert_eq!(
            parsed[1].1,
            vec![
                TagCandidate::new("v0.1.0", None),
                TagCandidate::new("stable", None)
            ]
        );
    }

    #[test]
    fn test_parsed_history_feeds_nearest_match() {
        let parsed = parse_tagged("abc\ttip\ndef\tv0.1.0\n");
        match nearest_match(parsed, &Pattern::default()) {
            TagLookup::Found(found) => assert_eq!(found.commit, "def"),
            other => panic!("unexpected lookup: {:?}", other),
        }
    }
}
