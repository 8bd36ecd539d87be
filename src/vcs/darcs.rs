use crate::domain::Pattern;
use crate::error::{Result, TagverError};
use crate::vcs::command::CommandRunner;
use crate::vcs::{nearest_match, CommitLength, FactSource, TagCandidate, TagLookup, Vcs};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Darcs facts read through the `darcs` executable
///
/// Tags are patches named `TAG <name>`; the tag patch itself is the tagged
/// point, so distance counts the patches recorded after it.
pub struct DarcsFacts {
    root: PathBuf,
}

/// One entry of `darcs log --xml-output`, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
struct Patch {
    hash: String,
    name: String,
    date: String,
}

impl Patch {
    fn tag(&self) -> Option<&str> {
        self.name.strip_prefix("TAG ")
    }
}

impl DarcsFacts {
    pub fn new(root: &Path) -> Self {
        DarcsFacts {
            root: root.to_path_buf(),
        }
    }

    fn darcs(&self) -> CommandRunner<'_> {
        CommandRunner::new("darcs", &self.root)
    }

    fn patches(&self) -> Result<Vec<Patch>> {
        let xml = self.darcs().run(&["log", "--xml-output"])?;
        Ok(parse_log(&xml))
    }
}

fn parse_log(xml: &str) -> Vec<Patch> {
    static PATCH: OnceLock<Regex> = OnceLock::new();
    static ATTR: OnceLock<Regex> = OnceLock::new();
    static NAME: OnceLock<Regex> = OnceLock::new();

    let patch = PATCH.get_or_init(|| {
        Regex::new(r"(?s)<patch\s([^>]*)>(.*?)</patch>").expect("patch expression compiles")
    });
    let attr = ATTR.get_or_init(|| {
        Regex::new(r#"(\w+)=['"]([^'"]*)['"]"#).expect("attribute expression compiles")
    });
    let name =
        NAME.get_or_init(|| Regex::new(r"(?s)<name>(.*?)</name>").expect("name expression compiles"));

    patch
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let body = caps.get(2)?.as_str();

            let mut hash = None;
            let mut date = String::new();
            for a in attr.captures_iter(attrs) {
                match &a[1] {
                    "hash" => hash = Some(a[2].to_string()),
                    "date" => date = a[2].to_string(),
                    _ => {}
                }
            }

            let patch_name = name
                .captures(body)
                .and_then(|n| n.get(1))
                .map(|n| unescape(n.as_str().trim()))
                .unwrap_or_default();

            Some(Patch {
                hash: hash?,
                name: patch_name,
                date,
            })
        })
        .collect()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

impl FactSource for DarcsFacts {
    fn vcs(&self) -> Vcs {
        Vcs::Darcs
    }

    fn latest_matching_tag(&self, pattern: &Pattern) -> Result<TagLookup> {
        let history = self.patches()?.into_iter().map(|patch| {
            let tags = patch
                .tag()
                .map(|tag| vec![TagCandidate::new(tag, None)])
                .unwrap_or_default();
            (patch.hash, tags)
        });
        Ok(nearest_match(history, pattern))
    }

    fn distance_since(&self, tag_commit: Option<&str>) -> Result<u64> {
        let patches = self.patches()?;
        let distance = match tag_commit {
            Some(hash) => patches
                .iter()
                .position(|p| p.hash == hash)
                .unwrap_or(patches.len()),
            None => patches.len(),
        };
        Ok(distance as u64)
    }

    fn is_dirty(&self) -> Result<bool> {
        // `whatsnew` exits 1 when there are no changes.
        match self.darcs().run_status(&["whatsnew", "--summary"])? {
            (0, _) => Ok(true),
            (1, _) => Ok(false),
            (code, _) => Err(TagverError::command(
                "darcs whatsnew --summary",
                format!("exit code {}", code),
            )),
        }
    }

    fn commit_id(&self, length: CommitLength) -> Result<Option<String>> {
        Ok(self.patches()?.into_iter().next().map(|p| match length {
            CommitLength::Full => p.hash,
            CommitLength::Short => p.hash.chars().take(7).collect(),
        }))
    }

    fn branch(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.patches()?.first().and_then(|p| {
            NaiveDateTime::parse_from_str(&p.date, "%Y%m%d%H%M%S")
                .ok()
                .map(|d| d.and_utc())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"<changelog>
<patch author='dev@example.com' date='20240102030405' local_date='Tue Jan  2 03:04:05 UTC 2024' inverted='False' hash='ccc333'>
	<name>Fix &amp; tidy</name>
</patch>
<patch author='dev@example.com' date='20240101000000' local_date='Mon Jan  1 00:00:00 UTC 2024' inverted='False' hash='bbb222'>
	<name>TAG v0.1.0</name>
</patch>
<patch author='dev@example.com' date='20231231000000' local_date='Sun Dec 31 00:00:00 UTC 2023' inverted='False' hash='aaa111'>
	<name>Initial</name>
	<comment>first</comment>
</patch>
</changelog>"#;

    #[test]
    fn test_parse_log() {
        let patches = parse_log(LOG);
        assert_eq!(patches.len(), 3);
        assert_eq!(patches[0].hash, "ccc333");
        assert_eq!(patches[0].name, "Fix & tidy");
        assert_eq!(patches[0].date, "20240102030405");
        assert_eq!(patches[1].tag(), Some("v0.1.0"));
        assert_eq!(patches[2].tag(), None);
    }

    #[test]
    fn test_tag_patch_is_nearest_match() {
        let history = parse_log(LOG).into_iter().map(|p| {
            let tags = p
                .tag()
                .map(|t| vec![TagCandidate::new(t, None)])
                .unwrap_or_default();
            (p.hash, tags)
        });
        match nearest_match(history, &Pattern::default()) {
            TagLookup::Found(found) => {
                assert_eq!(found.name, "v0.1.0");
                assert_eq!(found.commit, "bbb222");
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }
}
