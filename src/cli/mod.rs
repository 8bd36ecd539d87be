//! Command-line facing types that do not depend on argument parsing

pub mod orchestration;

use crate::error::{Result, TagverError};
use crate::vcs::Vcs;
use std::fmt;
use std::str::FromStr;

/// VCS selection on the command line: auto-detect or one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum VcsArg {
    #[default]
    Any,
    Git,
    #[value(name = "hg")]
    Mercurial,
    #[value(name = "svn")]
    Subversion,
    #[value(name = "bzr")]
    Bazaar,
    Fossil,
    Darcs,
    Pijul,
}

impl VcsArg {
    /// The backend to restrict detection to; `None` for auto-detection
    pub fn backend(&self) -> Option<Vcs> {
        match self {
            VcsArg::Any => None,
            VcsArg::Git => Some(Vcs::Git),
            VcsArg::Mercurial => Some(Vcs::Mercurial),
            VcsArg::Subversion => Some(Vcs::Subversion),
            VcsArg::Bazaar => Some(Vcs::Bazaar),
            VcsArg::Fossil => Some(Vcs::Fossil),
            VcsArg::Darcs => Some(Vcs::Darcs),
            VcsArg::Pijul => Some(Vcs::Pijul),
        }
    }
}

impl From<Vcs> for VcsArg {
    fn from(vcs: Vcs) -> Self {
        match vcs {
            Vcs::Git => VcsArg::Git,
            Vcs::Mercurial => VcsArg::Mercurial,
            Vcs::Subversion => VcsArg::Subversion,
            Vcs::Bazaar => VcsArg::Bazaar,
            Vcs::Fossil => VcsArg::Fossil,
            Vcs::Darcs => VcsArg::Darcs,
            Vcs::Pijul => VcsArg::Pijul,
        }
    }
}

impl FromStr for VcsArg {
    type Err = TagverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "any" => Ok(VcsArg::Any),
            name => name.parse::<Vcs>().map(VcsArg::from),
        }
    }
}

impl fmt::Display for VcsArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend() {
            Some(vcs) => write!(f, "{}", vcs),
            None => write!(f, "any"),
        }
    }
}
