//! Command workflows
//!
//! The `from` and `check` commands as plain functions, so they can be run
//! programmatically and tested without going through clap.

use std::path::PathBuf;

use crate::boundary::BoundaryWarning;
use crate::cli::VcsArg;
use crate::config::Config;
use crate::domain::{self, Pattern, SerializeOptions, Style};
use crate::error::Result;
use crate::resolve::{self, ResolveOptions};
use crate::vcs::{OpenOptions, Vcs};

/// Arguments for the `from` workflow
///
/// `None` and `false` leave the configured default in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FromWorkflowArgs {
    /// Directory to resolve from; the current directory when unset
    pub path: Option<PathBuf>,
    pub vcs: Option<VcsArg>,
    pub style: Option<Style>,
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub metadata: Option<bool>,
    pub dirty: bool,
    pub bump: bool,
    pub full_commit: bool,
    pub strict: bool,
    pub tagged_metadata: bool,
    pub tag_branch: Option<String>,
}

/// Result of a successful `from` workflow
#[derive(Debug, Clone, PartialEq)]
pub struct FromOutcome {
    /// The serialized version
    pub version: String,

    /// Tag the version was derived from
    pub tag: Option<String>,

    pub vcs: Vcs,

    pub warnings: Vec<BoundaryWarning>,
}

/// Effective settings after layering flags over configuration
#[derive(Debug, Clone)]
struct Settings {
    path: PathBuf,
    vcs: VcsArg,
    open: OpenOptions,
    resolve: ResolveOptions,
    serialize: SerializeOptions,
}

impl FromWorkflowArgs {
    fn merge(self, config: &Config) -> Result<Settings> {
        let defaults = &config.defaults;

        let vcs = match (self.vcs, &defaults.vcs) {
            (Some(vcs), _) => vcs,
            (None, Some(name)) => name.parse()?,
            (None, None) => VcsArg::Any,
        };

        let pattern = match self.pattern.as_ref().or(defaults.pattern.as_ref()) {
            Some(expr) => expr.parse::<Pattern>()?,
            None => Pattern::default(),
        };

        Ok(Settings {
            path: self.path.unwrap_or_else(|| PathBuf::from(".")),
            vcs,
            open: OpenOptions {
                tag_branch: self.tag_branch.or_else(|| defaults.tag_branch.clone()),
            },
            resolve: ResolveOptions {
                pattern,
                strict: self.strict || defaults.strict,
                full_commit: self.full_commit || defaults.full_commit,
            },
            serialize: SerializeOptions {
                style: self.style.or(defaults.style),
                metadata: self.metadata.or(defaults.metadata),
                dirty: self.dirty || defaults.dirty,
                format: self.format.or_else(|| defaults.format.clone()),
                bump: self.bump || defaults.bump,
                tagged_metadata: self.tagged_metadata || defaults.tagged_metadata,
            },
        })
    }
}

/// Resolve and serialize the version of a working copy
///
/// 1. Layer flags over the configuration
/// 2. Detect the VCS and read its facts
/// 3. Match the nearest tag and build the version
/// 4. Serialize with the requested style or format
pub fn run_from_workflow(args: FromWorkflowArgs, config: &Config) -> Result<FromOutcome> {
    let settings = args.merge(config)?;
    tracing::debug!(?settings, "effective settings");

    let resolution = resolve::from_path(
        &settings.path,
        settings.vcs.backend(),
        &settings.open,
        &settings.resolve,
    )?;
    let version = resolution.version.serialize(&settings.serialize)?;

    Ok(FromOutcome {
        version,
        tag: resolution.tag,
        vcs: resolution.vcs,
        warnings: resolution.warnings,
    })
}

/// Validate a freeform version string against `style`
pub fn run_check_workflow(version: &str, style: Style) -> Result<()> {
    domain::check(version, style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Defaults;

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            defaults: Defaults {
                style: Some(Style::Pvp),
                pattern: Some("default-unprefixed".to_string()),
                metadata: Some(true),
                vcs: Some("hg".to_string()),
                dirty: true,
                ..Defaults::default()
            },
        };
        let args = FromWorkflowArgs {
            style: Some(Style::SemVer),
            vcs: Some(VcsArg::Git),
            ..FromWorkflowArgs::default()
        };

        let settings = args.merge(&config).unwrap();
        assert_eq!(settings.serialize.style, Some(Style::SemVer));
        assert_eq!(settings.serialize.metadata, Some(true));
        assert!(settings.serialize.dirty);
        assert_eq!(settings.vcs, VcsArg::Git);
        assert_eq!(settings.resolve.pattern.to_string(), "default-unprefixed");
    }

    #[test]
    fn test_config_vcs_used_when_flag_absent() {
        let config = Config {
            defaults: Defaults {
                vcs: Some("fossil".to_string()),
                ..Defaults::default()
            },
        };
        let settings = FromWorkflowArgs::default().merge(&config).unwrap();
        assert_eq!(settings.vcs, VcsArg::Fossil);
        assert_eq!(settings.path, PathBuf::from("."));
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let args = FromWorkflowArgs {
            pattern: Some("^no-base$".to_string()),
            ..FromWorkflowArgs::default()
        };
        assert!(args.merge(&Config::default()).is_err());
    }

    #[test]
    fn test_check_workflow() {
        assert!(run_check_workflow("0.1.0", Style::SemVer).is_ok());
        assert!(run_check_workflow("0.01.0", Style::SemVer).is_err());
    }
}
