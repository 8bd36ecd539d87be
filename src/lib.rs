pub mod boundary;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod resolve;
pub mod ui;
pub mod vcs;

pub use domain::{ParsedTag, Pattern, SerializeOptions, Style, Version};
pub use error::{Result, TagverError};
pub use resolve::{resolve, Resolution, ResolveOptions};
