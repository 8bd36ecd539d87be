//! User interface module - input and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Reading user input

use std::io::{self, BufRead, Read};

use crate::error::{Result, TagverError};

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_hint, display_version, error_hint,
};

/// Reads a version string from standard input.
///
/// Only the first line counts; trailing line endings are removed.
///
/// # Errors
/// * [TagverError::Config] - If standard input is empty
pub fn read_version_from_stdin() -> Result<String> {
    read_version(io::stdin().lock())
}

fn read_version<R: Read>(input: R) -> Result<String> {
    let mut line = String::new();
    io::BufReader::new(input).read_line(&mut line)?;

    let version = line.trim_end_matches(['\r', '\n']).to_string();
    if version.is_empty() {
        return Err(TagverError::config(
            "No version given and standard input is empty",
        ));
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_first_line() {
        let input = "0.1.0\nignored\n".as_bytes();
        assert_eq!(read_version(input).unwrap(), "0.1.0");
    }

    #[test]
    fn test_read_crlf() {
        assert_eq!(read_version("1.2.3\r\n".as_bytes()).unwrap(), "1.2.3");
    }

    #[test]
    fn test_read_empty() {
        assert!(read_version("".as_bytes()).is_err());
    }
}
