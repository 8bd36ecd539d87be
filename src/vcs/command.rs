use crate::error::{Result, TagverError};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Output};

/// Runs VCS executables inside a working copy
#[derive(Debug, Clone)]
pub(crate) struct CommandRunner<'a> {
    program: &'static str,
    root: &'a Path,
}

impl<'a> CommandRunner<'a> {
    pub fn new(program: &'static str, root: &'a Path) -> Self {
        CommandRunner { program, root }
    }

    /// Run and return trimmed stdout
    ///
    /// # Returns
    /// * `Ok(stdout)` if the command exits with code 0
    /// * `Err` if the executable is missing or exits non-zero
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.spawn(args)?;
        if !output.status.success() {
            return Err(self.failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run and return stdout together with the exit code
    ///
    /// Used for commands that signal a result through their exit code, like
    /// `darcs whatsnew` exiting 1 when there is nothing to report.
    pub fn run_status(&self, args: &[&str]) -> Result<(i32, String)> {
        let output = self.spawn(args)?;
        let code = output.status.code().unwrap_or(-1);
        Ok((code, String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    fn spawn(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(command = %self.describe(args), cwd = %self.root.display(), "running");

        Command::new(self.program)
            .args(args)
            .current_dir(self.root)
            .output()
            .map_err(|e| {
                let reason = if e.kind() == ErrorKind::NotFound {
                    format!("'{}' is not installed or not on PATH", self.program)
                } else {
                    e.to_string()
                };
                TagverError::command(self.describe(args), reason)
            })
    }

    fn failure(&self, args: &[&str], output: &Output) -> TagverError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        TagverError::command(
            self.describe(args),
            format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                detail
            ),
        )
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.to_string()];
        parts.extend(args.iter().map(|a| a.to_string()));
        parts.join(" ")
    }
}

/// Non-empty lines of `output`
pub(crate) fn lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Whether `output` has any non-empty line
pub(crate) fn has_lines(output: &str) -> bool {
    lines(output).next().is_some()
}
