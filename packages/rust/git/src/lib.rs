//! Git-backed change source and command helper.
//!
//! Shells out to the `git` binary. [`GitChangeSource`] turns one commit
//! reference into a [`ChangeRecord`]; [`run_git`] is also used by the wiki
//! publisher in `changedoc-storage`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, instrument};

use changedoc_shared::{ChangeDocError, ChangeRecord, Result};

/// Run `git <args>` in `dir` and return its stdout.
///
/// A spawn failure or a non-zero exit becomes [`ChangeDocError::Git`]
/// carrying the trimmed stderr.
pub fn run_git<I, S>(dir: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let shown = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    let output = Command::new("git")
        .args(&args)
        .current_dir(dir)
        .output()
        .map_err(|e| ChangeDocError::Git(format!("failed to run git {shown}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ChangeDocError::Git(format!(
            "git {shown} exited with status {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Reads changes from a local git checkout.
#[derive(Debug, Clone)]
pub struct GitChangeSource {
    repo_dir: PathBuf,
}

impl GitChangeSource {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Fetch message, touched paths and patch text for `reference`.
    #[instrument(skip(self), fields(repo = %self.repo_dir.display()))]
    pub fn get_change(&self, reference: &str) -> Result<ChangeRecord> {
        let reference = reference.trim();
        if reference.is_empty() || reference.starts_with('-') {
            return Err(ChangeDocError::validation(format!(
                "invalid commit reference: {reference:?}"
            )));
        }

        let sha = self.resolve(reference)?;
        let summary = run_git(&self.repo_dir, ["log", "-1", "--pretty=%B", sha.as_str()])?;
        let names = run_git(
            &self.repo_dir,
            [
                "diff-tree",
                "--no-commit-id",
                "--name-only",
                "-r",
                "--root",
                sha.as_str(),
            ],
        )?;
        let diff = run_git(&self.repo_dir, ["show", "--format=", sha.as_str()])?;

        let change = ChangeRecord {
            reference: sha,
            summary: summary.trim().to_string(),
            file_paths: parse_file_list(&names),
            diff,
        };
        debug!(
            files = change.file_paths.len(),
            diff_chars = change.diff.len(),
            "change loaded"
        );
        Ok(change)
    }

    fn resolve(&self, reference: &str) -> Result<String> {
        let rev = format!("{reference}^{{commit}}");
        match run_git(&self.repo_dir, ["rev-parse", "--verify", "--quiet", rev.as_str()]) {
            Ok(out) if !out.trim().is_empty() => Ok(out.trim().to_string()),
            Ok(_) => Err(no_such_reference(reference)),
            Err(ChangeDocError::Git(msg)) if msg.contains("not a git repository") => {
                Err(ChangeDocError::Git(format!(
                    "{} is not a git repository",
                    self.repo_dir.display()
                )))
            }
            Err(ChangeDocError::Git(_)) => Err(no_such_reference(reference)),
            Err(other) => Err(other),
        }
    }
}

fn no_such_reference(reference: &str) -> ChangeDocError {
    ChangeDocError::Git(format!("no such reference: {reference}"))
}

/// Split `git diff-tree --name-only` output into paths, skipping blanks.
pub fn parse_file_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
