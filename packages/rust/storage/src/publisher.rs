//! Publishes wiki pages by committing and pushing a git working copy.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use changedoc_git::run_git;
use changedoc_shared::{ChangeDocError, Result, WikiConfig};

/// Authenticated clone URL of a GitHub wiki.
pub fn github_wiki_remote(owner: &str, repo: &str, token: &str) -> String {
    format!("https://{token}@github.com/{owner}/{repo}.wiki.git")
}

/// Browser URL of a wiki page.
pub fn wiki_page_url(owner: &str, repo: &str, page_id: &str) -> String {
    let page = page_id.trim().replace([' ', '/'], "-");
    format!("https://github.com/{owner}/{repo}/wiki/{page}")
}

/// A cloned wiki working copy that pushes after every page write.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    work_dir: PathBuf,
    branch: String,
    secret: Option<String>,
}

impl GitPublisher {
    /// Clone the GitHub wiki of `owner/repo` into the configured clone dir.
    pub fn clone_github(config: &WikiConfig, owner: &str, repo: &str, token: &str) -> Result<Self> {
        let remote = github_wiki_remote(owner, repo, token);
        let mut publisher = Self::clone_from(&remote, &config.clone_dir(), config)?;
        publisher.secret = Some(token.to_string());
        Ok(publisher)
    }

    /// Clone `remote` into `work_dir`, replacing whatever is there.
    #[instrument(skip_all, fields(dir = %work_dir.display()))]
    pub fn clone_from(remote: &str, work_dir: &Path, config: &WikiConfig) -> Result<Self> {
        if work_dir.exists() {
            std::fs::remove_dir_all(work_dir).map_err(|e| ChangeDocError::io(work_dir, e))?;
        }
        let parent = work_dir.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| ChangeDocError::io(parent, e))?;

        let publisher = Self {
            work_dir: work_dir.to_path_buf(),
            branch: config.branch.clone(),
            secret: None,
        };

        let target = work_dir.to_string_lossy();
        run_git(parent, ["clone", "-q", remote, &*target])
            .map_err(|e| redact(e, remote_token(remote)))?;
        publisher.git(["config", "user.name", config.author_name.as_str()])?;
        publisher.git(["config", "user.email", config.author_email.as_str()])?;

        info!("wiki cloned");
        Ok(publisher)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Stage, commit and push one page file. Unchanged files are a no-op.
    ///
    /// On failure the working copy is reset to the commit it was at before
    /// the call, so a page that failed to publish is never carried along by
    /// a later push.
    #[instrument(skip(self))]
    pub fn publish(&self, file_name: &str, title: &str) -> Result<()> {
        let base = self
            .git(["rev-parse", "--verify", "--quiet", "HEAD"])
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|sha| !sha.is_empty());

        match self.commit_and_push(file_name, title) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.roll_back(base.as_deref(), file_name);
                Err(e)
            }
        }
    }

    fn commit_and_push(&self, file_name: &str, title: &str) -> Result<()> {
        self.git(["add", "--", file_name])?;

        let pending = self.git(["status", "--porcelain", "--", file_name])?;
        if pending.trim().is_empty() {
            info!("page unchanged, nothing to publish");
            return Ok(());
        }

        let message = format!("Update documentation: {title}");
        self.git(["commit", "-q", "-m", message.as_str(), "--", file_name])?;

        let refspec = format!("HEAD:{}", self.branch);
        self.git(["push", "-q", "origin", refspec.as_str()])?;

        info!(branch = %self.branch, "page published");
        Ok(())
    }

    /// Drop the local commit and the page edit left behind by a failed publish.
    fn roll_back(&self, base: Option<&str>, file_name: &str) {
        let reset = match base {
            Some(sha) => self.git(["reset", "-q", "--hard", sha]).map(|_| ()),
            // Unborn branch: forget the first commit and unstage the file.
            None => self
                .git(["update-ref", "-d", "HEAD"])
                .and_then(|_| self.git(["rm", "-q", "--cached", "--ignore-unmatch", "--", file_name]))
                .map(|_| ()),
        };
        let clean = self.git(["clean", "-q", "-f", "--", file_name]).map(|_| ());

        if let Err(e) = reset.and(clean) {
            warn!(file = file_name, error = %e, "could not roll back failed publish");
        } else {
            info!(file = file_name, "failed publish rolled back");
        }
    }

    fn git<const N: usize>(&self, args: [&str; N]) -> Result<String> {
        run_git(&self.work_dir, args).map_err(|e| redact(e, self.secret.as_deref()))
    }
}

/// Token embedded in an `https://<token>@host/...` remote, if any.
fn remote_token(remote: &str) -> Option<&str> {
    let rest = remote.strip_prefix("https://")?;
    let (userinfo, _) = rest.split_once('@')?;
    Some(userinfo)
}

fn redact(err: ChangeDocError, secret: Option<&str>) -> ChangeDocError {
    match (err, secret) {
        (ChangeDocError::Git(msg), Some(secret)) if !secret.is_empty() => {
            ChangeDocError::Git(msg.replace(secret, "***"))
        }
        (err, _) => err,
    }
}
