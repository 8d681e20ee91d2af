//! Directory-backed page store.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use changedoc_shared::{ChangeDocError, PageStore, Result};

use crate::publisher::GitPublisher;

/// File name for a page id: spaces and slashes become `-`, plus `.md`.
pub fn page_file_name(page_id: &str) -> String {
    let stem: String = page_id
        .trim()
        .chars()
        .map(|c| if c == ' ' || c == '/' { '-' } else { c })
        .collect();
    format!("{stem}.md")
}

/// Knowledge base stored as `*.md` files in one directory.
///
/// With a [`GitPublisher`] attached, every successful write is committed and
/// pushed before `put` returns; a failed push fails the write.
#[derive(Debug)]
pub struct WikiStore {
    root: PathBuf,
    publisher: Option<GitPublisher>,
}

impl WikiStore {
    /// Plain local directory, created if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| ChangeDocError::io(&root, e))?;
        Ok(Self {
            root,
            publisher: None,
        })
    }

    /// Store rooted at the publisher's working copy.
    pub fn published(publisher: GitPublisher) -> Self {
        Self {
            root: publisher.work_dir().to_path_buf(),
            publisher: Some(publisher),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_published(&self) -> bool {
        self.publisher.is_some()
    }

    fn page_path(&self, page_id: &str) -> Result<PathBuf> {
        let id = page_id.trim();
        if id.is_empty() || id.starts_with('.') || id.contains('\\') {
            return Err(ChangeDocError::validation(format!(
                "invalid page id: {page_id:?}"
            )));
        }
        Ok(self.root.join(page_file_name(id)))
    }
}

impl PageStore for WikiStore {
    fn list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| ChangeDocError::io(&self.root, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ChangeDocError::io(&self.root, e))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        debug!(pages = ids.len(), root = %self.root.display(), "listed wiki pages");
        Ok(ids)
    }

    fn get(&self, page_id: &str) -> Result<Option<String>> {
        let path = self.page_path(page_id)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ChangeDocError::io(path, e)),
        }
    }

    #[instrument(skip(self, content), fields(chars = content.len()))]
    fn put(&self, page_id: &str, content: &str) -> Result<()> {
        let path = self.page_path(page_id)?;
        std::fs::write(&path, content).map_err(|e| ChangeDocError::io(&path, e))?;

        if let Some(publisher) = &self.publisher {
            let file_name = page_file_name(page_id);
            publisher.publish(&file_name, page_id.trim())?;
        }

        info!(path = %path.display(), "page written");
        Ok(())
    }
}
