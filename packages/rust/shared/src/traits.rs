//! Collaborator interfaces the engine is written against.
//!
//! The engine never touches the network or the filesystem directly; it is
//! handed an [`Advisor`] and a [`PageStore`] by the caller.

use async_trait::async_trait;

use crate::error::Result;

/// Opaque text-in/text-out oracle (an LLM provider).
///
/// Relevance checks, strategy planning, body generation and page merges all
/// go through this one capability with different prompts.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Send `prompt` and return the raw response text.
    async fn advise(&self, prompt: &str) -> Result<String>;
}

/// Backing store for knowledge-base pages.
///
/// Only single-page atomic writes are expected; there is no locking and no
/// versioning, so concurrent writers race with last-write-wins.
pub trait PageStore: Send + Sync {
    /// Ids of every page currently in the store.
    fn list(&self) -> Result<Vec<String>>;

    /// Read a page. `Ok(None)` means the page does not exist.
    fn get(&self, page_id: &str) -> Result<Option<String>>;

    /// Create or replace a page.
    fn put(&self, page_id: &str, content: &str) -> Result<()>;
}
