//! Page stores for the changedoc knowledge base.
//!
//! - [`WikiStore`]: one markdown file per page in a directory, optionally
//!   published to a GitHub wiki through a [`GitPublisher`].
//! - [`MemoryPageStore`]: process-local map, used for dry runs and tests.

mod memory;
mod publisher;
mod wiki;

pub use memory::MemoryPageStore;
pub use publisher::{GitPublisher, github_wiki_remote, wiki_page_url};
pub use wiki::{WikiStore, page_file_name};
