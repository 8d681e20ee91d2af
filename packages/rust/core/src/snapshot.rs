//! Knowledge-base snapshot construction.
//!
//! Rebuilt from scratch on every run; nothing is cached between runs.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use changedoc_shared::{Category, KnowledgeBaseSnapshot, PageInfo, PageStore, Result};

use crate::classifier;

/// Build a snapshot from in-memory page contents keyed by page id.
pub fn build_snapshot<I, K, V>(pages: I) -> KnowledgeBaseSnapshot
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut snapshot = KnowledgeBaseSnapshot::default();
    for (id, content) in pages {
        insert_page(&mut snapshot, page_info(id.into(), content.into()));
    }
    snapshot
}

/// Build a snapshot by reading every page in `store`.
///
/// A page that cannot be read is skipped with a warning. Failing to list the
/// store at all is an error.
#[instrument(skip_all)]
pub fn snapshot_from_store(store: &dyn PageStore) -> Result<KnowledgeBaseSnapshot> {
    let ids = store.list()?;
    let mut snapshot = KnowledgeBaseSnapshot::default();

    for id in ids {
        match store.get(&id) {
            Ok(Some(content)) => insert_page(&mut snapshot, page_info(id, content)),
            Ok(None) => {
                debug!(page = %id, "page listed but not found, skipping");
            }
            Err(e) => {
                warn!(page = %id, error = %e, "failed to read page, skipping");
            }
        }
    }

    info!(
        pages = snapshot.len(),
        schema = snapshot.schema_pages.len(),
        interface = snapshot.interface_pages.len(),
        data_flow = snapshot.data_flow_pages.len(),
        "knowledge base snapshot built"
    );

    Ok(snapshot)
}

/// Classify one page and collect its metadata.
pub fn page_info(id: String, content: String) -> PageInfo {
    PageInfo {
        length: content.chars().count(),
        categories: classifier::classify(&content),
        last_updated: extract_last_updated(&content),
        id,
        raw_content: content,
    }
}

fn insert_page(snapshot: &mut KnowledgeBaseSnapshot, page: PageInfo) {
    for category in &page.categories {
        let index = match category {
            Category::Schema => &mut snapshot.schema_pages,
            Category::Interface => &mut snapshot.interface_pages,
            Category::DataFlow => &mut snapshot.data_flow_pages,
        };
        index.insert(page.id.clone());
    }
    snapshot.pages.insert(page.id.clone(), page);
}

/// Find a "last updated" marker in page content.
///
/// Tried in order: a `**Date:** YYYY-MM-DD` field, a bare
/// `YYYY-MM-DD HH:MM:SS` timestamp, an `Update YYYY-MM-DD` marker.
pub fn extract_last_updated(content: &str) -> Option<String> {
    static PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
        [
            Regex::new(r"\*\*Date:\*\*\s*(\d{4}-\d{2}-\d{2})").expect("valid regex"),
            Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").expect("valid regex"),
            Regex::new(r"Update (\d{4}-\d{2}-\d{2})").expect("valid regex"),
        ]
    });

    PATTERNS
        .iter()
        .find_map(|re| re.captures(content).map(|caps| caps[1].to_string()))
}
