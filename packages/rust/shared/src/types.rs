//! Core domain types: change records, page snapshots, and documentation strategies.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of characters of a commit reference used in page names and headers.
pub const SHORT_REF_LEN: usize = 8;

// ---------------------------------------------------------------------------
// ChangeRecord
// ---------------------------------------------------------------------------

/// A single source-control change, as produced by the change source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Commit reference (usually a full SHA).
    pub reference: String,
    /// Commit message.
    pub summary: String,
    /// Paths touched by the change, in the order reported by git.
    #[serde(default)]
    pub file_paths: Vec<String>,
    /// Full patch text. May be very large.
    #[serde(default)]
    pub diff: String,
}

impl ChangeRecord {
    /// First [`SHORT_REF_LEN`] characters of the reference.
    pub fn short_ref(&self) -> &str {
        match self.reference.char_indices().nth(SHORT_REF_LEN) {
            Some((idx, _)) => &self.reference[..idx],
            None => &self.reference,
        }
    }

    /// First line of the commit message.
    pub fn headline(&self) -> &str {
        self.summary.lines().next().unwrap_or("").trim()
    }

    /// Whether the change carries no patch text at all.
    pub fn is_empty(&self) -> bool {
        self.diff.trim().is_empty()
    }
}

/// Default page title for documentation of a single commit:
/// `Data-Changes-<YYYY-MM-DD>-<sha8>`.
pub fn commit_page_title(date: NaiveDate, change: &ChangeRecord) -> String {
    format!("Data-Changes-{}-{}", date.format("%Y-%m-%d"), change.short_ref())
}

// ---------------------------------------------------------------------------
// Pages and snapshots
// ---------------------------------------------------------------------------

/// Topic category a page may belong to. Categories are not exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Schema,
    Interface,
    DataFlow,
}

/// Metadata for one existing knowledge-base page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page identifier (title).
    pub id: String,
    /// Full page text.
    pub raw_content: String,
    /// Content length in characters.
    pub length: usize,
    /// Categories detected in the content.
    pub categories: BTreeSet<Category>,
    /// Last-updated date found in the content, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl PageInfo {
    /// Whether the page was classified under `category`.
    pub fn has(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// Point-in-time summary of every page in the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseSnapshot {
    /// Pages keyed by id.
    pub pages: BTreeMap<String, PageInfo>,
    /// Ids of pages classified as [`Category::Schema`].
    pub schema_pages: BTreeSet<String>,
    /// Ids of pages classified as [`Category::Interface`].
    pub interface_pages: BTreeSet<String>,
    /// Ids of pages classified as [`Category::DataFlow`].
    pub data_flow_pages: BTreeSet<String>,
}

impl KnowledgeBaseSnapshot {
    /// Number of pages in the snapshot.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the knowledge base has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DocumentationStrategy
// ---------------------------------------------------------------------------

/// How the knowledge base should be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentationAction {
    #[default]
    CreateNewPage,
    UpdateExistingPage,
    AppendToPage,
    UpdateMultiplePages,
    /// Any action name the engine does not know. Rejected at execution time.
    #[serde(other)]
    Unknown,
}

impl DocumentationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateNewPage => "create_new_page",
            Self::UpdateExistingPage => "update_existing_page",
            Self::AppendToPage => "append_to_page",
            Self::UpdateMultiplePages => "update_multiple_pages",
            Self::Unknown => "unknown",
        }
    }
}

/// Kind of content the documentation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Schema,
    #[serde(alias = "api")]
    Interface,
    DataFlow,
    #[default]
    #[serde(other)]
    Mixed,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Interface => "interface",
            Self::DataFlow => "data_flow",
            Self::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency the advisor attached to the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    High,
    #[default]
    #[serde(other)]
    Medium,
}

/// The `documentation_strategy` object of a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationPlan {
    #[serde(default)]
    pub action: DocumentationAction,
    /// Pages to touch, in order. Never empty when documentation is needed.
    #[serde(default)]
    pub target_pages: Vec<String>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_page: Option<String>,
    #[serde(default)]
    pub sections_to_update: Vec<String>,
    #[serde(default)]
    pub new_sections_needed: Vec<String>,
}

/// Structured decision on whether and how to document a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationStrategy {
    pub needs_documentation: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub changes_summary: String,
    #[serde(rename = "documentation_strategy", default)]
    pub plan: DocumentationPlan,
}

impl DocumentationStrategy {
    /// Target page ids, in order.
    pub fn target_pages(&self) -> &[String] {
        &self.plan.target_pages
    }

    pub fn action(&self) -> DocumentationAction {
        self.plan.action
    }
}
