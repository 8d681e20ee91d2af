//! Keyword classifier for knowledge-base pages.
//!
//! Coarse by intent: a category matches if any of its keywords occurs
//! anywhere in the text, case-insensitively.

use std::collections::BTreeSet;

use changedoc_shared::Category;

/// Table definitions and their vocabulary.
const SCHEMA_KEYWORDS: &[&str] = &[
    "create table",
    "alter table",
    "add column",
    "drop column",
    "primary key",
    "foreign key",
    "index",
    "constraint",
    "database schema",
    "table structure",
    "column",
    "field",
];

/// Networking and API vocabulary.
const INTERFACE_KEYWORDS: &[&str] = &[
    "endpoint",
    "json",
    "request",
    "response",
    "rest",
    "graphql",
    "get ",
    "post ",
    "put ",
    "patch ",
    "delete ",
    "/api/",
];

/// Architecture vocabulary.
const DATA_FLOW_KEYWORDS: &[&str] = &[
    "data flow",
    "pipeline",
    "transformation",
    "mapping",
    "service",
    "controller",
    "repository",
    "entity",
];

/// Keyword families, checked independently.
const FAMILIES: &[(Category, &[&str])] = &[
    (Category::Schema, SCHEMA_KEYWORDS),
    (Category::Interface, INTERFACE_KEYWORDS),
    (Category::DataFlow, DATA_FLOW_KEYWORDS),
];

/// Return every category whose keyword family occurs in `content`.
pub fn classify(content: &str) -> BTreeSet<Category> {
    let lowered = content.to_lowercase();
    FAMILIES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(category, _)| *category)
        .collect()
}
