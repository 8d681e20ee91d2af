//! Shared types, error model, and configuration for changedoc.
//!
//! This crate is the foundation depended on by all other changedoc crates.
//! It provides:
//! - [`ChangeDocError`], the unified error type
//! - Domain types ([`ChangeRecord`], [`PageInfo`], [`KnowledgeBaseSnapshot`],
//!   [`DocumentationStrategy`])
//! - Collaborator traits ([`Advisor`], [`PageStore`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AdvisorConfig, AppConfig, PlannerConfig, PlannerMode, ProviderKind, WikiConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_api_key,
};
pub use error::{ChangeDocError, Result};
pub use traits::{Advisor, PageStore};
pub use types::{
    Category, ChangeRecord, ContentType, DocumentationAction, DocumentationPlan,
    DocumentationStrategy, KnowledgeBaseSnapshot, PageInfo, Priority, SHORT_REF_LEN,
    commit_page_title,
};
