//! Strategy planning: relevance pre-filter and the documentation decision.
//!
//! Both stages are single calls to the same [`Advisor`] with different
//! prompts. Neither stage retries, and neither lets a provider failure abort
//! the run.

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use changedoc_shared::{
    Advisor, ChangeRecord, ContentType, DocumentationAction, DocumentationPlan,
    DocumentationStrategy, KnowledgeBaseSnapshot, PlannerConfig, PlannerMode, Priority,
    commit_page_title,
};

use crate::extractor;

/// Marker the advisor uses to reject a change in the relevance stage.
pub const NOT_RELEVANT: &str = "NOT_RELEVANT";

/// Appended to any truncated prompt section.
const TRUNCATION_MARKER: &str = "[... truncated ...]";

/// Outcome of the relevance pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    Relevant,
    NotRelevant,
}

// ---------------------------------------------------------------------------
// Relevance stage
// ---------------------------------------------------------------------------

/// Ask the advisor whether the change has data-related effects.
///
/// A response containing [`NOT_RELEVANT`] anywhere rejects the change. A
/// failed or empty response counts as relevant.
#[instrument(skip_all, fields(reference = %change.short_ref()))]
pub async fn check_relevance(
    change: &ChangeRecord,
    advisor: &dyn Advisor,
    config: &PlannerConfig,
) -> Relevance {
    let prompt = relevance_prompt(change, config.relevance_diff_budget);

    match advisor.advise(&prompt).await {
        Ok(response) if response.contains(NOT_RELEVANT) => {
            info!("advisor determined changes are not data-related");
            Relevance::NotRelevant
        }
        Ok(response) if response.trim().is_empty() => {
            warn!("empty relevance response, treating change as relevant");
            Relevance::Relevant
        }
        Ok(_) => {
            info!("advisor detected data-related changes");
            Relevance::Relevant
        }
        Err(e) => {
            warn!(error = %e, "relevance check failed, treating change as relevant");
            Relevance::Relevant
        }
    }
}

/// Prompt for the RELEVANT / NOT_RELEVANT pre-filter.
pub fn relevance_prompt(change: &ChangeRecord, diff_budget: usize) -> String {
    format!(
        "Analyze the following code changes to determine if they contain any data-related \
modifications that would benefit from documentation.

Commit Message: {message}
Files Changed: {files}

CODE CHANGES:
{diff}

Look for ANY of these patterns (regardless of file type or naming convention):

1. **Database Schema Changes**: CREATE TABLE, ALTER TABLE, ADD COLUMN, DROP COLUMN, CREATE INDEX
2. **SQL Query Changes**: SELECT statements, WHERE clauses, JOIN operations, new or modified queries
3. **Data Mapping**: Object mapping, field assignments, data transformation code
4. **API Response Changes**: New fields in JSON responses, modified data structures
5. **Data Processing Logic**: How data is filtered, aggregated, or transformed
6. **Configuration Changes**: Database connections, data source settings
7. **Migration Scripts**: Data migration or cleanup scripts

Respond with either:
- \"RELEVANT\" if you find data-related changes that could benefit from documentation
- \"NOT_RELEVANT\" if the changes are purely UI, styling, logging, or other non-data related

Be inclusive - if there's any doubt, respond with \"RELEVANT\".
",
        message = change.summary,
        files = change.file_paths.join(", "),
        diff = truncate_chars(&change.diff, diff_budget),
    )
}

// ---------------------------------------------------------------------------
// Strategy stage
// ---------------------------------------------------------------------------

/// Decide whether and how to document `change`.
///
/// Always returns a usable strategy. In [`PlannerMode::Simple`] no advisory
/// call is made. Otherwise exactly one call is made and its response goes
/// through the extractor; a failed or empty response takes the extractor's
/// fallback path with the commit page as target.
#[instrument(skip_all, fields(reference = %change.short_ref(), pages = snapshot.len()))]
pub async fn plan(
    change: &ChangeRecord,
    snapshot: &KnowledgeBaseSnapshot,
    advisor: &dyn Advisor,
    config: &PlannerConfig,
    date: NaiveDate,
) -> DocumentationStrategy {
    let commit_page = commit_page_title(date, change);

    if config.mode == PlannerMode::Simple {
        return simple_strategy(change, commit_page);
    }

    let prompt = strategy_prompt(change, snapshot, config);
    let raw = match advisor.advise(&prompt).await {
        Ok(response) if !response.trim().is_empty() => response,
        Ok(_) => {
            warn!("empty strategy response from advisor");
            String::new()
        }
        Err(e) => {
            warn!(error = %e, "strategy request failed");
            String::new()
        }
    };

    let strategy = extractor::extract_or(&raw, &commit_page);
    info!(
        needs_documentation = strategy.needs_documentation,
        action = strategy.action().as_str(),
        targets = ?strategy.target_pages(),
        "documentation strategy decided"
    );
    strategy
}

/// The single-stage behavior: one new page per commit, no questions asked.
fn simple_strategy(change: &ChangeRecord, commit_page: String) -> DocumentationStrategy {
    DocumentationStrategy {
        needs_documentation: true,
        reasoning: "simple mode: every data-related change gets its own page".into(),
        changes_summary: change.headline().to_string(),
        plan: DocumentationPlan {
            action: DocumentationAction::CreateNewPage,
            target_pages: vec![commit_page],
            content_type: ContentType::Mixed,
            priority: Priority::Medium,
            ..Default::default()
        },
    }
}

/// Prompt for the strategy decision.
pub fn strategy_prompt(
    change: &ChangeRecord,
    snapshot: &KnowledgeBaseSnapshot,
    config: &PlannerConfig,
) -> String {
    format!(
        "You maintain a knowledge base that documents the data-related effects of code changes.
Decide whether the change below needs documentation and, if so, how the knowledge base should be updated.

EXISTING KNOWLEDGE BASE:
{kb}

CHANGE:
Commit Message: {message}
Files Changed: {files}

CODE CHANGES:
{diff}

Choose one action:
- \"create_new_page\": no existing page covers this topic
- \"update_existing_page\": one existing page covers it and should be revised
- \"append_to_page\": an existing page is a running log; add a dated section
- \"update_multiple_pages\": several existing pages are affected

Prefer updating a page that already covers the affected tables, endpoints or flows over creating a new one.
Use exact page names from the knowledge base above for existing pages.

Respond with ONLY a JSON object of this shape:
{{
  \"needs_documentation\": true,
  \"reasoning\": \"why\",
  \"changes_summary\": \"one line describing the change\",
  \"documentation_strategy\": {{
    \"action\": \"create_new_page | update_existing_page | append_to_page | update_multiple_pages\",
    \"target_pages\": [\"Page Name\"],
    \"primary_page\": \"Page Name\",
    \"content_type\": \"schema | interface | data_flow | mixed\",
    \"priority\": \"low | medium | high\",
    \"sections_to_update\": [],
    \"new_sections_needed\": []
  }}
}}
",
        kb = render_snapshot(snapshot, config.preview_chars),
        message = change.summary,
        files = change.file_paths.join(", "),
        diff = truncate_chars(&change.diff, config.diff_budget),
    )
}

/// Render the snapshot for a prompt: one entry per page with its flags,
/// last-updated date and a bounded preview, then the category indices.
pub fn render_snapshot(snapshot: &KnowledgeBaseSnapshot, preview_chars: usize) -> String {
    use changedoc_shared::Category;
    use std::fmt::Write;

    if snapshot.is_empty() {
        return "(the knowledge base has no pages yet)".to_string();
    }

    let mut out = String::new();
    for page in snapshot.pages.values() {
        let _ = writeln!(
            out,
            "- {id} ({len} chars) schema={schema} interface={interface} data_flow={flow} last_updated={updated}",
            id = page.id,
            len = page.length,
            schema = page.has(Category::Schema),
            interface = page.has(Category::Interface),
            flow = page.has(Category::DataFlow),
            updated = page.last_updated.as_deref().unwrap_or("unknown"),
        );
        let preview = truncate_chars(page.raw_content.trim(), preview_chars).replace('\n', " ");
        let _ = writeln!(out, "  Preview: {preview}");
    }

    let join = |ids: &std::collections::BTreeSet<String>| {
        if ids.is_empty() {
            "(none)".to_string()
        } else {
            ids.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let _ = writeln!(out);
    let _ = writeln!(out, "Schema pages: {}", join(&snapshot.schema_pages));
    let _ = writeln!(out, "Interface pages: {}", join(&snapshot.interface_pages));
    let _ = write!(out, "Data flow pages: {}", join(&snapshot.data_flow_pages));

    out
}

/// Truncate to at most `max_chars` characters, appending a marker when cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((idx, _)) => format!("{}\n{TRUNCATION_MARKER}", &text[..idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::build_snapshot;
    use crate::testing::ScriptedAdvisor;
    use changedoc_shared::ChangeDocError;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date")
    }

    fn change() -> ChangeRecord {
        ChangeRecord {
            reference: "a1b2c3d4e5f6".into(),
            summary: "Add email to users".into(),
            file_paths: vec!["migrations/002.sql".into(), "src/user.rs".into()],
            diff: "+ALTER TABLE users ADD COLUMN email TEXT;".into(),
        }
    }

    #[test]
    fn truncate_short_content() {
        assert_eq!(truncate_chars("short text", 100), "short text");
    }

    #[test]
    fn truncate_long_content() {
        let result = truncate_chars(&"a".repeat(200), 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(!result.starts_with(&"a".repeat(101)));
        assert!(result.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let result = truncate_chars(&"é".repeat(10), 3);
        assert!(result.starts_with("ééé\n"));
    }

    #[test]
    fn render_snapshot_lists_flags_and_preview() {
        let long = format!("**Date:** 2025-01-02\nCREATE TABLE users; {}", "x".repeat(500));
        let snapshot = build_snapshot([("Database Schema", long.as_str()), ("Home", "Welcome")]);
        let rendered = render_snapshot(&snapshot, 200);

        assert!(rendered.contains(
            "- Database Schema (541 chars) schema=true interface=false data_flow=false last_updated=2025-01-02"
        ));
        assert!(rendered.contains("- Home (7 chars) schema=false interface=false data_flow=false last_updated=unknown"));
        assert!(rendered.contains(TRUNCATION_MARKER));
        assert!(!rendered.contains(&"x".repeat(300)));
        assert!(rendered.contains("Schema pages: Database Schema"));
        assert!(rendered.contains("Interface pages: (none)"));
    }

    #[test]
    fn strategy_prompt_bounds_diff() {
        let mut c = change();
        c.diff = "y".repeat(20_000);
        let config = PlannerConfig::default();
        let prompt = strategy_prompt(&c, &KnowledgeBaseSnapshot::default(), &config);
        assert!(prompt.contains(&"y".repeat(12_000)));
        assert!(!prompt.contains(&"y".repeat(12_001)));
        assert!(prompt.contains("migrations/002.sql, src/user.rs"));
        assert!(prompt.contains("no pages yet"));
    }

    #[tokio::test]
    async fn not_relevant_anywhere_in_response() {
        let advisor = ScriptedAdvisor::replying(["NOT_RELEVANT extra text"]);
        let verdict = check_relevance(&change(), &advisor, &PlannerConfig::default()).await;
        assert_eq!(verdict, Relevance::NotRelevant);
        assert!(advisor.prompts()[0].contains("Add email to users"));
    }

    #[tokio::test]
    async fn relevance_failure_counts_as_relevant() {
        let advisor = ScriptedAdvisor::new([Err(ChangeDocError::Provider {
            status: 500,
            body: "boom".into(),
        })]);
        let verdict = check_relevance(&change(), &advisor, &PlannerConfig::default()).await;
        assert_eq!(verdict, Relevance::Relevant);
    }

    #[tokio::test]
    async fn plan_parses_advisor_decision() {
        let advisor = ScriptedAdvisor::replying([r#"```json
{"needs_documentation": true, "reasoning": "schema change",
 "documentation_strategy": {"action": "append_to_page", "target_pages": ["Schema Log"]}}
```"#]);
        let snapshot = build_snapshot([("Schema Log", "column history")]);
        let s = plan(&change(), &snapshot, &advisor, &PlannerConfig::default(), date()).await;
        assert_eq!(s.action(), DocumentationAction::AppendToPage);
        assert_eq!(s.target_pages(), ["Schema Log"]);
        assert_eq!(advisor.calls(), 1);
        assert!(advisor.prompts()[0].contains("- Schema Log ("));
    }

    #[tokio::test]
    async fn plan_failure_falls_back_to_commit_page() {
        let advisor = ScriptedAdvisor::new([Err(ChangeDocError::Network("timeout".into()))]);
        let s = plan(
            &change(),
            &KnowledgeBaseSnapshot::default(),
            &advisor,
            &PlannerConfig::default(),
            date(),
        )
        .await;
        assert!(s.needs_documentation);
        assert_eq!(s.reasoning, extractor::FALLBACK_REASONING);
        assert_eq!(s.target_pages(), ["Data-Changes-2026-05-04-a1b2c3d4"]);
        assert_eq!(advisor.calls(), 1);
    }

    #[tokio::test]
    async fn plan_empty_response_falls_back() {
        let advisor = ScriptedAdvisor::replying(["   "]);
        let s = plan(
            &change(),
            &KnowledgeBaseSnapshot::default(),
            &advisor,
            &PlannerConfig::default(),
            date(),
        )
        .await;
        assert_eq!(s.reasoning, extractor::FALLBACK_REASONING);
    }

    #[tokio::test]
    async fn simple_mode_skips_advisor() {
        let advisor = ScriptedAdvisor::replying(Vec::<String>::new());
        let config = PlannerConfig {
            mode: PlannerMode::Simple,
            ..Default::default()
        };
        let s = plan(&change(), &KnowledgeBaseSnapshot::default(), &advisor, &config, date()).await;
        assert!(s.needs_documentation);
        assert_eq!(s.action(), DocumentationAction::CreateNewPage);
        assert_eq!(s.target_pages(), ["Data-Changes-2026-05-04-a1b2c3d4"]);
        assert_eq!(advisor.calls(), 0);
    }
}
