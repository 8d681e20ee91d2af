//! Strategy execution: turns a decision plus a documentation body into page writes.
//!
//! Every page is a full read-(merge)-write round trip against the store,
//! processed sequentially. There is no rollback: when several pages are
//! updated and one fails, earlier writes stay and later pages are still tried.

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use changedoc_shared::{
    Advisor, ChangeDocError, ChangeRecord, DocumentationAction, DocumentationStrategy, PageStore,
    Result,
};

/// Label used in appended sections when the strategy has no summary.
const DEFAULT_CHANGES_LABEL: &str = "Data-related changes";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// What happened to a page that was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageChange {
    /// A new page was written with a metadata header.
    Created,
    /// An existing page was replaced by the merged text.
    Merged,
    /// A dated section was appended.
    Appended,
}

/// Outcome for one target page.
#[derive(Debug)]
pub struct PageOutcome {
    pub page_id: String,
    pub result: Result<PageChange>,
}

/// Per-page outcomes of one execution, in processing order.
#[derive(Debug)]
pub struct ExecutionReport {
    pub action: DocumentationAction,
    pub pages: Vec<PageOutcome>,
}

impl ExecutionReport {
    /// True only if every page succeeded.
    pub fn succeeded(&self) -> bool {
        self.pages.iter().all(|p| p.result.is_ok())
    }

    /// Ids of pages that were written.
    pub fn written(&self) -> Vec<&str> {
        self.pages
            .iter()
            .filter(|p| p.result.is_ok())
            .map(|p| p.page_id.as_str())
            .collect()
    }

    /// Pages that failed, with their errors.
    pub fn failures(&self) -> Vec<(&str, &ChangeDocError)> {
        self.pages
            .iter()
            .filter_map(|p| p.result.as_ref().err().map(|e| (p.page_id.as_str(), e)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Applies a [`DocumentationStrategy`] to a page store.
///
/// The advisor is only used to merge new content into existing pages.
pub struct StrategyExecutor<'a> {
    store: &'a dyn PageStore,
    advisor: &'a dyn Advisor,
    date: NaiveDate,
}

impl<'a> StrategyExecutor<'a> {
    /// `date` stamps created pages and appended sections.
    pub fn new(store: &'a dyn PageStore, advisor: &'a dyn Advisor, date: NaiveDate) -> Self {
        Self {
            store,
            advisor,
            date,
        }
    }

    /// Execute `strategy` with the generated `body`.
    ///
    /// Returns `Err` only for configuration problems (unknown action, no
    /// target pages). Page-level failures are reported in the
    /// [`ExecutionReport`].
    #[instrument(skip_all, fields(action = strategy.action().as_str()))]
    pub async fn execute(
        &self,
        strategy: &DocumentationStrategy,
        body: &str,
        change: &ChangeRecord,
    ) -> Result<ExecutionReport> {
        let action = strategy.action();
        let targets = strategy.target_pages();

        let Some(first) = targets.first() else {
            return Err(ChangeDocError::config("strategy names no target pages"));
        };

        let mut pages = Vec::with_capacity(targets.len());
        match action {
            DocumentationAction::Unknown => {
                return Err(ChangeDocError::config(
                    "unrecognized documentation action in strategy",
                ));
            }
            DocumentationAction::CreateNewPage => {
                pages.push(self.outcome(first, self.create(first, strategy, body, change)));
            }
            DocumentationAction::UpdateExistingPage => {
                let result = self.update(first, strategy, body, change).await;
                pages.push(self.outcome(first, result));
            }
            DocumentationAction::AppendToPage => {
                pages.push(self.outcome(first, self.append(first, strategy, body, change)));
            }
            DocumentationAction::UpdateMultiplePages => {
                for page_id in targets {
                    let result = self.update(page_id, strategy, body, change).await;
                    pages.push(self.outcome(page_id, result));
                }
            }
        }

        let report = ExecutionReport { action, pages };
        info!(
            written = report.written().len(),
            failed = report.failures().len(),
            "strategy executed"
        );
        Ok(report)
    }

    fn outcome(&self, page_id: &str, result: Result<PageChange>) -> PageOutcome {
        match &result {
            Ok(change) => info!(page = %page_id, ?change, "page written"),
            Err(e) => warn!(page = %page_id, error = %e, "page update failed"),
        }
        PageOutcome {
            page_id: page_id.to_string(),
            result,
        }
    }

    fn create(
        &self,
        page_id: &str,
        strategy: &DocumentationStrategy,
        body: &str,
        change: &ChangeRecord,
    ) -> Result<PageChange> {
        let content = new_page_content(page_id, strategy, body, change, self.date);
        self.store.put(page_id, &content)?;
        Ok(PageChange::Created)
    }

    async fn update(
        &self,
        page_id: &str,
        strategy: &DocumentationStrategy,
        body: &str,
        change: &ChangeRecord,
    ) -> Result<PageChange> {
        let Some(existing) = self.store.get(page_id)? else {
            info!(page = %page_id, "target page does not exist yet, creating it");
            return self.create(page_id, strategy, body, change);
        };

        let prompt = merge_prompt(page_id, &existing, body, strategy, self.date);
        let merged = self.advisor.advise(&prompt).await?;
        if merged.trim().is_empty() {
            return Err(ChangeDocError::validation(format!(
                "merge for '{page_id}' returned empty content"
            )));
        }

        self.store.put(page_id, &merged)?;
        Ok(PageChange::Merged)
    }

    fn append(
        &self,
        page_id: &str,
        strategy: &DocumentationStrategy,
        body: &str,
        change: &ChangeRecord,
    ) -> Result<PageChange> {
        let existing = self
            .store
            .get(page_id)?
            .unwrap_or_else(|| format!("# {page_id}\n"));

        let content = format!(
            "{}{}",
            existing.trim_end(),
            appended_section(strategy, body, change, self.date)
        );
        self.store.put(page_id, &content)?;
        Ok(PageChange::Appended)
    }
}

// ---------------------------------------------------------------------------
// Page text
// ---------------------------------------------------------------------------

/// Full text of a newly created page: metadata header, rule, body.
pub fn new_page_content(
    page_id: &str,
    strategy: &DocumentationStrategy,
    body: &str,
    change: &ChangeRecord,
    date: NaiveDate,
) -> String {
    let mut content = format!(
        "# {page_id}\n\n\
         **Date:** {date}  \n\
         **Commit:** `{commit}`  \n\
         **Summary:** {summary}  \n\
         **Trigger:** {trigger}  \n\
         **Content Type:** {content_type}\n\n\
         ---\n\n\
         {body}",
        date = date.format("%Y-%m-%d"),
        commit = change.short_ref(),
        summary = change.headline(),
        trigger = strategy.reasoning,
        content_type = strategy.plan.content_type,
        body = body.trim(),
    );
    content.push('\n');
    content
}

/// Dated section appended to an existing page.
fn appended_section(
    strategy: &DocumentationStrategy,
    body: &str,
    change: &ChangeRecord,
    date: NaiveDate,
) -> String {
    let label = match strategy.changes_summary.trim() {
        "" => DEFAULT_CHANGES_LABEL,
        summary => summary,
    };
    format!(
        "\n\n---\n\n\
         ## Update {date}\n\n\
         **Commit:** `{commit}`  \n\
         **Changes:** {label}\n\n\
         {body}\n",
        date = date.format("%Y-%m-%d"),
        commit = change.short_ref(),
        body = body.trim(),
    )
}

/// Prompt asking the advisor for the complete replacement text of a page.
pub fn merge_prompt(
    page_id: &str,
    existing: &str,
    body: &str,
    strategy: &DocumentationStrategy,
    date: NaiveDate,
) -> String {
    let mut hints = String::new();
    if !strategy.plan.sections_to_update.is_empty() {
        hints.push_str(&format!(
            "Sections to update: {}\n",
            strategy.plan.sections_to_update.join(", ")
        ));
    }
    if !strategy.plan.new_sections_needed.is_empty() {
        hints.push_str(&format!(
            "New sections needed: {}\n",
            strategy.plan.new_sections_needed.join(", ")
        ));
    }

    format!(
        "You are updating the knowledge-base page \"{page_id}\" with new documentation.

EXISTING PAGE:
{existing}

NEW INFORMATION:
{body}

{hints}
Produce the COMPLETE updated page in Markdown:
- Fold the new information into the existing structure instead of appending it blindly
- Add a \"(updated {date})\" note next to changed sections where appropriate
- Do not duplicate material that is already on the page
- Keep existing content that the change does not affect

Respond with the page content only, no commentary.
",
        date = date.format("%Y-%m-%d"),
    )
}
