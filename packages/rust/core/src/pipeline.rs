//! End-to-end run: change → relevance → snapshot → strategy → body → pages.

use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, instrument};

use changedoc_shared::{
    Advisor, ChangeRecord, DocumentationStrategy, PageStore, PlannerConfig, Result,
};

use crate::executor::{ExecutionReport, StrategyExecutor};
use crate::planner::{self, Relevance};
use crate::{generator, snapshot};

/// Configuration for one run of the engine.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Planner settings (mode, prompt budgets, relevance pre-filter).
    pub planner: PlannerConfig,
    /// Decide and generate, but skip the executor.
    pub dry_run: bool,
    /// Date stamped on page names and headers.
    pub date: NaiveDate,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing to document. Neutral, not an error.
    NoDocumentationNeeded { reason: String },
    /// Dry run: the executor was skipped.
    DryRun {
        strategy: DocumentationStrategy,
        body: String,
    },
    /// Every target page was written.
    Applied {
        strategy: DocumentationStrategy,
        report: ExecutionReport,
    },
    /// At least one page failed. Successful writes are not rolled back.
    Failed {
        strategy: DocumentationStrategy,
        report: ExecutionReport,
    },
}

impl RunOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::NoDocumentationNeeded {
            reason: reason.into(),
        }
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the run completes.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

/// Run the documentation engine for one change.
///
/// 1. Relevance pre-filter (optional, one advisory call)
/// 2. Snapshot the knowledge base
/// 3. Plan a strategy (one advisory call unless in simple mode)
/// 4. Generate the documentation body (one advisory call)
/// 5. Execute the strategy, or stop here on a dry run
///
/// Errors are reserved for fatal problems: the store cannot be listed or the
/// strategy is misconfigured.
#[instrument(skip_all, fields(reference = %change.short_ref(), dry_run = config.dry_run))]
pub async fn run(
    change: &ChangeRecord,
    advisor: &dyn Advisor,
    store: &dyn PageStore,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunOutcome> {
    let start = Instant::now();
    let outcome = run_stages(change, advisor, store, config, progress).await?;
    progress.done(&outcome);

    info!(
        outcome = outcome_label(&outcome),
        elapsed_ms = start.elapsed().as_millis(),
        "run complete"
    );
    Ok(outcome)
}

async fn run_stages(
    change: &ChangeRecord,
    advisor: &dyn Advisor,
    store: &dyn PageStore,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunOutcome> {
    if change.is_empty() {
        return Ok(RunOutcome::skipped("no code changes found"));
    }

    // --- Phase 1: Relevance ---
    if config.planner.relevance_check {
        progress.phase("Checking relevance");
        if planner::check_relevance(change, advisor, &config.planner).await
            == Relevance::NotRelevant
        {
            return Ok(RunOutcome::skipped("changes are not data-related"));
        }
    }

    // --- Phase 2: Snapshot ---
    progress.phase("Reading knowledge base");
    let snapshot = snapshot::snapshot_from_store(store)?;

    // --- Phase 3: Strategy ---
    progress.phase("Planning documentation strategy");
    let strategy = planner::plan(change, &snapshot, advisor, &config.planner, config.date).await;
    if !strategy.needs_documentation {
        let reason = format!("advisor declined: {}", strategy.reasoning);
        return Ok(RunOutcome::skipped(reason));
    }

    // --- Phase 4: Body ---
    progress.phase("Generating documentation");
    let Some(body) = generator::generate_body(change, advisor, config.planner.body_diff_budget).await
    else {
        return Ok(RunOutcome::skipped("no documentation update needed"));
    };

    if config.dry_run {
        return Ok(RunOutcome::DryRun { strategy, body });
    }

    // --- Phase 5: Execute ---
    progress.phase("Updating knowledge base");
    let executor = StrategyExecutor::new(store, advisor, config.date);
    let report = executor.execute(&strategy, &body, change).await?;

    if report.succeeded() {
        Ok(RunOutcome::Applied { strategy, report })
    } else {
        Ok(RunOutcome::Failed { strategy, report })
    }
}

fn outcome_label(outcome: &RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::NoDocumentationNeeded { .. } => "no_documentation_needed",
        RunOutcome::DryRun { .. } => "dry_run",
        RunOutcome::Applied { .. } => "applied",
        RunOutcome::Failed { .. } => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, ScriptedAdvisor};
    use changedoc_shared::{ChangeDocError, PlannerMode};

    fn config() -> RunConfig {
        RunConfig {
            planner: PlannerConfig::default(),
            dry_run: false,
            date: NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date"),
        }
    }

    fn change() -> ChangeRecord {
        ChangeRecord {
            reference: "cafebabe1234".into(),
            summary: "Add orders.total".into(),
            file_paths: vec!["db/003_total.sql".into()],
            diff: "+ALTER TABLE orders ADD COLUMN total NUMERIC;".into(),
        }
    }

    const DECISION: &str = r#"{"needs_documentation": true, "reasoning": "new column",
        "changes_summary": "orders.total",
        "documentation_strategy": {"action": "update_existing_page", "target_pages": ["Database Schema"]}}"#;

    #[tokio::test]
    async fn not_relevant_stops_before_store() {
        let advisor = ScriptedAdvisor::replying(["NOT_RELEVANT extra text"]);
        let store = MemoryStore::with_pages([("Database Schema", "tables")]);

        let outcome = run(&change(), &advisor, &store, &config(), &SilentProgress)
            .await
            .expect("run");

        assert!(matches!(outcome, RunOutcome::NoDocumentationNeeded { .. }));
        assert_eq!(store.total_calls(), 0);
        assert_eq!(advisor.calls(), 1);
    }

    #[tokio::test]
    async fn sentinel_body_skips_executor() {
        let advisor = ScriptedAdvisor::replying(["RELEVANT", DECISION, "NO_DOCUMENTATION_NEEDED"]);
        let store = MemoryStore::with_pages([("Database Schema", "tables")]);

        let outcome = run(&change(), &advisor, &store, &config(), &SilentProgress)
            .await
            .expect("run");

        assert!(matches!(outcome, RunOutcome::NoDocumentationNeeded { .. }));
        assert!(store.put_attempts().is_empty());
        assert_eq!(advisor.calls(), 3);
    }

    #[tokio::test]
    async fn full_run_merges_existing_page() {
        let advisor = ScriptedAdvisor::replying([
            "RELEVANT",
            DECISION,
            "## orders.total\n\nStores the order total.",
            "# Database Schema\n\ntables\n\n## orders.total (updated 2026-07-01)",
        ]);
        let store = MemoryStore::with_pages([("Database Schema", "# Database Schema\n\ntables")]);

        let outcome = run(&change(), &advisor, &store, &config(), &SilentProgress)
            .await
            .expect("run");

        match outcome {
            RunOutcome::Applied { report, .. } => assert_eq!(report.written(), ["Database Schema"]),
            other => panic!("expected Applied, got {other:?}"),
        }
        assert_eq!(
            store.page("Database Schema").as_deref(),
            Some("# Database Schema\n\ntables\n\n## orders.total (updated 2026-07-01)")
        );
        assert_eq!(advisor.calls(), 4);
        assert!(advisor.prompts()[1].contains("- Database Schema ("));
    }

    #[tokio::test]
    async fn dry_run_skips_executor() {
        let advisor = ScriptedAdvisor::replying(["RELEVANT", DECISION, "## Body"]);
        let store = MemoryStore::with_pages([("Database Schema", "tables")]);
        let mut cfg = config();
        cfg.dry_run = true;

        let outcome = run(&change(), &advisor, &store, &cfg, &SilentProgress)
            .await
            .expect("run");

        match outcome {
            RunOutcome::DryRun { body, strategy } => {
                assert_eq!(body, "## Body");
                assert_eq!(strategy.target_pages(), ["Database Schema"]);
            }
            other => panic!("expected DryRun, got {other:?}"),
        }
        assert!(store.put_attempts().is_empty());
    }

    #[tokio::test]
    async fn declined_strategy_is_neutral() {
        let advisor = ScriptedAdvisor::replying([
            "RELEVANT",
            r#"{"needs_documentation": false, "reasoning": "already documented"}"#,
        ]);
        let store = MemoryStore::default();

        let outcome = run(&change(), &advisor, &store, &config(), &SilentProgress)
            .await
            .expect("run");

        match outcome {
            RunOutcome::NoDocumentationNeeded { reason } => {
                assert!(reason.contains("already documented"))
            }
            other => panic!("expected NoDocumentationNeeded, got {other:?}"),
        }
        assert_eq!(advisor.calls(), 2);
    }

    #[tokio::test]
    async fn unparseable_strategy_creates_commit_page() {
        let advisor = ScriptedAdvisor::replying(["RELEVANT", "I would update the schema page.", "## Body"]);
        let store = MemoryStore::default();

        let outcome = run(&change(), &advisor, &store, &config(), &SilentProgress)
            .await
            .expect("run");

        assert!(matches!(outcome, RunOutcome::Applied { .. }));
        let page = store
            .page("Data-Changes-2026-07-01-cafebabe")
            .expect("commit page created");
        assert!(page.contains("**Trigger:** fallback: could not interpret advisory response"));
    }

    #[tokio::test]
    async fn failed_page_write_reports_failure() {
        let advisor = ScriptedAdvisor::replying(["RELEVANT", DECISION, "## Body", "merged"]);
        let store =
            MemoryStore::with_pages([("Database Schema", "tables")]).failing_put("Database Schema");

        let outcome = run(&change(), &advisor, &store, &config(), &SilentProgress)
            .await
            .expect("run");

        assert!(matches!(outcome, RunOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn simple_mode_without_relevance_check() {
        let advisor = ScriptedAdvisor::replying(["## Body"]);
        let store = MemoryStore::default();
        let mut cfg = config();
        cfg.planner.mode = PlannerMode::Simple;
        cfg.planner.relevance_check = false;

        let outcome = run(&change(), &advisor, &store, &cfg, &SilentProgress)
            .await
            .expect("run");

        assert!(matches!(outcome, RunOutcome::Applied { .. }));
        assert!(store.page("Data-Changes-2026-07-01-cafebabe").is_some());
        assert_eq!(advisor.calls(), 1);
    }

    #[tokio::test]
    async fn empty_diff_makes_no_calls() {
        let advisor = ScriptedAdvisor::replying(Vec::<String>::new());
        let store = MemoryStore::default();
        let mut c = change();
        c.diff = "  \n".into();

        let outcome = run(&c, &advisor, &store, &config(), &SilentProgress)
            .await
            .expect("run");

        assert!(matches!(outcome, RunOutcome::NoDocumentationNeeded { .. }));
        assert_eq!(advisor.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_action_is_fatal() {
        let advisor = ScriptedAdvisor::replying([
            "RELEVANT",
            r#"{"needs_documentation": true, "documentation_strategy": {"action": "rewrite_all", "target_pages": ["A"]}}"#,
            "## Body",
        ]);
        let store = MemoryStore::default();

        let err = run(&change(), &advisor, &store, &config(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ChangeDocError::Config { .. }));
        assert!(store.put_attempts().is_empty());
    }
}
