//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use changedoc_advisor::AdvisorClient;
use changedoc_core::pipeline::{ProgressReporter, RunConfig, RunOutcome};
use changedoc_core::{extractor, planner, snapshot};
use changedoc_git::GitChangeSource;
use changedoc_shared::{
    AppConfig, DocumentationStrategy, PageStore, PlannerMode, ProviderKind, init_config,
    load_config, validate_api_key,
};
use changedoc_storage::{GitPublisher, MemoryPageStore, WikiStore, wiki_page_url};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// changedoc: keep a wiki in step with data-related code changes.
#[derive(Parser)]
#[command(
    name = "changedoc",
    version,
    about = "Generate and file documentation for data-related commits.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Document one commit.
    Run(RunArgs),

    /// Print the knowledge-base snapshot of a wiki directory.
    Snapshot {
        /// Directory holding the wiki's markdown pages.
        #[arg(long)]
        wiki_dir: PathBuf,

        /// Print JSON instead of the prompt rendering.
        #[arg(long)]
        json: bool,
    },

    /// Interpret a saved advisory response and print the strategy as JSON.
    Extract {
        /// File with the raw response. Reads stdin when omitted.
        file: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct RunArgs {
    /// Commit to document.
    #[arg(long)]
    pub commit_sha: String,

    /// Repository the commit lives in.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Advisory provider, overriding the config file.
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Wiki owner. Falls back to GITHUB_REPOSITORY.
    #[arg(long, requires = "repo_name")]
    pub repo_owner: Option<String>,

    /// Wiki repository name. Falls back to GITHUB_REPOSITORY.
    #[arg(long, requires = "repo_owner")]
    pub repo_name: Option<String>,

    /// Write pages to a local directory instead of the GitHub wiki.
    #[arg(long)]
    pub wiki_dir: Option<PathBuf>,

    /// Decide and generate, but write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip strategy planning and always create a commit page.
    #[arg(long)]
    pub simple: bool,

    /// Skip the relevance pre-filter.
    #[arg(long)]
    pub no_relevance_check: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "changedoc=info",
        1 => "changedoc=debug",
        _ => "changedoc=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args).await,
        Command::Snapshot { wiki_dir, json } => cmd_snapshot(&wiki_dir, json),
        Command::Extract { file } => cmd_extract(file.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Where pages go for this run.
enum Target {
    LocalDir(PathBuf),
    Wiki { owner: String, repo: String },
    /// No way to write: print the generated body instead.
    Print,
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let mut config = load_config()?;
    apply_overrides(&mut config, &args);

    // Missing key is fatal before any git or network work.
    let advisor = AdvisorClient::from_config(&config.advisor)?;

    let slug = repo_slug(
        args.repo_owner.as_deref(),
        args.repo_name.as_deref(),
        std::env::var("GITHUB_REPOSITORY").ok().as_deref(),
    );
    let token = config.wiki.token();
    let target = match (&args.wiki_dir, slug, token.is_some()) {
        (Some(dir), _, _) => Target::LocalDir(dir.clone()),
        (None, Some((owner, repo)), true) => Target::Wiki { owner, repo },
        (None, None, true) => {
            return Err(eyre!(
                "wiki token is set but the repository is unknown: pass --repo-owner and --repo-name or set GITHUB_REPOSITORY"
            ));
        }
        (None, _, false) => {
            warn!(
                token_env = %config.wiki.token_env,
                "no wiki token and no --wiki-dir, printing documentation instead"
            );
            Target::Print
        }
    };

    let source = GitChangeSource::new(&args.repo);
    let change = source.get_change(&args.commit_sha)?;
    info!(
        repo = %source.repo_dir().display(),
        commit = change.short_ref(),
        files = change.file_paths.len(),
        provider = advisor.provider().as_str(),
        model = advisor.model(),
        "documenting change"
    );

    let store: Box<dyn PageStore> = match &target {
        Target::LocalDir(dir) => {
            let store = WikiStore::open(dir)?;
            info!(root = %store.root().display(), "writing pages to local directory");
            Box::new(store)
        }
        Target::Wiki { owner, repo } => {
            let token = token.unwrap_or_default();
            let publisher = GitPublisher::clone_github(&config.wiki, owner, repo, &token)?;
            Box::new(WikiStore::published(publisher))
        }
        Target::Print => Box::new(MemoryPageStore::new()),
    };

    let run_config = RunConfig {
        planner: config.planner.clone(),
        dry_run: args.dry_run || matches!(target, Target::Print),
        date: chrono::Utc::now().date_naive(),
    };

    let progress = CliProgress::new();
    let outcome =
        changedoc_core::pipeline::run(&change, &advisor, store.as_ref(), &run_config, &progress)
            .await;
    progress.finish();

    report(outcome?, &target)
}

fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(provider) = args.provider {
        config.advisor.provider = provider;
    }
    if args.simple {
        config.planner.mode = PlannerMode::Simple;
    }
    if args.no_relevance_check {
        config.planner.relevance_check = false;
    }
}

/// Owner and repository from explicit flags, else from an `owner/name` slug.
fn repo_slug(
    owner: Option<&str>,
    name: Option<&str>,
    github_repository: Option<&str>,
) -> Option<(String, String)> {
    if let (Some(owner), Some(name)) = (owner, name) {
        return Some((owner.to_string(), name.to_string()));
    }
    let (owner, name) = github_repository?.trim().split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}

fn report(outcome: RunOutcome, target: &Target) -> Result<()> {
    match outcome {
        RunOutcome::NoDocumentationNeeded { reason } => {
            println!("No documentation needed: {reason}");
            Ok(())
        }
        RunOutcome::DryRun { strategy, body } => {
            print_strategy(&strategy);
            println!();
            println!("{body}");
            Ok(())
        }
        RunOutcome::Applied { strategy, report } => {
            print_strategy(&strategy);
            println!();
            for page in report.written() {
                match target {
                    Target::Wiki { owner, repo } => {
                        println!("  Updated: {}", wiki_page_url(owner, repo, page))
                    }
                    _ => println!("  Updated: {page}"),
                }
            }
            Ok(())
        }
        RunOutcome::Failed { strategy, report } => {
            print_strategy(&strategy);
            println!();
            for page in report.written() {
                println!("  Updated: {page}");
            }
            let failures = report.failures();
            for (page, err) in &failures {
                eprintln!("  Failed:  {page}: {err}");
            }
            Err(eyre!("{} of {} page(s) failed", failures.len(), report.pages.len()))
        }
    }
}

fn print_strategy(strategy: &DocumentationStrategy) {
    println!("  Action:  {}", strategy.action().as_str());
    println!("  Pages:   {}", strategy.target_pages().join(", "));
    println!("  Type:    {}", strategy.plan.content_type);
    if !strategy.reasoning.is_empty() {
        println!("  Reason:  {}", strategy.reasoning);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// snapshot / extract / config
// ---------------------------------------------------------------------------

fn cmd_snapshot(wiki_dir: &Path, json: bool) -> Result<()> {
    if !wiki_dir.is_dir() {
        return Err(eyre!("wiki directory '{}' does not exist", wiki_dir.display()));
    }
    let config = load_config()?;
    let store = WikiStore::open(wiki_dir)?;
    let snapshot = snapshot::snapshot_from_store(&store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!(
            "{}",
            planner::render_snapshot(&snapshot, config.planner.preview_chars)
        );
    }
    Ok(())
}

fn cmd_extract(file: Option<&Path>) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let strategy = extractor::extract(&raw);
    println!("{}", serde_json::to_string_pretty(&strategy)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    println!("{}", api_key_status(&config));
    Ok(())
}

fn api_key_status(config: &AppConfig) -> String {
    match validate_api_key(config) {
        Ok(()) => "# API key: found".to_string(),
        Err(e) => format!("# API key: missing ({e})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "changedoc",
            "run",
            "--commit-sha",
            "abc123",
            "--provider",
            "openai",
            "--simple",
            "--no-relevance-check",
            "--wiki-dir",
            "wiki",
        ])
        .expect("parse");

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.commit_sha, "abc123");
        assert_eq!(args.provider, Some(ProviderKind::OpenAi));
        assert_eq!(args.repo, PathBuf::from("."));

        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.advisor.provider, ProviderKind::OpenAi);
        assert_eq!(config.planner.mode, PlannerMode::Simple);
        assert!(!config.planner.relevance_check);
    }

    #[test]
    fn owner_requires_name() {
        let parsed = Cli::try_parse_from([
            "changedoc",
            "run",
            "--commit-sha",
            "abc",
            "--repo-owner",
            "acme",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn key_status_names_the_env_vars_tried() {
        let mut config = AppConfig::default();
        config.advisor.api_key_envs = vec!["CD_CLI_TEST_MISSING_KEY".into()];
        let status = api_key_status(&config);
        assert!(status.starts_with("# API key: missing"));
        assert!(status.contains("CD_CLI_TEST_MISSING_KEY"));
    }

    #[test]
    fn repo_slug_prefers_flags() {
        assert_eq!(
            repo_slug(Some("acme"), Some("shop"), Some("other/repo")),
            Some(("acme".into(), "shop".into()))
        );
        assert_eq!(
            repo_slug(None, None, Some("acme/shop")),
            Some(("acme".into(), "shop".into()))
        );
        assert_eq!(repo_slug(None, None, Some("no-slash")), None);
        assert_eq!(repo_slug(None, None, Some("a/b/c")), None);
        assert_eq!(repo_slug(None, None, None), None);
    }
}
