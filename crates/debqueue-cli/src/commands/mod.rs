//! CLI command definitions and dispatch.

pub mod graph;
pub mod queue;
pub mod recipes;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use debqueue_common::config::{ResolveConfig, Settings, default_workers};
use debqueue_common::constants::{
    BIN_NAME, DEFAULT_RECIPE_FILE, DEFAULT_RECIPES_DIR, DEFAULT_SETTINGS_FILE, DOCKER_BINARY,
    SANDBOX_RECIPES_DIR,
};
use debqueue_common::error::DebqueueError;
use debqueue_resolve::Resolution;
use debqueue_sandbox::{SandboxBackend, SandboxPlan, backend::detect_backend};

/// debq: dependency-ordered build queues for recipe packages.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the settings file.
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Directory holding one sub-directory per recipe.
    #[arg(long, global = true, default_value = DEFAULT_RECIPES_DIR)]
    pub recipes: PathBuf,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the build queue, dependencies first.
    Queue(queue::QueueArgs),
    /// Print the discovered dependency graph in DOT format.
    Graph(graph::GraphArgs),
    /// List the recipes found on disk.
    Recipes,
}

/// Options shared by every command that resolves packages.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Target distribution codename.
    #[arg(short, long)]
    pub distribution: String,

    /// Queue packages even if already published or unsupported.
    #[arg(short, long)]
    pub force: bool,

    /// Only track build-dependencies carrying this prefix.
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Number of concurrent inspection workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Packages to resolve; every recipe on disk when empty.
    pub packages: Vec<String>,
}

impl ResolveArgs {
    fn config(&self, recipes_dir: &Path) -> ResolveConfig {
        ResolveConfig::new(&self.distribution)
            .with_force_build(self.force)
            .with_owned_prefix(&self.prefix)
            .with_recipes_dir(recipes_dir)
            .with_workers(self.workers.unwrap_or_else(default_workers))
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Queue(args) => queue::execute(&cli, args),
        Command::Graph(args) => graph::execute(&cli, args),
        Command::Recipes => recipes::execute(&cli),
    }
}

/// Packages named on the command line, or every recipe on disk.
fn requested_packages(cli: &Cli, args: &ResolveArgs) -> anyhow::Result<Vec<String>> {
    if !args.packages.is_empty() {
        return Ok(args.packages.clone());
    }
    let all = debqueue_resolve::recipes::list_recipes(&cli.recipes, DEFAULT_RECIPE_FILE)?;
    tracing::debug!(count = all.len(), "no packages given, using every recipe");
    Ok(all)
}

/// Prepares a sandbox, resolves `packages`, and tears the sandbox down.
///
/// Ctrl+C raises the cancellation flag; the run then stops with
/// `Interrupted` after releasing the sandbox.
fn resolve(cli: &Cli, args: &ResolveArgs, packages: &[String]) -> anyhow::Result<Resolution> {
    let settings = Settings::load(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;
    let config = args.config(&cli.recipes);

    let backend: Arc<dyn SandboxBackend> = Arc::from(detect_backend());
    if !backend.is_available() {
        return Err(DebqueueError::NotFound {
            kind: "container runtime",
            id: DOCKER_BINARY.to_owned(),
        }
        .into());
    }
    let plan = sandbox_plan(&settings, &config);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    Ok(debqueue_resolve::resolve_build_queue(
        backend, &plan, &config, packages, &cancel,
    )?)
}

/// Directories copied into the seed container: recipes, plus `bin` and
/// `lib` next to them when present.
fn sandbox_plan(settings: &Settings, config: &ResolveConfig) -> SandboxPlan {
    let mut plan = SandboxPlan::new(settings, &config.distribution)
        .with_injection(&config.recipes_dir, SANDBOX_RECIPES_DIR);
    let root = config
        .recipes_dir
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);
    for extra in ["bin", "lib"] {
        let dir = root.join(extra);
        if dir.is_dir() {
            plan = plan.with_injection(dir, format!("/{extra}"));
        }
    }
    plan
}
