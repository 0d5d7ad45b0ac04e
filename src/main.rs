use anyhow::{anyhow, Context, Result};
use callsight::callers::{CallerResolver, TestPathMatcher};
use callsight::chains::CallChainBuilder;
use callsight::config::{load_config, Config};
use callsight::context::AnalysisContext;
use callsight::graph::CallGraphAnalyzer;
use callsight::logging::{self, LogMode};
use callsight::model::CallDirection;
use callsight::server::run_stdio_server;
use callsight::tiers::{SymbolQuery, TierMode, TierSelector};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "callsight")]
#[command(version)]
#[command(about = "Call-graph intelligence for C# codebases (Pure Rust MCP server)")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Force a resolution tier: auto, semantic, syntax or text
    #[arg(long, global = true, value_name = "TIER")]
    tier: Option<String>,

    /// Debug-level logging on stderr (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start MCP stdio server
    Mcp,
    /// Call sites of a routine
    Callers {
        /// `Type.Method` or `Method`
        method: String,
        /// Only direct, statically bound callers
        #[arg(long)]
        direct: bool,
        /// Group call sites by caller and expression shape instead of listing them
        #[arg(long, conflicts_with = "direct")]
        patterns: bool,
    },
    /// Call chains to (backward) or from (forward) a routine
    Chains {
        method: String,
        #[arg(long, default_value = "backward")]
        direction: String,
        #[arg(long)]
        max_depth: Option<usize>,
        /// Keep only chains that loop back into themselves (forces forward)
        #[arg(long)]
        recursive: bool,
    },
    /// Call paths from one routine to another
    Between {
        from: String,
        to: String,
        #[arg(long)]
        max_depth: Option<usize>,
        /// Only the path with the fewest steps
        #[arg(long)]
        shortest: bool,
    },
    /// Routines reachable from a start routine, and the ones that are not
    Reachable {
        method: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Entry points, leaves, cycles and depth statistics
    Graph {
        /// Containing type, namespace or namespace prefix
        #[arg(long)]
        scope: Option<String>,
    },
    /// Circular call dependencies
    Cycles {
        #[arg(long)]
        scope: Option<String>,
    },
    /// Routines nothing references
    Unused {
        #[arg(long)]
        scope: Option<String>,
    },
    /// Routines referenced only from test code
    TestOnly {
        #[arg(long)]
        scope: Option<String>,
    },
    /// Parse health, starting tier and document count
    Health,
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_workspace(root: &Path, cfg: Config) -> Result<AnalysisContext> {
    let sp = spinner("scanning workspace...");
    let ctx = AnalysisContext::load(root, cfg)?;
    sp.set_message(format!("parsing {} files...", ctx.document_count()));
    let health = ctx.health();
    sp.finish_with_message(format!(
        "loaded {} files ({} with syntax errors)",
        health.total_files,
        health.total_files.saturating_sub(health.parseable_files)
    ));
    Ok(ctx)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = if matches!(cli.cmd, Command::Mcp) { LogMode::Server } else { LogMode::Cli };
    logging::init(mode, cli.verbose)?;

    let repo_root = match cli.root.clone() {
        Some(r) => r,
        None => std::env::current_dir().context("Failed to get current dir")?,
    };

    if matches!(cli.cmd, Command::Mcp) {
        return run_stdio_server(Some(repo_root));
    }

    let cfg = load_config(&repo_root);
    let tier = match cli.tier.as_deref() {
        Some(t) => TierMode::parse(t).ok_or_else(|| anyhow!("Invalid --tier `{t}` (expected auto, semantic, syntax or text)"))?,
        None => cfg.engine.tier,
    };
    let default_depth = cfg.engine.default_max_depth;
    let shortest_depth = cfg.engine.shortest_path_max_depth;
    let max_paths = cfg.engine.max_paths;
    let test_patterns = cfg.test_paths.patterns.clone();

    let ctx = load_workspace(&repo_root, cfg)?;
    let snapshot = ctx.resolver();
    let resolver = &*snapshot;
    let chains = || CallChainBuilder::new(resolver, tier).with_max_paths(max_paths);

    match cli.cmd {
        // Served above; never reaches the workspace load.
        Command::Mcp => {}
        Command::Callers { method, direct, patterns } => {
            let q = SymbolQuery::method(method.as_str());
            let callers = CallerResolver::new(resolver, tier);
            if patterns {
                match callers.analyze_call_patterns(&q)? {
                    Some(a) => print_json(&a)?,
                    None => print_json(&json!({ "found": false, "method": method }))?,
                }
            } else {
                match callers.find_callers(&q, !direct)? {
                    Some(r) => print_json(&r)?,
                    None => print_json(&json!({ "found": false, "method": method }))?,
                }
            }
        }
        Command::Chains { method, direction, max_depth, recursive } => {
            let q = SymbolQuery::method(method.as_str());
            let depth = max_depth.unwrap_or(default_depth);
            let result = if recursive {
                chains().find_recursive_call_chains(&q, depth)?
            } else {
                let direction = CallDirection::parse(&direction)
                    .ok_or_else(|| anyhow!("Invalid --direction `{direction}` (expected backward or forward)"))?;
                chains().find_call_chains(&q, direction, depth)?
            };
            print_json(&result)?;
        }
        Command::Between { from, to, max_depth, shortest } => {
            let (from, to) = (SymbolQuery::method(from), SymbolQuery::method(to));
            let result = if shortest {
                chains().find_shortest_path(&from, &to, max_depth.unwrap_or(shortest_depth))?
            } else {
                chains().find_call_chains_between(&from, &to, max_depth.unwrap_or(default_depth))?
            };
            print_json(&result)?;
        }
        Command::Reachable { method, max_depth } => {
            let q = SymbolQuery::method(method);
            print_json(&chains().find_reachable_methods(&q, max_depth.unwrap_or(default_depth))?)?;
        }
        Command::Graph { scope } => {
            print_json(&CallGraphAnalyzer::new(resolver, tier).with_max_paths(max_paths).analyze_call_graph(scope.as_deref())?)?;
        }
        Command::Cycles { scope } => {
            print_json(&CallGraphAnalyzer::new(resolver, tier).with_max_paths(max_paths).find_circular_dependencies(scope.as_deref())?)?;
        }
        Command::Unused { scope } => {
            let methods = CallerResolver::new(resolver, tier).find_unused_methods(scope.as_deref())?;
            print_json(&json!({ "scope": scope, "count": methods.len(), "methods": methods }))?;
        }
        Command::TestOnly { scope } => {
            let matcher = TestPathMatcher::new(&test_patterns);
            let methods = CallerResolver::new(resolver, tier).find_test_only_methods(scope.as_deref(), &matcher)?;
            print_json(&json!({ "scope": scope, "count": methods.len(), "methods": methods }))?;
        }
        Command::Health => {
            print_json(&json!({
                "root": repo_root.to_string_lossy(),
                "documents": ctx.document_count(),
                "health": ctx.health(),
                "tier": TierSelector::new(resolver, tier).select(),
                "cache": ctx.cache_stats(),
            }))?;
        }
    }

    Ok(())
}
