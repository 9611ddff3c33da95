use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "arch-unit", version, about = "Polyglot source-code analysis: AST cache, AQL queries, architectural rules")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as structured JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose diagnostic output
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run arch-unit rules and enabled linters
    Check {
        /// Root directory to check (default: cwd)
        path: Option<String>,
        /// Specific files to check (empty = every cached file)
        files: Vec<String>,
        /// Which linters to run: `*` (all enabled), `none`, or a comma-separated list
        #[arg(long, default_value = "*")]
        linters: String,
        /// Apply fixes where the rule/linter supports it
        #[arg(long)]
        fix: bool,
        /// Exit non-zero if any violation was found
        #[arg(long)]
        fail_on_violation: bool,
        /// Ignore execution-history debounce and re-run every analyzer
        #[arg(long)]
        no_cache: bool,
        /// Glob(s) to additionally include
        #[arg(long)]
        include: Vec<String>,
        /// Glob(s) to exclude
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Cached AST queries, cache (re)build, rename, and call-graph view
    Ast(AstArgs),

    /// Dependency tree / version-conflict report
    Deps {
        /// Local path to scan, or a git URL to clone and scan
        path_or_git_url: Option<String>,
        /// Recursive resolution depth (0 = direct dependencies only)
        #[arg(long, default_value = "0")]
        depth: u32,
        /// Only print version conflicts
        #[arg(long)]
        show_conflicts: bool,
        /// Directory used to cache cloned dependency repositories
        #[arg(long)]
        git_cache_dir: Option<String>,
    },

    /// Manage cached violations
    Violations {
        #[command(subcommand)]
        command: ViolationsCommands,
    },

    /// Linter execution stats & debounce state
    Stats {
        /// Directory scope (default: cwd)
        dir: Option<String>,
        /// Show every recorded (analyzer, workdir) pair, not just a summary
        #[arg(long)]
        verbose: bool,
    },

    /// Generate `arch-unit.yml`
    Init {
        /// Directory to initialize (default: cwd)
        path: Option<String>,
        /// Prompt for style/strictness instead of using flags/defaults
        #[arg(long)]
        interactive: bool,
        /// Rule style: `strict`, `balanced`, `permissive`
        #[arg(long, default_value = "balanced")]
        style: String,
        /// Builtin rule strictness: `low`, `medium`, `high`
        #[arg(long, default_value = "medium")]
        strictness: String,
    },
}

#[derive(Args, Debug)]
pub(crate) struct AstArgs {
    #[command(subcommand)]
    pub command: AstCommands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum AstCommands {
    /// Query the cache with a pattern (default subcommand when a bare pattern is given)
    Query {
        /// Pattern, e.g. `go:billing:*:Charge*` (default: `*`)
        #[arg(default_value = "*")]
        pattern: String,
        #[arg(long, default_value = "tree")]
        format: String,
        /// Include cyclomatic complexity in the output
        #[arg(long)]
        complexity: bool,
        /// Include outbound call counts in the output
        #[arg(long)]
        calls: bool,
        /// Only include nodes at or above this complexity/line-count threshold
        #[arg(long)]
        threshold: Option<u32>,
    },

    /// (Re)build the AST cache
    Analyze {
        /// Root directory to scan (default: cwd)
        path: Option<String>,
        /// Drop the existing cache and rebuild from scratch
        #[arg(long)]
        no_cache: bool,
        /// Comma-separated language filter (default: every supported language)
        #[arg(long)]
        languages: Option<String>,
        /// Worker thread count (default: min(CPU, 32))
        #[arg(long)]
        max_workers: Option<usize>,
        /// How long a cached file is considered fresh before a forced rescan
        #[arg(long)]
        cache_ttl: Option<String>,
    },

    /// Rename a symbol and update every cached reference
    Rename {
        /// Old-name pattern; must resolve to exactly one node
        old: String,
        /// New name
        new: String,
        /// Compute and print the plan without writing any file
        #[arg(long)]
        dry_run: bool,
        /// Print a unified diff of the planned changes
        #[arg(long)]
        show_diff: bool,
        /// Write a `.bak` of each modified file before overwriting it
        #[arg(long)]
        backup: bool,
    },

    /// Call graph rooted at a pattern
    Graph {
        #[arg(default_value = "*")]
        pattern: String,
        #[arg(long, default_value = "tree")]
        format: String,
        /// Maximum traversal depth
        #[arg(long, default_value = "3")]
        depth: u32,
        /// Only include nodes with no inbound callers (entry points)
        #[arg(long)]
        root_only: bool,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ViolationsCommands {
    /// List cached violations
    List {
        /// Only violations at or after this RFC3339 timestamp
        #[arg(long)]
        since: Option<String>,
        /// Only violations older than this duration (e.g. `7d`)
        #[arg(long)]
        older: Option<String>,
        /// Only violations under this path glob
        #[arg(long)]
        path: Option<String>,
    },
    /// Clear cached violations
    Clear {
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        older: Option<String>,
        #[arg(long)]
        path: Option<String>,
    },
}

/// Exit codes shared by every command (§6).
pub(crate) mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const VIOLATIONS_FOUND: i32 = 1;
    pub const ANALYSIS_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
}
