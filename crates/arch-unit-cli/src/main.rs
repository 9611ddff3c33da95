//! arch-unit CLI — polyglot source-code analysis: AST cache, pattern/AQL
//! queries, architectural rule enforcement, rename, and dependency graphs.

use clap::Parser;

mod cli_args;
mod commands;

use cli_args::{Cli, Commands, ViolationsCommands};

fn main() {
    init_tracing(std::env::var("ARCH_UNIT_LOG").is_ok());

    let cli = Cli::parse();
    let json = cli.json;
    let verbose = cli.verbose;

    let exit_code = match cli.command {
        Commands::Check { path, files, linters, fix, fail_on_violation, no_cache, include, exclude } => {
            commands::check::run(verbose, json, path, files, linters, fix, fail_on_violation, no_cache, include, exclude)
        }
        Commands::Ast(args) => commands::ast::run(json, verbose, args.command),
        Commands::Deps { path_or_git_url, depth, show_conflicts, git_cache_dir } => {
            commands::deps::run(json, path_or_git_url, depth, show_conflicts, git_cache_dir)
        }
        Commands::Violations { command } => match command {
            ViolationsCommands::List { since, older, path } => commands::violations::list(json, since, older, path),
            ViolationsCommands::Clear { since, older, path } => commands::violations::clear(since, older, path),
        },
        Commands::Stats { dir, verbose: stats_verbose } => commands::stats::run(verbose || stats_verbose, json, dir),
        Commands::Init { path, interactive, style, strictness } => commands::init::run(verbose, path, interactive, style, strictness),
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose_env: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose_env { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
