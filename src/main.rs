use clap::{Parser, Subcommand};
use git_sync::commands::*;
use git_sync::core::print_error;
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-sync")]
#[command(about = "Keep a working tree in view and in sync with its remote")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Repository to operate on (defaults to the current directory)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Username for remote authentication and the commit author
    #[arg(long, global = true)]
    username: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show branch, parent commit and working-tree changes
    Status,
    /// Show recent commits
    Log {
        /// Number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// List local branches
    Branches,
    /// Stage paths (including deletions)
    Stage {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Unstage paths
    Unstage {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Stage every change in the working tree
    StageAll,
    /// Unstage everything currently staged
    UnstageAll,
    /// Commit staged changes
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
        /// Push after a successful commit
        #[arg(long)]
        push: bool,
    },
    /// Push the current branch
    Push,
    /// Fetch and integrate the current branch's remote changes
    Pull,
    /// Fetch from the remote without touching the working tree
    Fetch,
    /// Create a branch at HEAD
    Branch {
        name: String,
        /// Switch to the new branch
        #[arg(short, long)]
        checkout: bool,
    },
    /// Switch to an existing branch
    Checkout { name: String },
    /// Clone a repository
    Clone { url: String, path: PathBuf },
    /// Follow working-tree changes as they happen
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args = SessionArgs {
        repo: cli.repo,
        username: cli.username,
    };

    let result = match cli.command {
        Commands::Status => execute_status(&args),
        Commands::Log { count } => execute_log(&args, count),
        Commands::Branches => execute_branches(&args),
        Commands::Stage { paths } => execute_stage(&args, &paths),
        Commands::Unstage { paths } => execute_unstage(&args, &paths),
        Commands::StageAll => execute_stage_all(&args),
        Commands::UnstageAll => execute_unstage_all(&args),
        Commands::Commit { message, push } => execute_commit(&args, &message, push),
        Commands::Push => execute_push(&args),
        Commands::Pull => execute_pull(&args),
        Commands::Fetch => execute_fetch(&args),
        Commands::Branch { name, checkout } => execute_branch(&args, &name, checkout),
        Commands::Checkout { name } => execute_checkout(&args, &name),
        Commands::Clone { url, path } => execute_clone(&args, &url, &path),
        Commands::Watch { seconds } => execute_watch(&args, seconds),
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
