#![forbid(unsafe_code)]

mod cmd;
mod output;
mod remote;
mod workspace;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, Reported};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tudu_core::config::{load_user_config, resolve_output};

#[derive(Parser, Debug)]
#[command(
    name = "tudu",
    author,
    version,
    about = "tudu: local-first lists and todos that sync with your server",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from `--json`, `FORMAT`, and the user config.
    fn output_mode(&self) -> OutputMode {
        let user = load_user_config().unwrap_or_default();
        let env_format = env::var("FORMAT").ok();
        OutputMode::from_resolved(&resolve_output(
            self.json,
            user.output.as_deref(),
            env_format.as_deref(),
        ))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Workspace",
        about = "Initialize a tudu workspace",
        long_about = "Create .tudu/ in the current directory and, with a server configured, load its lists and todos.",
        after_help = "EXAMPLES:\n    # Start offline\n    tudu init\n\n    # Point at a server and load its data\n    tudu init --server http://localhost:3000\n\n    # Change the server of an existing workspace\n    tudu init --force --server https://todo.example.com"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Manage lists",
        long_about = "Create, rename, move, remove, and show lists. Changes are local until `tudu sync`.",
        after_help = "EXAMPLES:\n    # Create a list\n    tudu list add \"Groceries\"\n\n    # Place it on the board\n    tudu list move local-3f2a --x 400 --z 0\n\n    # Show lists as JSON\n    tudu list ls --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Manage items and todos",
        long_about = "Add, edit, toggle, remove, and show list items and standalone todos. Changes are local until `tudu sync`.",
        after_help = "EXAMPLES:\n    # Add an item to a list\n    tudu item add \"Milk\" --list local-3f2a\n\n    # Add a standalone todo\n    tudu item add \"Call the dentist\"\n\n    # Mark it done\n    tudu item toggle local-9c1e"
    )]
    Item(cmd::item::ItemArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Show unsynced changes",
        long_about = "Show how many local changes are waiting for the server and which ones are blocked.",
        after_help = "EXAMPLES:\n    # Summary\n    tudu status\n\n    # Emit machine-readable output\n    tudu status --json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Push local changes to the server",
        long_about = "Run one reconciliation pass: push pending creates, updates, and deletes to the server. Failed changes stay queued for the next run.",
        after_help = "EXAMPLES:\n    # Sync using the session cookie in TUDU_SESSION\n    TUDU_SESSION='connect.sid=...' tudu sync\n\n    # Emit machine-readable output\n    tudu sync --json"
    )]
    Sync(cmd::sync::SyncArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Settle a blocked change",
        long_about = "Retry or discard a change the server keeps rejecting.",
        after_help = "EXAMPLES:\n    # Try again on the next sync\n    tudu resolve local-9c1e --retry\n\n    # Drop the local change\n    tudu resolve local-9c1e --discard"
    )]
    Resolve(cmd::resolve::ResolveArgs),

    #[command(
        next_help_heading = "Workspace",
        about = "Forget the local snapshot",
        long_about = "Delete the local snapshot so the next sync reloads everything from the server.",
        after_help = "EXAMPLES:\n    # Clear a fully synced workspace\n    tudu reset\n\n    # Throw away unsynced changes too\n    tudu reset --force"
    )]
    Reset(cmd::reset::ResetArgs),

    #[command(
        next_help_heading = "Workspace",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    tudu completions bash\n\n    # Generate zsh completions\n    tudu completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("TUDU_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if quiet {
            "error"
        } else if verbose || env::var("DEBUG").is_ok() {
            "tudu=debug,info"
        } else {
            "tudu=info,warn"
        })
    });

    let format = env::var("TUDU_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let project_root = env::current_dir()?;
    let output = cli.output_mode();
    debug!(?output, root = %project_root.display(), "starting");

    let result = match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::List(args) => cmd::list::run_list(args, output, &project_root),
        Commands::Item(args) => cmd::item::run_item(args, output, &project_root),
        Commands::Status(args) => cmd::status::run_status(args, output, &project_root),
        Commands::Sync(args) => cmd::sync::run_sync(args, output, &project_root),
        Commands::Resolve(args) => cmd::resolve::run_resolve(args, output, &project_root),
        Commands::Reset(args) => cmd::reset::run_reset(args, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    };

    if let Err(err) = result {
        if !err.is::<Reported>() {
            output::render_error(output, &CliError::new(format!("{err:#}")))?;
        }
        std::process::exit(1);
    }
    Ok(())
}
