use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use tudu_core::config::{
    WORKSPACE_DIR, load_project_config, project_config_path, save_project_config,
};
use tudu_core::sync::{Origin, load_or_seed};

use crate::output::{CliError, OutputMode, check, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Server root, e.g. `http://localhost:3000`.
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Skip the initial download from the server.
    #[arg(long)]
    pub no_seed: bool,

    /// Rewrite the config of an existing workspace. The snapshot is kept.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "lock\nsnapshot/*.tmp\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<Origin>,
}

/// Execute `tudu init`. Creates the workspace skeleton:
///
/// ```text
/// .tudu/
///   config.toml   ([remote] base_url from --server, defaults elsewhere)
///   .gitignore    (lock, snapshot temp files)
///   snapshot/     (written on seed or first edit)
/// ```
///
/// With a server configured and no snapshot yet, the store is seeded from
/// the server unless `--no-seed` is given. An unreachable server is not an
/// error; the workspace simply starts empty.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = project_root.join(WORKSPACE_DIR);
    if dir.exists() && !args.force {
        return fail(
            output,
            CliError {
                message: format!("{} already exists", dir.display()),
                suggestion: Some("Use `tudu init --force` to rewrite the config.".to_string()),
                error_code: None,
            },
        );
    }

    let mut config = if project_config_path(project_root).exists() {
        load_project_config(project_root)?
    } else {
        tudu_core::config::ProjectConfig::default()
    };
    if let Some(server) = &args.server {
        config.remote.base_url = Some(server.trim_end_matches('/').to_string());
    }
    save_project_config(project_root, &config)?;

    let gitignore = dir.join(".gitignore");
    std::fs::write(&gitignore, GITIGNORE)
        .with_context(|| format!("Failed to write {}", gitignore.display()))?;

    let ws = check(output, Workspace::open(project_root.to_path_buf()))?;
    let seed = if args.no_seed {
        None
    } else {
        seed_workspace(&ws, output)?
    };

    let result = InitOutput {
        root: project_root.display().to_string(),
        server: config.remote.base_url.clone(),
        seed,
    };
    render(output, &result, render_init_human)
}

fn seed_workspace(ws: &Workspace, output: OutputMode) -> Result<Option<Origin>> {
    let Some(mut remote) = ws.remote() else {
        return Ok(None);
    };
    let _lock = check(output, ws.lock(ws.config().store.lock_timeout()))?;
    let snapshot = ws.snapshot();
    let (store, origin) = check(output, load_or_seed(&snapshot, Some(&mut remote)))?;
    if matches!(origin, Origin::Seeded { .. }) {
        check(output, snapshot.save(&store))?;
    }
    Ok(Some(origin))
}

fn render_init_human(out: &InitOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "✓ Initialized .tudu/ in {}", out.root)?;
    match (&out.server, out.seed) {
        (None, _) => {
            writeln!(w)?;
            writeln!(w, "  No server configured; working offline.")?;
            writeln!(w, "  Add one later with `tudu init --force --server <URL>`.")?;
        }
        (Some(server), Some(Origin::Seeded { lists, items })) => {
            writeln!(w, "  Loaded {lists} lists and {items} items from {server}")?;
        }
        (Some(server), Some(Origin::Empty)) => {
            writeln!(w, "  Could not reach {server}; starting empty.")?;
            writeln!(w, "  `tudu sync` will load your data once it is reachable.")?;
        }
        (Some(server), _) => writeln!(w, "  Server: {server}")?,
    }
    writeln!(w)?;
    writeln!(w, "Next steps:")?;
    writeln!(w, "  tudu list add \"Groceries\"")?;
    writeln!(w, "  tudu item add \"Milk\" --list <list-id>")?;
    writeln!(w, "  tudu sync")
}
