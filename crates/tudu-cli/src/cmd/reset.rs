//! `tudu reset`: forget the local snapshot.
//!
//! The next `tudu sync` seeds a fresh copy from the server. Unsynced changes
//! are lost, so dropping them requires `--force`.

use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::output::{CliError, OutputMode, check, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Discard unsynced changes too.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct ResetOutput {
    cleared: bool,
    discarded: usize,
}

pub fn run_reset(args: &ResetArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let ws = check(output, Workspace::discover(project_root))?;
    let _lock = check(output, ws.lock(ws.config().store.lock_timeout()))?;
    let store = check(output, ws.load())?;

    let pending = store.pending_count();
    if pending > 0 && !args.force {
        return fail(
            output,
            CliError {
                message: format!("reset would discard {pending} unsynced changes"),
                suggestion: Some("Run `tudu sync` first, or pass --force.".to_string()),
                error_code: None,
            },
        );
    }

    let cleared = check(output, ws.snapshot().clear())?;
    let result = ResetOutput {
        cleared,
        discarded: pending,
    };
    render(output, &result, |r, w| {
        if !r.cleared {
            return writeln!(w, "✓ Nothing to reset");
        }
        if r.discarded > 0 {
            writeln!(w, "✓ Snapshot cleared; {} unsynced changes discarded", r.discarded)
        } else {
            writeln!(w, "✓ Snapshot cleared")
        }
    })
}
