//! `tudu resolve`: settle an entity the reconciler gave up on.

use clap::{ArgGroup, Args};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use tudu_core::model::EntityKind;
use tudu_core::store::{Resolution, Resolved};

use crate::output::{OutputMode, check, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("action").required(true).args(["retry", "discard"])))]
pub struct ResolveArgs {
    /// List or item id (unique prefixes accepted).
    pub id: String,

    /// Clear the failure and try again on the next sync.
    #[arg(long)]
    pub retry: bool,

    /// Drop the local change instead.
    #[arg(long)]
    pub discard: bool,
}

impl ResolveArgs {
    const fn resolution(&self) -> Resolution {
        if self.discard {
            Resolution::Discard
        } else {
            Resolution::Retry
        }
    }
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    kind: EntityKind,
    id: String,
    outcome: Resolved,
}

pub fn run_resolve(
    args: &ResolveArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = check(output, Workspace::discover(project_root))?;
    let result = check(
        output,
        ws.edit(|store| {
            let (kind, id) = {
                let entity = store.find(&args.id)?;
                (entity.kind(), entity.id().to_string())
            };
            let outcome = store.resolve(&id, args.resolution())?;
            Ok(ResolveOutput { kind, id, outcome })
        }),
    )?;

    render(output, &result, |r, w| match r.outcome {
        Resolved::Retrying => {
            writeln!(w, "✓ {} {} will be retried on the next sync", r.kind, r.id)
        }
        Resolved::Purged => writeln!(w, "✓ {} {} dropped", r.kind, r.id),
        Resolved::Reverted => writeln!(
            w,
            "✓ {} {} marked clean; local edits will not be pushed",
            r.kind, r.id
        ),
    })
}
