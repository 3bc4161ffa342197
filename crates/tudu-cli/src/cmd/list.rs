//! `tudu list`: lists on the board.

use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use tudu_core::error::StoreError;
use tudu_core::model::{Container, ContainerPatch, NewContainer, SyncFailure, SyncState};
use tudu_core::store::{LocalStore, Removal};

use super::{resolve_list_id, sync_marker};
use crate::output::{CliError, OutputMode, check, fail, pretty_section, render, render_mode};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(subcommand)]
    pub command: ListCommand,
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Create a list.
    Add(AddArgs),
    /// Change a list's title.
    Rename(RenameArgs),
    /// Move a list on the board.
    Move(MoveArgs),
    /// Remove a list. Its items stay unless cascading deletes are enabled.
    Rm(RmArgs),
    /// Show all lists.
    Ls,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub title: String,

    /// Board position; defaults to the next free slot in the row.
    #[arg(long, requires = "z", allow_negative_numbers = true)]
    pub x: Option<f64>,

    #[arg(long, requires = "x", allow_negative_numbers = true)]
    pub z: Option<f64>,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// List id (unique prefixes accepted).
    pub id: String,
    pub title: String,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// List id (unique prefixes accepted).
    pub id: String,

    #[arg(long, allow_negative_numbers = true)]
    pub x: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub z: Option<f64>,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// List id (unique prefixes accepted).
    pub id: String,
}

/// A list as shown to the user.
#[derive(Debug, Serialize)]
pub struct ListView {
    pub id: String,
    pub title: String,
    pub pos_x: f64,
    pub pos_z: f64,
    pub sync: &'static str,
    #[serde(skip)]
    pub state: SyncState,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SyncFailure>,
}

impl ListView {
    fn new(store: &LocalStore, list: &Container) -> Self {
        Self {
            id: list.id.clone(),
            title: list.title.clone(),
            pos_x: list.position_x,
            pos_z: list.position_z,
            sync: list.sync.as_str(),
            state: list.sync,
            items: store.visible_members(Some(&list.id)).len(),
            failure: list.sync_failure.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Removed {
    id: String,
    outcome: Removal,
}

pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let ws = check(output, Workspace::discover(project_root))?;

    match &args.command {
        ListCommand::Add(add) => {
            let view = check(
                output,
                ws.edit(|store| {
                    let id = store.create_container(NewContainer {
                        title: add.title.clone(),
                        position: add.x.zip(add.z),
                    })?;
                    view_of(store, &id)
                }),
            )?;
            render(output, &view, |v, w| {
                writeln!(w, "✓ Created list '{}' ({})", v.title, v.id)
            })
        }
        ListCommand::Rename(rename) => {
            let patch = ContainerPatch {
                title: Some(rename.title.clone()),
                ..ContainerPatch::default()
            };
            let view = check(output, ws.edit(|store| update(store, &rename.id, &patch)))?;
            render(output, &view, |v, w| {
                writeln!(w, "✓ Renamed {} to '{}'", v.id, v.title)
            })
        }
        ListCommand::Move(mv) => {
            let patch = ContainerPatch {
                position_x: mv.x,
                position_z: mv.z,
                ..ContainerPatch::default()
            };
            if patch.is_empty() {
                return fail(output, CliError::new("nothing to move: pass --x and/or --z"));
            }
            let view = check(output, ws.edit(|store| update(store, &mv.id, &patch)))?;
            render(output, &view, |v, w| {
                writeln!(w, "✓ Moved {} to ({}, {})", v.id, v.pos_x, v.pos_z)
            })
        }
        ListCommand::Rm(rm) => {
            let removed = check(
                output,
                ws.edit(|store| {
                    let id = resolve_list_id(store, &rm.id)?;
                    let outcome = store.remove(&id)?;
                    Ok(Removed { id, outcome })
                }),
            )?;
            render(output, &removed, |r, w| match r.outcome {
                Removal::Purged => writeln!(w, "✓ Removed {} (never synced)", r.id),
                Removal::MarkedDeleted => {
                    writeln!(w, "✓ Removed {} (delete queued for next sync)", r.id)
                }
            })
        }
        ListCommand::Ls => {
            let store = check(output, ws.read())?;
            let views: Vec<ListView> = store
                .visible_containers()
                .map(|list| ListView::new(&store, list))
                .collect();
            render_mode(
                output,
                &views,
                |v, w| render_lists_text(v, w),
                |v, w| render_lists_pretty(v, w),
            )
        }
    }
}

fn update(
    store: &mut LocalStore,
    raw_id: &str,
    patch: &ContainerPatch,
) -> Result<ListView, StoreError> {
    let id = resolve_list_id(store, raw_id)?;
    store.update_container(&id, patch)?;
    view_of(store, &id)
}

fn view_of(store: &LocalStore, id: &str) -> Result<ListView, StoreError> {
    store
        .container(id)
        .map(|list| ListView::new(store, list))
        .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
}

fn render_lists_text(views: &[ListView], w: &mut dyn Write) -> std::io::Result<()> {
    for v in views {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            v.id, v.title, v.pos_x, v.pos_z, v.sync, v.items
        )?;
    }
    Ok(())
}

fn render_lists_pretty(views: &[ListView], w: &mut dyn Write) -> std::io::Result<()> {
    if views.is_empty() {
        return writeln!(w, "No lists yet. Create one with `tudu list add <title>`.");
    }
    pretty_section(w, &format!("Lists ({})", views.len()))?;
    for v in views {
        let noun = if v.items == 1 { "item" } else { "items" };
        writeln!(
            w,
            "{} {:<38} {}  ({} {noun})",
            sync_marker(v.state, v.failure.as_ref()),
            v.id,
            v.title,
            v.items
        )?;
    }
    Ok(())
}
