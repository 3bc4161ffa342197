//! `tudu item`: list items and standalone todos.

use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use tudu_core::error::StoreError;
use tudu_core::model::{Member, MemberPatch, NewMember, SyncFailure, SyncState};
use tudu_core::store::{LocalStore, Removal};

use super::{resolve_item_id, resolve_list_id, sync_marker};
use crate::output::{CliError, OutputMode, check, fail, pretty_section, render, render_mode};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct ItemArgs {
    #[command(subcommand)]
    pub command: ItemCommand,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    /// Add an item to a list, or a standalone todo without `--list`.
    Add(AddArgs),
    /// Change an item's title, completion, or order.
    Edit(EditArgs),
    /// Flip an item between open and completed.
    Toggle(IdArg),
    /// Remove an item.
    Rm(IdArg),
    /// Show items.
    Ls(LsArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub title: String,

    /// Owning list (unique prefixes accepted).
    #[arg(long)]
    pub list: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Item id (unique prefixes accepted).
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub completed: Option<bool>,

    #[arg(long, allow_negative_numbers = true)]
    pub sort_order: Option<i64>,
}

#[derive(Args, Debug)]
pub struct IdArg {
    /// Item id (unique prefixes accepted).
    pub id: String,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Only items of this list.
    #[arg(long, conflicts_with = "todos")]
    pub list: Option<String>,

    /// Only standalone todos.
    #[arg(long)]
    pub todos: bool,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    pub title: String,
    pub completed: bool,
    pub sort_order: i64,
    pub sync: &'static str,
    #[serde(skip)]
    pub state: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SyncFailure>,
}

impl From<&Member> for ItemView {
    fn from(item: &Member) -> Self {
        Self {
            id: item.id.clone(),
            list_id: item.container_id.clone(),
            title: item.title.clone(),
            completed: item.completed,
            sort_order: item.sort_order,
            sync: item.sync.as_str(),
            state: item.sync,
            failure: item.sync_failure.clone(),
        }
    }
}

/// Items grouped under their list heading; `list` is `None` for todos.
#[derive(Debug, Serialize)]
struct ItemGroup {
    list: Option<String>,
    title: String,
    items: Vec<ItemView>,
}

#[derive(Debug, Serialize)]
struct Removed {
    id: String,
    outcome: Removal,
}

pub fn run_item(args: &ItemArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let ws = check(output, Workspace::discover(project_root))?;

    match &args.command {
        ItemCommand::Add(add) => {
            let view = check(
                output,
                ws.edit(|store| {
                    let container_id = add
                        .list
                        .as_deref()
                        .map(|raw| resolve_list_id(store, raw))
                        .transpose()?;
                    let id = store.create_member(NewMember {
                        container_id,
                        title: add.title.clone(),
                    })?;
                    view_of(store, &id)
                }),
            )?;
            render(output, &view, |v, w| match &v.list_id {
                Some(list) => writeln!(w, "✓ Added '{}' to {list} ({})", v.title, v.id),
                None => writeln!(w, "✓ Added todo '{}' ({})", v.title, v.id),
            })
        }
        ItemCommand::Edit(edit) => {
            let patch = MemberPatch {
                title: edit.title.clone(),
                completed: edit.completed,
                sort_order: edit.sort_order,
            };
            if patch.is_empty() {
                return fail(
                    output,
                    CliError::new("nothing to change: pass --title, --completed, or --sort-order"),
                );
            }
            let view = check(output, ws.edit(|store| update(store, &edit.id, &patch)))?;
            render(output, &view, |v, w| writeln!(w, "✓ Updated {}", v.id))
        }
        ItemCommand::Toggle(arg) => {
            let view = check(
                output,
                ws.edit(|store| {
                    let id = resolve_item_id(store, &arg.id)?;
                    let completed = store.member(&id).is_some_and(|m| m.completed);
                    let patch = MemberPatch {
                        completed: Some(!completed),
                        ..MemberPatch::default()
                    };
                    update(store, &id, &patch)
                }),
            )?;
            render(output, &view, |v, w| {
                let state = if v.completed { "done" } else { "open" };
                writeln!(w, "✓ {} is now {state}", v.id)
            })
        }
        ItemCommand::Rm(arg) => {
            let removed = check(
                output,
                ws.edit(|store| {
                    let id = resolve_item_id(store, &arg.id)?;
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
        ItemCommand::Ls(ls) => {
            let store = check(output, ws.read())?;
            let groups = check(output, collect_groups(&store, ls))?;
            if output.is_json() {
                let items: Vec<&ItemView> = groups.iter().flat_map(|g| &g.items).collect();
                return render(output, &items, |_, _| Ok(()));
            }
            render_mode(
                output,
                &groups,
                |g, w| render_items_text(g, w),
                |g, w| render_items_pretty(g, w),
            )
        }
    }
}

fn update(
    store: &mut LocalStore,
    raw_id: &str,
    patch: &MemberPatch,
) -> Result<ItemView, StoreError> {
    let id = resolve_item_id(store, raw_id)?;
    store.update_member(&id, patch)?;
    view_of(store, &id)
}

fn view_of(store: &LocalStore, id: &str) -> Result<ItemView, StoreError> {
    store
        .member(id)
        .map(ItemView::from)
        .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
}

fn group(store: &LocalStore, list: Option<(&str, &str)>) -> ItemGroup {
    let items = store
        .visible_members(list.map(|(id, _)| id))
        .into_iter()
        .map(ItemView::from)
        .collect();
    ItemGroup {
        list: list.map(|(id, _)| id.to_string()),
        title: list.map_or_else(|| "Todos".to_string(), |(_, title)| title.to_string()),
        items,
    }
}

fn collect_groups(store: &LocalStore, ls: &LsArgs) -> Result<Vec<ItemGroup>, StoreError> {
    if ls.todos {
        return Ok(vec![group(store, None)]);
    }
    if let Some(raw) = ls.list.as_deref() {
        let id = resolve_list_id(store, raw)?;
        let title = store.container(&id).map(|c| c.title.clone()).unwrap_or_default();
        return Ok(vec![group(store, Some((&id, &title)))]);
    }

    let mut groups: Vec<ItemGroup> = store
        .visible_containers()
        .map(|list| group(store, Some((&list.id, &list.title))))
        .collect();
    groups.push(group(store, None));
    Ok(groups)
}

fn render_items_text(groups: &[ItemGroup], w: &mut dyn Write) -> std::io::Result<()> {
    for g in groups {
        for v in &g.items {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}\t{}",
                v.id,
                v.list_id.as_deref().unwrap_or("-"),
                v.title,
                if v.completed { "done" } else { "open" },
                v.sort_order,
                v.sync
            )?;
        }
    }
    Ok(())
}

fn render_items_pretty(groups: &[ItemGroup], w: &mut dyn Write) -> std::io::Result<()> {
    let mut first = true;
    for g in groups.iter().filter(|g| !g.items.is_empty() || g.list.is_some()) {
        if !first {
            writeln!(w)?;
        }
        first = false;
        pretty_section(w, &g.title)?;
        if g.items.is_empty() {
            writeln!(w, "  (empty)")?;
        }
        for v in &g.items {
            let mark = if v.completed { "[x]" } else { "[ ]" };
            writeln!(
                w,
                "{} {mark} {:<38} {}",
                sync_marker(v.state, v.failure.as_ref()),
                v.id,
                v.title
            )?;
        }
    }
    if first {
        writeln!(w, "Nothing here yet. Add something with `tudu item add <title>`.")?;
    }
    Ok(())
}
