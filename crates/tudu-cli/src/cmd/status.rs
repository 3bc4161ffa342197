//! `tudu status`: what the next sync would push, and what it can't.

use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use tudu_core::model::EntityKind;
use tudu_core::store::{LocalStore, PendingSummary};

use crate::output::{OutputMode, check, pretty_kv, pretty_section, render_mode};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    pub snapshot: bool,
    pub lists: usize,
    pub items: usize,
    pub pending: usize,
    pub summary: PendingSummary,
    pub blocked: Vec<BlockedEntity>,
}

#[derive(Debug, Serialize)]
pub struct BlockedEntity {
    pub kind: EntityKind,
    pub id: String,
    pub title: String,
    pub attempts: u32,
    pub reason: String,
}

impl StatusReport {
    fn new(store: &LocalStore, root: String, server: Option<String>, snapshot: bool) -> Self {
        let blocked = store
            .blocked()
            .map(|entity| {
                let failure = entity.sync_failure();
                BlockedEntity {
                    kind: entity.kind(),
                    id: entity.id().to_string(),
                    title: entity.title().to_string(),
                    attempts: failure.map_or(0, |f| f.attempts),
                    reason: failure.map(|f| f.reason.clone()).unwrap_or_default(),
                }
            })
            .collect();
        Self {
            root,
            server,
            snapshot,
            lists: store.visible_containers().count(),
            items: store.members().iter().filter(|m| m.sync.is_live()).count(),
            pending: store.pending_count(),
            summary: store.pending_summary(),
            blocked,
        }
    }
}

pub fn run_status(
    _args: &StatusArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = check(output, Workspace::discover(project_root))?;
    let store = check(output, ws.read())?;
    let report = StatusReport::new(
        &store,
        ws.root().display().to_string(),
        ws.config().remote.base_url.clone(),
        ws.snapshot().exists(),
    );
    render_mode(output, &report, render_status_text, render_status_pretty)
}

fn render_status_text(report: &StatusReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "pending\t{}", report.pending)?;
    writeln!(w, "creates\t{}", report.summary.creates)?;
    writeln!(w, "updates\t{}", report.summary.updates)?;
    writeln!(w, "deletes\t{}", report.summary.deletes)?;
    writeln!(w, "blocked\t{}", report.blocked.len())?;
    for b in &report.blocked {
        writeln!(w, "{}\t{}\t{}\t{}", b.kind, b.id, b.attempts, b.reason)?;
    }
    Ok(())
}

fn render_status_pretty(report: &StatusReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Workspace")?;
    pretty_kv(w, "root", &report.root)?;
    pretty_kv(
        w,
        "server",
        report.server.as_deref().unwrap_or("(none configured)"),
    )?;
    pretty_kv(w, "lists", report.lists.to_string())?;
    pretty_kv(w, "items", report.items.to_string())?;
    writeln!(w)?;

    pretty_section(w, "Sync")?;
    if report.pending == 0 {
        writeln!(w, "✓ Everything is synced")?;
    } else {
        let noun = if report.pending == 1 { "item" } else { "items" };
        writeln!(w, "{} {noun} still unsynced", report.pending)?;
        pretty_kv(w, "creates", report.summary.creates.to_string())?;
        pretty_kv(w, "updates", report.summary.updates.to_string())?;
        pretty_kv(w, "deletes", report.summary.deletes.to_string())?;
        if report.summary.abandoned > 0 {
            pretty_kv(w, "abandoned", report.summary.abandoned.to_string())?;
        }
    }

    if !report.blocked.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Blocked ({})", report.blocked.len()))?;
        for b in &report.blocked {
            writeln!(w, "! {} {} '{}': {}", b.kind, b.id, b.title, b.reason)?;
        }
        writeln!(
            w,
            "\nSettle these with `tudu resolve <id> --retry` or `--discard`."
        )?;
    }
    Ok(())
}
