//! `tudu sync`: one reconciliation pass against the configured server.
//!
//! The workspace lock is taken without waiting: a second `tudu sync` while
//! one is in flight fails instead of re-sending the same creates. The snapshot
//! is rewritten after every confirmed change, so an interrupted pass resumes
//! where it stopped.

use chrono::{SecondsFormat, Utc};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tudu_core::error::ErrorCode;
use tudu_core::sync::{Origin, ReconcileReport, Reconciler, load_or_seed};

use crate::output::{CliError, OutputMode, check, fail, pretty_kv, render_mode};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct SyncArgs {}

#[derive(Debug, Serialize)]
pub struct SyncOutput {
    pub server: String,
    pub origin: Origin,
    pub finished_at: String,
    #[serde(flatten)]
    pub report: ReconcileReport,
}

pub fn run_sync(_args: &SyncArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let ws = check(output, Workspace::discover(project_root))?;
    let Some(mut remote) = ws.remote() else {
        return fail(
            output,
            CliError::coded(
                ErrorCode::RemoteNotConfigured,
                "no server configured for this workspace",
            ),
        );
    };

    let _lock = check(output, ws.lock(Duration::ZERO))?;
    let snapshot = ws.snapshot();
    let (mut store, origin) = check(output, load_or_seed(&snapshot, Some(&mut remote)))?;
    if matches!(origin, Origin::Seeded { .. }) {
        check(output, snapshot.save(&store))?;
    }

    let reconciler = Reconciler::new(ws.config().reconcile_options());
    let report = check(
        output,
        reconciler.run_with(&mut store, &mut remote, |s| snapshot.save(s)),
    )?;
    // An offline first run leaves the workspace unseeded.
    if origin != Origin::Empty || !store.is_empty() {
        check(output, snapshot.save(&store))?;
    }

    let out = SyncOutput {
        server: remote.base_url().to_string(),
        origin,
        finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        report,
    };
    render_mode(output, &out, render_sync_text, render_sync_pretty)
}

fn render_sync_text(out: &SyncOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let r = &out.report;
    writeln!(
        w,
        "created={} updated={} deleted={} purged={} deferred={} failed={} blocked={}",
        r.created, r.updated, r.deleted, r.purged, r.deferred, r.failed, r.blocked
    )?;
    for f in &r.failures {
        writeln!(
            w,
            "failed\t{}\t{}\t{:?}\t{}\t{}",
            f.kind, f.id, f.operation, f.error.code, f.error.message
        )?;
    }
    writeln!(w, "{}", unsynced_line(r.pending_after))
}

fn render_sync_pretty(out: &SyncOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let r = &out.report;
    if let Origin::Seeded { lists, items } = out.origin {
        writeln!(w, "Loaded {lists} lists and {items} items from {}", out.server)?;
    }
    if r.confirmed() > 0 || r.purged > 0 {
        writeln!(
            w,
            "✓ Synced with {}: {} created, {} updated, {} deleted",
            out.server, r.created, r.updated, r.deleted
        )?;
    }
    if r.purged > 0 {
        pretty_kv(w, "purged", r.purged.to_string())?;
    }
    if r.deferred > 0 {
        pretty_kv(w, "deferred", r.deferred.to_string())?;
    }
    if r.skipped_blocked > 0 {
        pretty_kv(w, "blocked", r.skipped_blocked.to_string())?;
    }
    for f in &r.failures {
        let marker = if f.blocked { "!" } else { "✗" };
        writeln!(
            w,
            "{marker} {:?} {} {}: {}",
            f.operation, f.kind, f.id, f.error.message
        )?;
    }
    if r.unauthorized {
        writeln!(
            w,
            "The server no longer accepts this session. {}",
            ErrorCode::Unauthorized.hint().unwrap_or_default()
        )?;
    }
    writeln!(w, "{}", unsynced_line(r.pending_after))
}

fn unsynced_line(pending: usize) -> String {
    match pending {
        0 => "Everything is synced".to_string(),
        1 => "1 item still unsynced".to_string(),
        n => format!("{n} items still unsynced"),
    }
}
