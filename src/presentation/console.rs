// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::folder::{CollectionStats, FolderWithSites};
use crate::domain::models::queue::{QueueSnapshot, TaskDetail};
use crate::domain::services::queue_poller::{PollerPhase, PollerStatus};
use crate::domain::services::recurrence;
use crate::domain::services::task_classifier::{self, TaskKind, TaskTotals};
use crate::domain::services::ui_hooks::{Notice, Notifier};
use chrono::DateTime;
use std::fmt::{self, Write};

/// 预留任务列表最多显示的条数
pub const RESERVED_PREVIEW: usize = 5;

/// 把通知打印到终端的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        println!("{}", notice);
    }
}

/// 渲染文件夹集合
///
/// 每个文件夹一行，包含调度描述和已启用/总站点数，站点缩进列出
pub fn render_folders(folders: &[FolderWithSites], stats: CollectionStats) -> String {
    let mut out = String::new();
    let _ = write_folders(&mut out, folders, stats);
    out
}

fn write_folders(
    out: &mut String,
    folders: &[FolderWithSites],
    stats: CollectionStats,
) -> fmt::Result {
    writeln!(
        out,
        "Folders: {} of {} enabled",
        stats.enabled_folders, stats.total_folders
    )?;
    if folders.is_empty() {
        return writeln!(out, "  (no folders)");
    }

    for entry in folders {
        let folder = &entry.folder;
        let schedule = recurrence::describe(folder).unwrap_or_else(|e| format!("invalid schedule: {}", e));
        writeln!(
            out,
            "{} {} | {} | sites {}/{} | depth {}",
            switch(folder.enabled),
            folder.name,
            schedule,
            entry.enabled_site_count(),
            entry.sites.len(),
            folder.max_depth
        )?;
        for site in &entry.sites {
            writeln!(out, "    {} {} <{}>", switch(site.enabled), site.name, site.url)?;
        }
    }
    Ok(())
}

fn switch(enabled: bool) -> &'static str {
    if enabled {
        "[on ]"
    } else {
        "[off]"
    }
}

/// 渲染队列监视面板
pub fn render_queue(status: &PollerStatus) -> String {
    let mut out = String::new();
    let _ = write_queue(&mut out, status);
    out
}

fn write_queue(out: &mut String, status: &PollerStatus) -> fmt::Result {
    let phase = match status.phase {
        PollerPhase::Polling => "polling",
        PollerPhase::Idle => "idle",
    };

    let Some(snapshot) = status.snapshot.as_deref() else {
        writeln!(out, "Queue: no data yet ({})", phase)?;
        if let Some(error) = &status.error {
            writeln!(out, "Error: {}", error)?;
        }
        return Ok(());
    };

    write_activity(out, snapshot, phase)?;
    write_workers(out, snapshot)?;

    let totals = TaskTotals::from_stats(&snapshot.total_stats);
    writeln!(
        out,
        "Completed: {} {} | {} {} | {} {}",
        TaskKind::Crawl,
        totals.get(TaskKind::Crawl),
        TaskKind::SmartEmbedding,
        totals.get(TaskKind::SmartEmbedding),
        TaskKind::PlainEmbedding,
        totals.get(TaskKind::PlainEmbedding)
    )?;

    if !snapshot.task_details.active.is_empty() {
        writeln!(out, "Active tasks:")?;
        for task in &snapshot.task_details.active {
            write_task(out, task)?;
        }
    }

    let reserved = &snapshot.task_details.reserved;
    if !reserved.is_empty() {
        writeln!(out, "Reserved tasks:")?;
        for task in reserved.iter().take(RESERVED_PREVIEW) {
            write_task(out, task)?;
        }
        if reserved.len() > RESERVED_PREVIEW {
            writeln!(out, "  ... and {} more", reserved.len() - RESERVED_PREVIEW)?;
        }
    }

    if !snapshot.processing_stats.is_empty() {
        writeln!(out, "Processing:")?;
        for (worker, stats) in &snapshot.processing_stats {
            writeln!(
                out,
                "  - {}: {} processed, {:.1}/min, {:.1}/h, up {} min",
                worker,
                stats.total_processed,
                stats.tasks_per_minute,
                stats.tasks_per_hour,
                stats.uptime_minutes()
            )?;
        }
    }

    if let Some(error) = &status.error {
        writeln!(out, "Error: {}", error)?;
    }
    if !snapshot.timestamp.is_empty() {
        writeln!(out, "Updated: {}", snapshot.timestamp)?;
    }
    Ok(())
}

fn write_activity(out: &mut String, snapshot: &QueueSnapshot, phase: &str) -> fmt::Result {
    let activity = &snapshot.current_activity;
    let mut flags = Vec::new();
    if activity.is_crawling {
        flags.push("crawling");
    }
    if activity.is_processing_embeddings {
        flags.push("embedding");
    }
    if activity.has_pending_work {
        flags.push("pending work");
    }

    if flags.is_empty() {
        writeln!(out, "Queue: idle ({})", phase)?;
    } else {
        writeln!(out, "Queue: {} ({})", flags.join(", "), phase)?;
    }

    let counts = &snapshot.queue_status;
    writeln!(
        out,
        "  Waiting: {}  Active: {}  Reserved: {}  Scheduled: {}",
        counts.total_pending, counts.active_tasks, counts.reserved_tasks, counts.scheduled_tasks
    )
}

fn write_workers(out: &mut String, snapshot: &QueueSnapshot) -> fmt::Result {
    let workers = &snapshot.workers;
    writeln!(out, "Workers: {} online", workers.online)?;
    if workers.online == 0 {
        writeln!(out, "  ! No workers online, queued tasks will not run")?;
    }

    for (name, detail) in &workers.details {
        let mut line = format!("  - {}", name);
        if let Some(pid) = detail.pid {
            let _ = write!(line, " pid {}", pid);
        }
        if let Some(uptime) = detail.uptime {
            let _ = write!(line, ", up {} min", uptime / 60);
        }
        if let Some(pool) = &detail.pool {
            let _ = write!(line, ", pool {}", pool.implementation_name());
            if let Some(max) = pool.max_concurrency {
                let _ = write!(line, " (max {})", max);
            }
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

fn write_task(out: &mut String, task: &TaskDetail) -> fmt::Result {
    write!(
        out,
        "  - {} [{}]",
        task_classifier::display_name(&task.name),
        task.short_id()
    )?;
    if let Some(url) = task.target_url() {
        write!(out, " {}", url)?;
    }
    if let Some(started) = task
        .time_start
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
    {
        write!(out, " (started {})", started.format("%H:%M:%S"))?;
    }
    writeln!(out, " on {}", task.worker)
}

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;
