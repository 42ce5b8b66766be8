//! Main sync command

use crate::config::Config;
use crate::diff::{generate_sync_plan, CompareMode, DiffPlan};
use crate::executor::{ExecutionCallback, ExecutionStats, Executor};
use crate::logging::{Logger, TracingLogger};
use crate::report::render_report;
use crate::scanner::{ProgressCallback, Scanner};
use crate::state::StateStore;
use crate::types::SyncError;
use crate::ui::ProgressReporter;
use indicatif::HumanBytes;
use std::sync::{Arc, Mutex};

/// Outcome of one sync run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    /// The plan derived from scan and state
    pub plan: DiffPlan,
    /// Execution statistics; `None` for dry runs
    pub execution: Option<ExecutionStats>,
    /// Rendered dry-run report; `None` when changes were applied
    pub report: Option<String>,
}

/// Run the sync operation, logging through `tracing`
pub fn run(config: &Config) -> Result<SyncSummary, SyncError> {
    run_with_logger(config, Arc::new(TracingLogger))
}

/// Run the sync operation with an explicit logger
///
/// Scan the source, diff against the destination's recorded state, then
/// either print the dry-run report or apply the actions and persist the new
/// state. The state is written only after every action succeeded.
pub fn run_with_logger(config: &Config, logger: Arc<dyn Logger>) -> Result<SyncSummary, SyncError> {
    if let Some(limit) = config.bandwidth_limit {
        logger.warn(&format!(
            "Bandwidth limit of {} KB/s requested; throttling is not supported and will be ignored",
            limit
        ));
    }

    let reporter = Arc::new(Mutex::new(ProgressReporter::new()));

    let scan_progress: ProgressCallback = {
        let reporter = Arc::clone(&reporter);
        Box::new(move |entries: u64, bytes: u64| {
            if let Ok(progress) = reporter.lock() {
                progress.scanning(entries, bytes);
            }
        })
    };

    let snapshot = Scanner::new(&config.exclude_patterns)
        .with_logger(Arc::clone(&logger))
        .with_progress(scan_progress)
        .scan(&config.source)?;

    if let Ok(progress) = reporter.lock() {
        progress.scanned(snapshot.len(), snapshot.total_size());
    }

    let store = StateStore::with_logger(Arc::clone(&logger));
    let mut state = if config.dry_run {
        store.peek(&config.destination)?
    } else {
        store.load(&config.destination)?
    };

    let mode = if config.checksum_mode {
        CompareMode::Checksum
    } else {
        CompareMode::Metadata
    };
    let plan = generate_sync_plan(&snapshot, &state.entries, mode);
    println!("{}", format_plan_preview(&plan));

    if config.dry_run {
        let report = render_report(&plan.actions, &state.entries);
        println!("{}", report);
        println!("Dry-run mode: no changes were made.");
        return Ok(SyncSummary {
            plan,
            execution: None,
            report: Some(report),
        });
    }

    let execution = if plan.is_noop() {
        println!("Nothing to sync.");
        ExecutionStats {
            total_actions: plan.actions.len(),
            completed_actions: plan.actions.len(),
            ..Default::default()
        }
    } else {
        if let Ok(mut progress) = reporter.lock() {
            progress.begin_apply(plan.stats.change_count() as u64);
        }

        let progress_cb: &ExecutionCallback<'_> = &|event| {
            if let Ok(mut progress) = reporter.lock() {
                progress.on_event(event);
            }
        };

        Executor::new(config.chunk_size)?
            .with_logger(Arc::clone(&logger))
            .execute(
                &config.source,
                &config.destination,
                &plan.actions,
                Some(progress_cb),
            )?
    };

    state.replace_entries(snapshot);
    store.save(&config.destination, &mut state)?;
    logger.info(&format!(
        "Sync complete: {} entries recorded",
        state.entries.len()
    ));

    Ok(SyncSummary {
        plan,
        execution: Some(execution),
        report: None,
    })
}

fn format_plan_preview(plan: &DiffPlan) -> String {
    format!(
        "Plan:\n  Create: {}  Update: {}  Delete: {}  Unchanged: {}\n  Total bytes to transfer: {}",
        plan.stats.create_count,
        plan.stats.update_count,
        plan.stats.delete_count,
        plan.stats.skip_count,
        HumanBytes(plan.stats.total_bytes)
    )
}
