use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local};
use tracing::{debug, error};

use crate::service::TaskService;

// Reconciliation re-runs shortly after each midnight so the new day's
// placeholders exist before anyone looks at the list.
const RUN_HOUR: u32 = 0;
const RUN_MINUTE: u32 = 5;

/// How long to sleep until the next daily run: today's 00:05 local when it
/// is still ahead, otherwise tomorrow's.
pub fn delay_until_next_run(now: DateTime<Local>) -> StdDuration {
    let today_run = now
        .date_naive()
        .and_hms_opt(RUN_HOUR, RUN_MINUTE, 0)
        .unwrap_or_else(|| now.naive_local());
    let next = if today_run > now.naive_local() {
        today_run
    } else {
        today_run + Duration::days(1)
    };
    (next - now.naive_local())
        .to_std()
        .unwrap_or(StdDuration::from_secs(60))
}

/// Owns the daily reconciliation loop. `start` is idempotent: repeated
/// calls (boot plus per-page-load wiring) spawn exactly one worker thread,
/// which runs one pass immediately and then once per day.
pub struct ReconcileScheduler {
    service: Arc<TaskService>,
    started: AtomicBool,
}

impl ReconcileScheduler {
    pub fn new(service: Arc<TaskService>) -> Self {
        Self {
            service,
            started: AtomicBool::new(false),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let service = Arc::clone(&self.service);
        let spawned = thread::Builder::new()
            .name("scheduled-reconcile".to_string())
            .spawn(move || {
                run_pass(&service);
                loop {
                    let delay = delay_until_next_run(Local::now());
                    debug!(seconds = delay.as_secs(), "sleeping until next reconcile run");
                    thread::sleep(delay);
                    run_pass(&service);
                }
            });

        if let Err(err) = spawned {
            error!(%err, "failed to spawn reconcile scheduler thread");
            self.started.store(false, Ordering::SeqCst);
        }
    }
}

fn run_pass(service: &TaskService) {
    // A failed cycle is logged and dropped; the next scheduled run retries.
    if let Err(err) = service.reconcile_scheduled(None) {
        error!(%err, "scheduled reconciliation failed");
    }
}
