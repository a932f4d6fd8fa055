use std::sync::Arc;

use anyhow::Result;
use cadence_domain::clock::{Clock, PinnedDateClock, SystemClock};
use cadence_domain::occurrence::TaskOccurrence;
use cadence_domain::overdue::is_occurrence_overdue;
use cadence_domain::scheduler::ReconcileScheduler;
use cadence_domain::TaskService;
use cadence_store::{DataPaths, HistoryDb, OneOffDb, RecurringDb, TemplateFile};
use tracing::{info, warn};

use crate::seed;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) paths: DataPaths,
    pub(crate) mock_today: Option<String>,
    pub(crate) dev: bool,
    pub(crate) watch: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let dev = std::env::var("APP_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);
        let watch = std::env::args().any(|arg| arg == "watch");
        Self {
            paths: DataPaths::from_env(),
            mock_today: std::env::var("MOCK_TODAY").ok(),
            dev,
            watch,
        }
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    if config.dev {
        if let Err(err) = seed::seed_dev_data(&config.paths) {
            warn!(%err, "dev seeding failed, continuing with existing data");
        }
    }

    let clock: Box<dyn Clock> = match config.mock_today.as_deref() {
        Some(mock) => match PinnedDateClock::parse(mock) {
            Some(pinned) => {
                info!(date = mock, "pinning today to mock date");
                Box::new(pinned)
            }
            None => {
                warn!(date = mock, "MOCK_TODAY is not YYYY-MM-DD, using system clock");
                Box::new(SystemClock)
            }
        },
        None => Box::new(SystemClock),
    };

    let service = Arc::new(
        TaskService::builder()
            .with_templates(Box::new(TemplateFile::new(config.paths.clone())))
            .with_recurring(Box::new(RecurringDb::new(config.paths.clone())))
            .with_one_offs(Box::new(OneOffDb::new(config.paths.clone())))
            .with_history(Box::new(HistoryDb::new(config.paths.clone())))
            .with_clock(clock)
            .build()?,
    );

    let scheduler = ReconcileScheduler::new(Arc::clone(&service));
    scheduler.start();

    print_agenda(&service);

    if config.watch {
        info!("watching; reconciliation re-runs daily at 00:05 local");
        loop {
            std::thread::sleep(std::time::Duration::from_secs(3600));
        }
    }
    Ok(())
}

/// Print today's list in display order, marking overdue items. When every
/// source comes back empty the built-in default keeps the list usable.
fn print_agenda(service: &TaskService) {
    let today = service.clock().today();
    let mut items = service.sorted_occurrences_for(today);
    if items.is_empty() {
        items = vec![seed::default_occurrence()];
    }

    let history = service.history().unwrap_or_default();
    let now = service.clock().now();

    println!("Tasks for {}", today.format("%Y-%m-%d"));
    for item in &items {
        println!("{}", format_line(item, is_occurrence_overdue(item, &history, now)));
    }
}

fn format_line(item: &TaskOccurrence, overdue: bool) -> String {
    let marker = if overdue { "!" } else { " " };
    let due = item
        .due_date
        .as_deref()
        .map(|d| format!("  (due {d})"))
        .unwrap_or_default();
    format!("{marker} {}{due}", item.name)
}
