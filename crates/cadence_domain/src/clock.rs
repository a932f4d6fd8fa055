use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now". Passed explicitly wherever the current time matters so
/// tests and deterministic development never branch on ambient state.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn today_iso(&self) -> String {
        self.today().format("%Y-%m-%d").to_string()
    }
}

/// Production wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A frozen instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A fixed calendar date combined with the real time of day, so a dev
/// environment can be pinned to a mock "today" while timers and end-of-day
/// windows still move.
#[derive(Debug, Clone, Copy)]
pub struct PinnedDateClock {
    date: NaiveDate,
}

impl PinnedDateClock {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn parse(mock_today: &str) -> Option<Self> {
        NaiveDate::parse_from_str(mock_today.trim(), "%Y-%m-%d")
            .ok()
            .map(Self::new)
    }
}

impl Clock for PinnedDateClock {
    fn now(&self) -> DateTime<Utc> {
        self.date.and_time(Utc::now().time()).and_utc()
    }
}
