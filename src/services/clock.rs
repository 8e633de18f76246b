//! Calendar clock used to resolve "today"

use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{Datelike, Duration, FixedOffset, Local, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, in a fixed UTC offset or the host's local timezone
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    /// `None` uses the host timezone. Out-of-range offsets fall back to it as well.
    pub fn new(utc_offset_minutes: Option<i32>) -> Self {
        let offset = utc_offset_minutes.and_then(|m| FixedOffset::east_opt(m * 60));
        if utc_offset_minutes.is_some() && offset.is_none() {
            tracing::warn!("Ignoring out-of-range UTC offset {:?}", utc_offset_minutes);
        }
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
            None => Local::now().date_naive(),
        }
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    days_from_ce: AtomicI32,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            days_from_ce: AtomicI32::new(today.num_days_from_ce()),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        self.days_from_ce.store(today.num_days_from_ce(), Ordering::SeqCst);
    }

    pub fn advance(&self, days: i64) {
        self.set(self.today() + Duration::days(days));
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        let days = self.days_from_ce.load(Ordering::SeqCst);
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(NaiveDate::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.today(), start);

        clock.advance(2);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_invalid_offset_falls_back_to_local() {
        let clock = SystemClock::new(Some(24 * 60 * 3));
        assert_eq!(clock.today(), Local::now().date_naive());
    }
}
