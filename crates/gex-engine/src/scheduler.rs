//! Recalculation scheduler
//!
//! Coalesces bursty trade flow into a bounded recalculation cadence: run
//! after N trades or T elapsed, whichever comes first.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RecalcScheduler {
    every_n_trades: u64,
    interval: Duration,
    trades_since_last: u64,
    last_run: Option<Instant>,
}

impl RecalcScheduler {
    pub fn new(every_n_trades: u64, interval: Duration) -> Self {
        Self {
            every_n_trades: every_n_trades.max(1),
            interval,
            trades_since_last: 0,
            last_run: None,
        }
    }

    pub fn from_config(config: &config::SchedulerConfig) -> Self {
        Self::new(
            config.recalc_every_n_trades,
            Duration::from_secs(config.recalc_interval_seconds),
        )
    }

    pub fn record_trade(&mut self) {
        self.trades_since_last += 1;
    }

    pub fn trades_since_last(&self) -> u64 {
        self.trades_since_last
    }

    /// True if nothing has run yet, enough trades arrived, or enough time passed.
    pub fn should_run(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => {
                self.trades_since_last >= self.every_n_trades
                    || now.saturating_duration_since(last) >= self.interval
            }
        }
    }

    /// Reset both counters.
    pub fn mark_run(&mut self, now: Instant) {
        self.trades_since_last = 0;
        self.last_run = Some(now);
    }
}

impl Default for RecalcScheduler {
    fn default() -> Self {
        Self::from_config(&config::SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_check_runs() {
        let scheduler = RecalcScheduler::default();
        assert!(scheduler.should_run(Instant::now()));
    }

    #[test]
    fn test_trade_count_trigger() {
        let start = Instant::now();
        let mut scheduler = RecalcScheduler::new(10, Duration::from_secs(5));
        scheduler.mark_run(start);

        for _ in 0..9 {
            scheduler.record_trade();
        }
        assert!(!scheduler.should_run(start));
        scheduler.record_trade();
        assert!(scheduler.should_run(start));

        scheduler.mark_run(start);
        assert_eq!(scheduler.trades_since_last(), 0);
        assert!(!scheduler.should_run(start));
    }

    #[test]
    fn test_elapsed_time_trigger() {
        let start = Instant::now();
        let mut scheduler = RecalcScheduler::new(10, Duration::from_secs(5));
        scheduler.mark_run(start);

        assert!(!scheduler.should_run(start + Duration::from_millis(4999)));
        assert!(scheduler.should_run(start + Duration::from_secs(5)));

        scheduler.mark_run(start + Duration::from_secs(5));
        assert!(!scheduler.should_run(start + Duration::from_secs(6)));
    }
}
