use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Point-in-time view of the health window, served on `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub failures_in_window: usize,
    pub unhealthy_threshold: usize,
    /// Slots in buffer order; `cursor` is the next slot to be overwritten.
    pub window: Vec<bool>,
    pub cursor: usize,
    pub runs_recorded: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_run_succeeded: Option<bool>,
}

#[derive(Debug)]
struct HealthWindow {
    results: Vec<bool>,
    cursor: usize,
    runs_recorded: u64,
    last_run: Option<(DateTime<Utc>, bool)>,
}

impl HealthWindow {
    fn failures(&self) -> usize {
        self.results.iter().filter(|ok| !**ok).count()
    }
}

/// Outcomes of the most recent transfer runs and the verdict derived from them.
///
/// The window starts filled with successes so a freshly started service is
/// reported healthy before its first run completes. The service turns
/// unhealthy once more than `floor(window * unhealthy_ratio)` of the recorded
/// runs failed; a ratio of `0.0` makes any single failure count.
#[derive(Debug)]
pub struct HealthTracker {
    window: RwLock<HealthWindow>,
    threshold: usize,
}

impl HealthTracker {
    pub fn new(window: NonZeroUsize, unhealthy_ratio: f64) -> Self {
        let size = window.get();
        // Nudged up so products like 100 * 0.29 don't land one step below.
        let threshold = (size as f64 * unhealthy_ratio.clamp(0.0, 1.0) + 1e-9).floor() as usize;

        Self {
            window: RwLock::new(HealthWindow {
                results: vec![true; size],
                cursor: 0,
                runs_recorded: 0,
                last_run: None,
            }),
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub async fn record(&self, success: bool) {
        let mut window = self.window.write().await;
        let cursor = window.cursor;
        let size = window.results.len();
        window.results[cursor] = success;
        window.cursor = (cursor + 1) % size;
        window.runs_recorded += 1;
        window.last_run = Some((Utc::now(), success));
    }

    pub async fn is_healthy(&self) -> bool {
        let window = self.window.read().await;
        window.failures() <= self.threshold
    }

    pub async fn snapshot(&self) -> HealthStatus {
        let window = self.window.read().await;
        let failures_in_window = window.failures();

        HealthStatus {
            is_healthy: failures_in_window <= self.threshold,
            failures_in_window,
            unhealthy_threshold: self.threshold,
            window: window.results.clone(),
            cursor: window.cursor,
            runs_recorded: window.runs_recorded,
            last_run: window.last_run.map(|(at, _)| at),
            last_run_succeeded: window.last_run.map(|(_, ok)| ok),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> HealthTracker {
        HealthTracker::new(NonZeroUsize::new(10).unwrap(), 0.5)
    }

    async fn tracker_with(results: &[bool], ratio: f64) -> HealthTracker {
        let tracker = HealthTracker::new(NonZeroUsize::new(results.len()).unwrap(), ratio);
        for result in results {
            tracker.record(*result).await;
        }
        tracker
    }

    #[tokio::test]
    async fn test_fresh_tracker_is_healthy() {
        let tracker = tracker();
        assert!(tracker.is_healthy().await);

        let status = tracker.snapshot().await;
        assert_eq!(status.window, vec![true; 10]);
        assert_eq!(status.runs_recorded, 0);
        assert_eq!(status.last_run, None);
    }

    #[tokio::test]
    async fn test_majority_threshold() {
        let cases: [(&str, [bool; 10], bool); 6] = [
            ("all true", [true; 10], true),
            ("one false", [true, true, true, true, true, true, true, true, true, false], true),
            ("two false", [true, true, true, true, true, true, true, true, false, false], true),
            ("five false", [true, true, true, true, true, false, false, false, false, false], true),
            ("six false", [true, true, true, true, false, false, false, false, false, false], false),
            ("all false", [false; 10], false),
        ];

        for (desc, results, expected) in cases {
            let tracker = tracker_with(&results, 0.5).await;
            assert_eq!(tracker.threshold(), 5, "{}", desc);
            assert_eq!(tracker.is_healthy().await, expected, "{}", desc);
        }
    }

    #[tokio::test]
    async fn test_zero_ratio_fails_on_any_failure() {
        let tracker = tracker_with(&[true, true, true, false], 0.0).await;
        assert_eq!(tracker.threshold(), 0);
        assert!(!tracker.is_healthy().await);

        let tracker = tracker_with(&[true; 4], 0.0).await;
        assert!(tracker.is_healthy().await);
    }

    #[tokio::test]
    async fn test_threshold_rounds_down() {
        let tracker = HealthTracker::new(NonZeroUsize::new(5).unwrap(), 0.5);
        assert_eq!(tracker.threshold(), 2);

        let tracker = tracker_with(&[false, false, false, true, true], 0.5).await;
        assert!(!tracker.is_healthy().await);
    }

    #[test]
    fn test_threshold_survives_float_rounding() {
        let cases = [(100, 0.29, 29), (100, 0.57, 57), (10, 0.3, 3), (10, 0.7, 7), (3, 1.0, 3)];

        for (size, ratio, expected) in cases {
            let tracker = HealthTracker::new(NonZeroUsize::new(size).unwrap(), ratio);
            assert_eq!(tracker.threshold(), expected, "{} * {}", size, ratio);
        }
    }

    #[tokio::test]
    async fn test_record_is_a_ring_write() {
        let tracker = tracker();
        let outcomes = [true, false, true, true, false, false, true, false, true, false];
        for outcome in outcomes {
            tracker.record(outcome).await;
        }

        let status = tracker.snapshot().await;
        assert_eq!(status.window, outcomes.to_vec());
        assert_eq!(status.cursor, 0);

        tracker.record(false).await;
        let status = tracker.snapshot().await;
        assert!(!status.window[0]);
        assert_eq!(&status.window[1..], &outcomes[1..]);
        assert_eq!(status.cursor, 1);
        assert_eq!(status.runs_recorded, 11);
        assert_eq!(status.last_run_succeeded, Some(false));
    }

    #[tokio::test]
    async fn test_recovers_as_failures_age_out() {
        let tracker = tracker();
        for _ in 0..10 {
            tracker.record(false).await;
        }
        assert!(!tracker.is_healthy().await);

        for _ in 0..4 {
            tracker.record(true).await;
        }
        assert!(!tracker.is_healthy().await);

        tracker.record(true).await;
        assert!(tracker.is_healthy().await);
        assert_eq!(tracker.snapshot().await.failures_in_window, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_and_writer() {
        let tracker = std::sync::Arc::new(tracker());

        let writer = {
            let tracker = std::sync::Arc::clone(&tracker);
            tokio::spawn(async move {
                for i in 0..1000 {
                    tracker.record(i % 3 != 0).await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let tracker = std::sync::Arc::clone(&tracker);
            readers.push(tokio::spawn(async move {
                for _ in 0..250 {
                    let status = tracker.snapshot().await;
                    assert_eq!(status.window.len(), 10);
                    assert_eq!(status.is_healthy, status.failures_in_window <= 5);
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(tracker.snapshot().await.runs_recorded, 1000);
    }
}
