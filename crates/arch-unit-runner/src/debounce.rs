//! Base-debounce table and the `effective_debounce` calculation (§4.7.2).

use std::time::Duration;

use crate::stats::ExecutionHistory;

const DAY: Duration = Duration::from_secs(24 * 3600);

/// Base debounce derived from an analyzer's recent average run duration.
pub fn base_debounce(avg_duration: Duration) -> Duration {
    let ms = avg_duration.as_secs_f64() * 1000.0;
    if ms < 100.0 {
        Duration::ZERO
    } else if ms < 1_000.0 {
        Duration::from_secs(5)
    } else if ms < 30_000.0 {
        Duration::from_secs(5 * 60)
    } else if ms < 5.0 * 60_000.0 {
        Duration::from_secs(3600)
    } else if ms < 15.0 * 60_000.0 {
        Duration::from_secs(3 * 3600)
    } else {
        Duration::from_secs(8 * 3600)
    }
}

/// `clamp(base * factor, 0, 24h)`, or an explicit config override
/// short-circuiting the calculation entirely.
pub fn effective_debounce(history: &ExecutionHistory, override_duration: Option<Duration>) -> Duration {
    if let Some(d) = override_duration {
        return d;
    }
    let base = base_debounce(Duration::from_secs_f64(history.avg_duration_ms / 1000.0));
    let scaled = base.as_secs_f64() * history.adaptation_factor;
    Duration::from_secs_f64(scaled.clamp(0.0, DAY.as_secs_f64()))
}

/// True iff a run should be skipped (debounced) right now.
pub fn should_skip(history: &ExecutionHistory, effective: Duration, now: chrono::DateTime<chrono::Utc>) -> bool {
    if history.run_count == 0 {
        return false;
    }
    let elapsed = now.signed_duration_since(history.last_run_at);
    elapsed < chrono::Duration::from_std(effective).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_debounce_buckets() {
        assert_eq!(base_debounce(Duration::from_millis(50)), Duration::ZERO);
        assert_eq!(base_debounce(Duration::from_millis(500)), Duration::from_secs(5));
        assert_eq!(base_debounce(Duration::from_secs(10)), Duration::from_secs(300));
        assert_eq!(base_debounce(Duration::from_secs(120)), Duration::from_secs(3600));
        assert_eq!(base_debounce(Duration::from_secs(600)), Duration::from_secs(3 * 3600));
        assert_eq!(base_debounce(Duration::from_secs(1200)), Duration::from_secs(8 * 3600));
    }

    #[test]
    fn explicit_override_short_circuits() {
        let history = ExecutionHistory {
            analyzer: "x".into(),
            workdir: "y".into(),
            last_run_at: chrono::Utc::now(),
            avg_duration_ms: 20_000.0,
            run_count: 1,
            consecutive_no_violations: 0,
            consecutive_violations: 0,
            adaptation_factor: 1.0,
        };
        assert_eq!(effective_debounce(&history, Some(Duration::from_secs(30))), Duration::from_secs(30));
    }

    #[test]
    fn factor_scales_base() {
        let history = ExecutionHistory {
            analyzer: "x".into(),
            workdir: "y".into(),
            last_run_at: chrono::Utc::now(),
            avg_duration_ms: 10_000.0,
            run_count: 1,
            consecutive_no_violations: 0,
            consecutive_violations: 0,
            adaptation_factor: 2.0,
        };
        assert_eq!(effective_debounce(&history, None), Duration::from_secs(7200));
    }
}
