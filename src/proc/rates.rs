//! Turns cumulative kernel counters into per-second rates and CPU
//! utilization. Each deriver owns its baseline explicitly; there is no
//! process-wide singleton, so the first call after construction is
//! always a warmup with no rate to report.

use std::collections::HashMap;
use std::time::Instant;

use super::counters::CpuTimeSnapshot;

const EPSILON: f64 = 1e-6;
const TRACKED_KEYS: [&str; 4] = ["pgfault", "pgmajfault", "pswpin", "pswpout"];

/// Converts successive monotonic vmstat counter snapshots into per-second
/// rates under the name `<key>_per_sec`.
pub struct RateDeriver {
    baseline: Option<(HashMap<&'static str, u64>, Instant)>,
}

impl Default for RateDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RateDeriver {
    pub fn new() -> Self {
        Self { baseline: None }
    }

    /// First call after construction always returns an empty map (warmup).
    pub fn derive(&mut self, snapshot: &HashMap<String, u64>, now: Instant) -> HashMap<String, f64> {
        let mut rates = HashMap::new();

        if let Some((prev, prev_ts)) = &self.baseline {
            let elapsed = now.saturating_duration_since(*prev_ts).as_secs_f64().max(EPSILON);
            for key in TRACKED_KEYS {
                let (Some(&current), Some(&previous)) = (snapshot.get(key), prev.get(key)) else {
                    continue;
                };
                let delta = current as f64 - previous as f64;
                rates.insert(format!("{key}_per_sec"), delta / elapsed);
            }
        }

        let mut next_baseline = HashMap::new();
        for key in TRACKED_KEYS {
            if let Some(&v) = snapshot.get(key) {
                next_baseline.insert(key, v);
            }
        }
        self.baseline = Some((next_baseline, now));

        rates
    }
}

/// CPU utilization = 1 - delta(idle_all) / delta(total), clamped to [0,1].
/// Discards the reading when delta(total) <= 0.
pub struct CpuUtilCalculator {
    baseline: Option<CpuTimeSnapshot>,
}

impl Default for CpuUtilCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuUtilCalculator {
    pub fn new() -> Self {
        Self { baseline: None }
    }

    pub fn derive(&mut self, current: CpuTimeSnapshot) -> Option<f64> {
        let prev = self.baseline.replace(current);
        let prev = prev?;

        let delta_total = current.total as i64 - prev.total as i64;
        if delta_total <= 0 {
            return None;
        }
        let delta_idle = current.idle_all as i64 - prev.idle_all as i64;
        let util = 1.0 - (delta_idle as f64 / delta_total as f64);
        Some(util.clamp(0.0, 1.0))
    }
}
