//! A time-bounded sample window with lazy eviction: stale samples drop
//! out on the next write or read rather than on a timer.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    value: f64,
}

pub struct TimeSlidingWindow {
    span: Duration,
    samples: Vec<Sample>,
}

impl TimeSlidingWindow {
    pub fn new(span_seconds: u64) -> Self {
        Self {
            span: Duration::from_secs(span_seconds),
            samples: Vec::new(),
        }
    }

    /// Non-finite values are rejected at ingress and never enter the
    /// window.
    pub fn push(&mut self, value: f64, at: Instant) {
        if !value.is_finite() {
            return;
        }
        self.samples.push(Sample { at, value });
        self.evict(at);
    }

    fn evict(&mut self, now: Instant) {
        let span = self.span;
        self.samples.retain(|s| now.saturating_duration_since(s.at) <= span);
    }

    fn values(&mut self, now: Instant) -> Vec<f64> {
        self.evict(now);
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn count(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.samples.len()
    }

    pub fn mean(&mut self, now: Instant) -> f64 {
        let values = self.values(now);
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    pub fn median(&mut self, now: Instant) -> f64 {
        let mut values = self.values(now);
        if values.is_empty() {
            return 0.0;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = values.len();
        if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        }
    }

    /// Symmetric truncation fractions in `[0, 0.49]`. If truncation would
    /// empty the remainder, falls back to the arithmetic mean.
    pub fn trimmed_mean(&mut self, now: Instant, lower: f64, upper: f64) -> f64 {
        let mut values = self.values(now);
        if values.is_empty() {
            return 0.0;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = values.len();
        let drop_low = ((n as f64) * lower).floor() as usize;
        let drop_high = ((n as f64) * upper).floor() as usize;
        if drop_low + drop_high >= n {
            return values.iter().sum::<f64>() / n as f64;
        }
        let remainder = &values[drop_low..n - drop_high];
        remainder.iter().sum::<f64>() / remainder.len() as f64
    }

    /// Linear interpolation between the two nearest ranks at
    /// `(n - 1) * q / 100`.
    pub fn percentile(&mut self, now: Instant, q: f64) -> f64 {
        let mut values = self.values(now);
        if values.is_empty() {
            return 0.0;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = values.len();
        if n == 1 {
            return values[0];
        }
        let rank = (n - 1) as f64 * q / 100.0;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        if lo == hi {
            return values[lo];
        }
        let frac = rank - lo as f64;
        values[lo] + (values[hi] - values[lo]) * frac
    }

    pub fn min(&mut self, now: Instant) -> f64 {
        self.values(now).into_iter().fold(f64::INFINITY, f64::min).max(f64::NEG_INFINITY)
    }

    pub fn max(&mut self, now: Instant) -> f64 {
        self.values(now).into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn last(&mut self, now: Instant) -> f64 {
        self.evict(now);
        self.samples.last().map(|s| s.value).unwrap_or(0.0)
    }

    pub fn span_seconds(&mut self, now: Instant) -> f64 {
        self.evict(now);
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.at.saturating_duration_since(first.at).as_secs_f64(),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn evicts_samples_older_than_span() {
        let mut w = TimeSlidingWindow::new(10);
        let t0 = Instant::now();
        w.push(1.0, t0);
        let t1 = t0 + Duration::from_secs(20);
        assert_eq!(w.count(t1), 0);
    }

    #[test]
    fn non_finite_values_never_enter_window() {
        let mut w = TimeSlidingWindow::new(10);
        let t0 = Instant::now();
        w.push(f64::NAN, t0);
        w.push(f64::INFINITY, t0);
        assert_eq!(w.count(t0), 0);
    }

    #[test]
    fn mean_and_median_of_basic_series() {
        let mut w = TimeSlidingWindow::new(60);
        let t0 = Instant::now();
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v, t0);
        }
        assert_eq!(w.mean(t0), 2.5);
        assert_eq!(w.median(t0), 2.5);
    }

    #[test]
    fn trimmed_mean_zero_fractions_equals_mean() {
        let mut w = TimeSlidingWindow::new(60);
        let t0 = Instant::now();
        for v in [5.0, 1.0, 9.0, 3.0] {
            w.push(v, t0);
        }
        assert_eq!(w.trimmed_mean(t0, 0.0, 0.0), w.mean(t0));
    }

    #[test]
    fn trimmed_mean_degenerate_falls_back_to_mean() {
        let mut w = TimeSlidingWindow::new(60);
        let t0 = Instant::now();
        for v in [1.0, 2.0] {
            w.push(v, t0);
        }
        assert_eq!(w.trimmed_mean(t0, 0.49, 0.49), w.mean(t0));
    }

    #[test]
    fn percentile_boundaries_match_min_max_median() {
        let mut w = TimeSlidingWindow::new(60);
        let t0 = Instant::now();
        for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
            w.push(v, t0);
        }
        assert_eq!(w.percentile(t0, 0.0), w.min(t0));
        assert_eq!(w.percentile(t0, 100.0), w.max(t0));
        assert_eq!(w.percentile(t0, 50.0), w.median(t0));
    }

    #[test]
    fn inserting_same_timestamp_sample_twice_then_aging_out_yields_empty() {
        let mut w = TimeSlidingWindow::new(5);
        let t0 = Instant::now();
        w.push(1.0, t0);
        w.push(1.0, t0);
        assert_eq!(w.count(t0), 2);
        let later = t0 + Duration::from_secs(10);
        assert_eq!(w.count(later), 0);
    }
}
