//! CPU scorer: one of the four dimensions fused into a process verdict.
//! Keeps a bounded per-PID history of recent CPU readings, owned by the
//! scorer itself, never a global.

use std::collections::{HashMap, VecDeque};

use super::DimensionScore;

const HISTORY_LEN: usize = 10;
const CONFIDENCE_FACTOR: f64 = 0.8;

const CPU_MINER_KEYWORDS: &[&str] = &["miner", "xmrig", "cpuminer", "ccminer", "ethminer"];

pub struct CpuScorer {
    history: HashMap<u32, VecDeque<f64>>,
}

impl Default for CpuScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuScorer {
    pub fn new() -> Self {
        Self {
            history: HashMap::new(),
        }
    }

    pub fn score(
        &mut self,
        pid: u32,
        name: &str,
        cpu_percent: Option<f64>,
        uptime_seconds: Option<f64>,
    ) -> DimensionScore {
        let deque = self.history.entry(pid).or_insert_with(VecDeque::new);
        if let Some(cpu) = cpu_percent {
            if deque.len() == HISTORY_LEN {
                deque.pop_front();
            }
            deque.push_back(cpu);
        }

        if deque.is_empty() {
            return DimensionScore::default();
        }

        let avg = deque.iter().sum::<f64>() / deque.len() as f64;
        let variance = deque.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / deque.len() as f64;
        let stddev = variance.sqrt();

        let mut score = 0.0;
        let mut evidence = Vec::new();

        if avg > 70.0 {
            score += 0.3;
            evidence.push(format!("sustained high CPU usage (avg {avg:.1}%)"));
        }
        if stddev < 5.0 && avg > 30.0 {
            score += 0.2;
            evidence.push(format!("stable elevated CPU usage (stddev {stddev:.2})"));
        }
        if let Some(uptime) = uptime_seconds {
            if uptime > 3600.0 {
                score += 0.1;
                evidence.push("process has run for over an hour".to_string());
            }
        }
        let name_lower = name.to_lowercase();
        if CPU_MINER_KEYWORDS.iter().any(|kw| name_lower.contains(kw)) {
            score += 0.4;
            evidence.push(format!("process name '{name}' matches a known miner keyword"));
        }

        DimensionScore::capped(score, CONFIDENCE_FACTOR, evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustained_high_cpu_contributes_expected_score() {
        let mut scorer = CpuScorer::new();
        let mut last = DimensionScore::default();
        for _ in 0..10 {
            last = scorer.score(1, "worker", Some(80.0), Some(4000.0));
        }
        assert!((last.score - 0.6).abs() < 1e-9);
        assert!((last.confidence - 0.48).abs() < 1e-9);
    }

    #[test]
    fn miner_keyword_in_name_adds_fixed_contribution() {
        let mut scorer = CpuScorer::new();
        let result = scorer.score(2, "xmrig", Some(10.0), None);
        assert!(result.score >= 0.4);
    }

    #[test]
    fn no_samples_yields_zero_score() {
        let mut scorer = CpuScorer::new();
        let result = scorer.score(3, "idle", None, None);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn score_never_exceeds_one() {
        let mut scorer = CpuScorer::new();
        let mut last = DimensionScore::default();
        for _ in 0..10 {
            last = scorer.score(4, "xmrig-test", Some(95.0), Some(10_000.0));
        }
        assert!(last.score <= 1.0);
    }
}
