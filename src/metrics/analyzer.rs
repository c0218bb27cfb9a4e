//! Evaluates collected metrics against a rule set and rolls the result up
//! into a host status. Categories are a closed enum with one evaluator
//! each, not a stringly-typed lookup table; the rule set itself stays a
//! plain deserializable struct.

use std::collections::HashMap;

use crate::config::{DecisionConfig, MetricsRuleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    MemoryUsage,
    CachePerformance,
    PageFaults,
    MemoryPressure,
    SwapActivity,
    CpuPressure,
    CpuUtilization,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::MemoryUsage => "memory_usage",
            Category::CachePerformance => "cache_performance",
            Category::PageFaults => "page_faults",
            Category::MemoryPressure => "memory_pressure",
            Category::SwapActivity => "swap_activity",
            Category::CpuPressure => "cpu_pressure",
            Category::CpuUtilization => "cpu_utilization",
        }
    }

    const ALL: [Category; 7] = [
        Category::MemoryUsage,
        Category::CachePerformance,
        Category::PageFaults,
        Category::MemoryPressure,
        Category::SwapActivity,
        Category::CpuPressure,
        Category::CpuUtilization,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    pub total: i64,
    pub per_category: HashMap<&'static str, i64>,
    pub triggered_categories: usize,
    pub status: HostStatus,
}

pub struct PressureAnalyzer {
    rules: MetricsRuleSet,
    decision: DecisionConfig,
}

impl PressureAnalyzer {
    pub fn new(rules: MetricsRuleSet, decision: DecisionConfig) -> Self {
        Self { rules, decision }
    }

    /// A pure function of (windowed metrics, rules): identical inputs
    /// produce identical outputs. A missing input or a disabled category
    /// is skipped without error; unrecognized metric names are ignored.
    pub fn analyze(&self, metrics: &HashMap<String, f64>) -> AnalyzerOutput {
        let mut per_category = HashMap::new();
        let mut total: i64 = 0;
        let mut triggered = 0usize;

        for category in Category::ALL {
            let score = self.evaluate(category, metrics);
            if score > 0 {
                triggered += 1;
            }
            per_category.insert(category.name(), score);
            total += score;
        }

        let status = if total >= self.decision.critical_threshold
            && triggered >= self.decision.min_categories_for_critical
        {
            HostStatus::Critical
        } else if total >= self.decision.warning_threshold {
            HostStatus::Warning
        } else {
            HostStatus::Normal
        };

        AnalyzerOutput {
            total,
            per_category,
            triggered_categories: triggered,
            status,
        }
    }

    fn evaluate(&self, category: Category, metrics: &HashMap<String, f64>) -> i64 {
        match category {
            Category::MemoryUsage => {
                Self::high_is_bad(&self.rules.memory_usage, metrics.get("memory_usage").copied())
            }
            Category::CachePerformance => Self::low_is_bad(
                &self.rules.cache_performance,
                metrics.get("cache_hit_ratio").copied(),
            ),
            Category::PageFaults => Self::high_is_bad(
                &self.rules.page_faults,
                metrics.get("pgmajfault_per_sec").copied(),
            ),
            Category::MemoryPressure => self.memory_pressure(metrics),
            Category::SwapActivity => self.swap_activity(metrics),
            Category::CpuPressure => self.cpu_pressure(metrics),
            Category::CpuUtilization => Self::high_is_bad(
                &self.rules.cpu_utilization,
                metrics.get("cpu_utilization").copied(),
            ),
        }
    }

    fn high_is_bad(rule: &crate::config::ThresholdRule, value: Option<f64>) -> i64 {
        if !rule.enabled {
            return 0;
        }
        let Some(v) = value else { return 0 };
        if v >= rule.critical_threshold {
            rule.critical_score
        } else if v >= rule.warning_threshold {
            rule.warning_score
        } else {
            0
        }
    }

    fn low_is_bad(rule: &crate::config::ThresholdRule, value: Option<f64>) -> i64 {
        if !rule.enabled {
            return 0;
        }
        let Some(v) = value else { return 0 };
        if v < rule.critical_threshold {
            rule.critical_score
        } else if v < rule.warning_threshold {
            rule.warning_score
        } else {
            0
        }
    }

    fn memory_pressure(&self, metrics: &HashMap<String, f64>) -> i64 {
        let rule = &self.rules.memory_pressure;
        if !rule.enabled {
            return 0;
        }
        let mut score = 0;
        if let Some(&some) = metrics.get("some_avg10") {
            if some >= rule.some_threshold {
                score += rule.some_weight;
            }
        }
        if let Some(&full) = metrics.get("full_avg10") {
            if full >= rule.full_threshold {
                score += rule.full_weight;
            }
        }
        score
    }

    fn swap_activity(&self, metrics: &HashMap<String, f64>) -> i64 {
        let rule = &self.rules.swap_activity;
        if !rule.enabled {
            return 0;
        }
        let (Some(&inr), Some(&outr)) = (
            metrics.get("pswpin_per_sec"),
            metrics.get("pswpout_per_sec"),
        ) else {
            return 0;
        };
        let total = inr + outr;
        if total >= rule.critical_threshold {
            rule.critical_score
        } else if total >= rule.warning_threshold {
            rule.warning_score
        } else {
            0
        }
    }

    fn cpu_pressure(&self, metrics: &HashMap<String, f64>) -> i64 {
        let rule = &self.rules.cpu_pressure;
        if !rule.enabled {
            return 0;
        }
        let Some(&some) = metrics.get("cpu_some_avg10") else { return 0 };
        if some >= rule.some_threshold {
            rule.some_weight
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecisionConfig, MetricsRuleSet};

    fn analyzer() -> PressureAnalyzer {
        PressureAnalyzer::new(MetricsRuleSet::default(), DecisionConfig::default())
    }

    #[test]
    fn calm_host_yields_normal_with_zero_total() {
        let mut metrics = HashMap::new();
        metrics.insert("memory_usage".to_string(), 0.30);
        metrics.insert("cache_hit_ratio".to_string(), 0.99);
        let out = analyzer().analyze(&metrics);
        assert_eq!(out.total, 0);
        assert_eq!(out.triggered_categories, 0);
        assert_eq!(out.status, HostStatus::Normal);
    }

    #[test]
    fn memory_usage_alone_stays_below_warning_threshold() {
        let mut metrics = HashMap::new();
        metrics.insert("memory_usage".to_string(), 0.96);
        let out = analyzer().analyze(&metrics);
        assert_eq!(out.total, 25);
        assert_eq!(out.status, HostStatus::Normal);
    }

    #[test]
    fn memory_and_cache_pressure_combine_to_cross_warning_threshold() {
        let mut metrics = HashMap::new();
        metrics.insert("memory_usage".to_string(), 0.96);
        metrics.insert("cache_hit_ratio".to_string(), 0.70);
        let out = analyzer().analyze(&metrics);
        assert_eq!(out.total, 55);
        assert_eq!(out.status, HostStatus::Warning);
    }

    #[test]
    fn critical_status_requires_both_total_and_category_count() {
        let mut metrics = HashMap::new();
        metrics.insert("memory_usage".to_string(), 0.99);
        metrics.insert("cache_hit_ratio".to_string(), 0.50);
        metrics.insert("cpu_utilization".to_string(), 0.99);
        let out = analyzer().analyze(&metrics);
        assert!(out.total >= 60);
        assert!(out.triggered_categories >= 2);
        assert_eq!(out.status, HostStatus::Critical);
    }

    #[test]
    fn memory_pressure_sums_some_and_full_independently() {
        let mut metrics = HashMap::new();
        metrics.insert("some_avg10".to_string(), 50.0);
        metrics.insert("full_avg10".to_string(), 50.0);
        let out = analyzer().analyze(&metrics);
        assert_eq!(out.per_category["memory_pressure"], 25);
    }

    #[test]
    fn unrecognized_metric_names_are_ignored() {
        let mut metrics = HashMap::new();
        metrics.insert("totally_unknown_metric".to_string(), 999.0);
        let out = analyzer().analyze(&metrics);
        assert_eq!(out.total, 0);
    }

    #[test]
    fn analyzer_is_a_pure_function_of_its_inputs() {
        let mut metrics = HashMap::new();
        metrics.insert("memory_usage".to_string(), 0.90);
        let a = analyzer().analyze(&metrics);
        let b = analyzer().analyze(&metrics);
        assert_eq!(a.total, b.total);
        assert_eq!(a.status, b.status);
    }
}
