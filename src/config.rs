//! Typed configuration, loaded from YAML: plain `serde`-derived structs
//! with a hand-written `validate`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SentinelError};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdRule {
    pub enabled: bool,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub warning_score: i64,
    pub critical_score: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PressureRule {
    pub enabled: bool,
    pub some_threshold: f64,
    pub some_weight: i64,
    pub full_threshold: f64,
    pub full_weight: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CpuPressureRule {
    pub enabled: bool,
    pub some_threshold: f64,
    pub some_weight: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsRuleSet {
    pub memory_usage: ThresholdRule,
    pub cache_performance: ThresholdRule,
    pub page_faults: ThresholdRule,
    pub memory_pressure: PressureRule,
    pub swap_activity: ThresholdRule,
    pub cpu_pressure: CpuPressureRule,
    pub cpu_utilization: ThresholdRule,
}

impl Default for MetricsRuleSet {
    fn default() -> Self {
        Self {
            memory_usage: ThresholdRule {
                enabled: true,
                warning_threshold: 0.85,
                critical_threshold: 0.95,
                warning_score: 15,
                critical_score: 25,
            },
            cache_performance: ThresholdRule {
                enabled: true,
                warning_threshold: 0.90,
                critical_threshold: 0.80,
                warning_score: 15,
                critical_score: 30,
            },
            page_faults: ThresholdRule {
                enabled: true,
                warning_threshold: 500.0,
                critical_threshold: 1000.0,
                warning_score: 10,
                critical_score: 20,
            },
            memory_pressure: PressureRule {
                enabled: true,
                some_threshold: 10.0,
                some_weight: 10,
                full_threshold: 5.0,
                full_weight: 15,
            },
            swap_activity: ThresholdRule {
                enabled: true,
                warning_threshold: 100.0,
                critical_threshold: 500.0,
                warning_score: 10,
                critical_score: 20,
            },
            cpu_pressure: CpuPressureRule {
                enabled: true,
                some_threshold: 20.0,
                some_weight: 15,
            },
            cpu_utilization: ThresholdRule {
                enabled: true,
                warning_threshold: 0.80,
                critical_threshold: 0.95,
                warning_score: 10,
                critical_score: 20,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecisionConfig {
    pub warning_threshold: i64,
    pub critical_threshold: i64,
    pub min_categories_for_critical: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 40,
            critical_threshold: 60,
            min_categories_for_critical: 2,
        }
    }
}

/// The L3 poll budget and worker pool size are exposed here instead of
/// hard-coded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EscalationConfig {
    pub l3_max_polls: u32,
    pub l3_poll_interval_seconds: u64,
    pub l2_worker_pool_size: Option<usize>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            l3_max_polls: 15,
            l3_poll_interval_seconds: 60,
            l2_worker_pool_size: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockchainConfig {
    pub header_endpoint: String,
    pub request_timeout_seconds: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            header_endpoint: "https://mempool.space/api/blocks/tip/header".to_string(),
            request_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub sampling_interval_seconds: u64,
    pub time_window_seconds: u64,
    pub decision: DecisionConfig,
    #[serde(default)]
    pub metrics: MetricsRuleSet,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub blockchain: BlockchainConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_interval_seconds: 5,
            time_window_seconds: 60,
            decision: DecisionConfig::default(),
            metrics: MetricsRuleSet::default(),
            escalation: EscalationConfig::default(),
            blockchain: BlockchainConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SentinelError::Config(format!("reading {}: {e}", path.display())))?;
        let cfg: Config = serde_yaml::from_str(&raw)
            .map_err(|e| SentinelError::Config(format!("parsing {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling_interval_seconds < 1 {
            return Err(SentinelError::Config(
                "sampling_interval_seconds must be >= 1".into(),
            ));
        }
        if self.time_window_seconds < 1 {
            return Err(SentinelError::Config(
                "time_window_seconds must be >= 1".into(),
            ));
        }
        if self.decision.min_categories_for_critical == 0 {
            return Err(SentinelError::Config(
                "decision.min_categories_for_critical must be >= 1".into(),
            ));
        }
        if self.escalation.l3_max_polls == 0 {
            return Err(SentinelError::Config("escalation.l3_max_polls must be >= 1".into()));
        }
        Ok(())
    }
}
