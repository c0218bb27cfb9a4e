//! End-to-end scenarios from the host-status and per-process scoring
//! pipelines, exercised without touching the live `/proc` filesystem or
//! the escalation state machine's async loop (which needs a real process
//! tree and network access).

use std::collections::HashMap;

use cryptowatch_sentinel::config::{DecisionConfig, MetricsRuleSet};
use cryptowatch_sentinel::metrics::analyzer::{HostStatus, PressureAnalyzer};
use cryptowatch_sentinel::proc::enumerate::{NetworkConnection, ProcessInfo};
use cryptowatch_sentinel::scoring::process_scorer::{ProcessScorer, ProcessVerdict};

fn analyzer() -> PressureAnalyzer {
    PressureAnalyzer::new(MetricsRuleSet::default(), DecisionConfig::default())
}

#[test]
fn calm_host_produces_no_escalation() {
    let mut metrics = HashMap::new();
    metrics.insert("memory_usage".to_string(), 0.30);
    metrics.insert("cache_hit_ratio".to_string(), 0.99);

    let output = analyzer().analyze(&metrics);
    assert_eq!(output.total, 0);
    assert_eq!(output.triggered_categories, 0);
    assert_eq!(output.status, HostStatus::Normal);
}

#[test]
fn combined_memory_and_cache_pressure_crosses_the_escalation_threshold() {
    let mut metrics = HashMap::new();
    metrics.insert("memory_usage".to_string(), 0.96);
    metrics.insert("cache_hit_ratio".to_string(), 0.70);

    let output = analyzer().analyze(&metrics);
    let decision = DecisionConfig::default();
    assert!(output.total > decision.warning_threshold);
}

#[test]
fn synthetic_miner_process_is_flagged_suspicious_within_ten_samples() {
    let mut scorer = ProcessScorer::new();
    let info = ProcessInfo {
        pid: 9001,
        name: "xmrig-test".to_string(),
        cmdline: vec!["xmrig-test".to_string(), "--pool=stratum+tcp://pool:3333".to_string()],
        user: Some("root".to_string()),
        cpu_percent: Some(80.0),
        rss_bytes: Some(0),
        uptime_seconds: Some(3700.0),
    };
    let connections = [NetworkConnection { remote_port: 3333 }];

    let mut last = scorer.score(&info, &connections);
    for _ in 0..9 {
        last = scorer.score(&info, &connections);
    }

    assert_eq!(last.status, ProcessVerdict::Suspicious);
    assert!(last.total_score >= 0.5);
    assert!(!last.evidence.is_empty());
}

#[test]
fn whitelisted_process_never_reaches_the_scorer() {
    use cryptowatch_sentinel::whitelist::{WhitelistFile, WhitelistFilter};

    let filter = WhitelistFilter::new(WhitelistFile {
        trusted_processes: vec!["sshd".to_string()],
        ..Default::default()
    });
    let info = ProcessInfo {
        pid: 1,
        name: "sshd".to_string(),
        cmdline: vec!["/usr/sbin/sshd".to_string()],
        user: Some("root".to_string()),
        cpu_percent: Some(90.0),
        rss_bytes: Some(0),
        uptime_seconds: Some(100_000.0),
    };
    assert!(filter.is_whitelisted(&info));
}
