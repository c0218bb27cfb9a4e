//! Three-tier escalation loop: broad host monitoring, targeted per-process
//! scanning, and memory-evidence verification against the live blockchain
//! tip. Each tier runs until it escalates, de-escalates, or a cancellation
//! signal arrives.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::blockchain::BlockHeaderSource;
use crate::config::Config;
use crate::metrics::analyzer::PressureAnalyzer;
use crate::metrics::collector::{MetricsCollector, ProcPaths};
use crate::metrics::window::TimeSlidingWindow;
use crate::proc::enumerate::ProcessEnumerator;
use crate::proc::memscan::{extract_mining_strings, search_literal, MemoryScanRecord};
use crate::scoring::pool::L2WorkerPool;
use crate::scoring::process_scorer::ProcessVerdict;
use crate::whitelist::WhitelistFilter;

const MEDIAN_METRICS: [&str; 3] = ["pgmajfault_per_sec", "pswpin_per_sec", "pswpout_per_sec"];

/// L3's view of a process's memory: candidate strings for evidence
/// logging, plus a yes/no on whether either hash form is present. Lives
/// behind a trait so `run_l3` can be driven by a fake in tests without a
/// real `/proc/<pid>/mem`.
pub trait MemoryEvidenceScanner: Send {
    fn extract_candidates(&self, pid: u32, at: SystemTime) -> Vec<MemoryScanRecord>;
    fn contains_either(&self, pid: u32, canonical: &str, reversed: &str) -> bool;
}

struct ProcMemoryScanner;

impl MemoryEvidenceScanner for ProcMemoryScanner {
    fn extract_candidates(&self, pid: u32, at: SystemTime) -> Vec<MemoryScanRecord> {
        extract_mining_strings(pid, at)
    }

    fn contains_either(&self, pid: u32, canonical: &str, reversed: &str) -> bool {
        search_literal(pid, canonical).is_some() || search_literal(pid, reversed).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    L1Monitoring,
    L2Scanning,
    L3Verifying,
}

#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub l1_scans: u64,
    pub l1_alerts: u64,
    pub l2_scans: u64,
    pub l2_suspicious: u64,
    pub l3_verifications: u64,
    pub l3_detections: u64,
    pub confirmed_miners: u64,
}

pub struct EscalationMachine {
    config: Config,
    state: EscalationState,
    collector: MetricsCollector,
    windows: HashMap<String, TimeSlidingWindow>,
    analyzer: PressureAnalyzer,
    whitelist: WhitelistFilter,
    enumerator: ProcessEnumerator,
    worker_pool: L2WorkerPool,
    header_source: Box<dyn BlockHeaderSource>,
    memory_scanner: Box<dyn MemoryEvidenceScanner>,
    suspects: HashSet<u32>,
    counters: Counters,
}

impl EscalationMachine {
    pub fn new(
        config: Config,
        whitelist: WhitelistFilter,
        header_source: Box<dyn BlockHeaderSource>,
    ) -> Self {
        let pool_size = config
            .escalation
            .l2_worker_pool_size
            .unwrap_or_else(num_cpus::get);
        Self {
            analyzer: PressureAnalyzer::new(config.metrics.clone(), config.decision.clone()),
            collector: MetricsCollector::new(ProcPaths::default()),
            windows: HashMap::new(),
            whitelist,
            enumerator: ProcessEnumerator::new(),
            worker_pool: L2WorkerPool::new(pool_size),
            header_source,
            memory_scanner: Box::new(ProcMemoryScanner),
            suspects: HashSet::new(),
            counters: Counters::default(),
            state: EscalationState::L1Monitoring,
            config,
        }
    }

    /// Swaps in a different memory-evidence scanner. Used by tests to
    /// drive L3 without a real `/proc/<pid>/mem`.
    pub fn with_memory_scanner(mut self, scanner: Box<dyn MemoryEvidenceScanner>) -> Self {
        self.memory_scanner = scanner;
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Puts suspect PIDs directly into L3 verification, bypassing L1/L2.
    /// Used by tests that only want to exercise the verification loop.
    #[cfg(test)]
    pub fn enter_l3_with_suspects(&mut self, suspects: HashSet<u32>) {
        self.suspects = suspects;
        self.state = EscalationState::L3Verifying;
    }

    /// Drives the state machine until `cancel` reports true. Each state
    /// completes its in-flight unit of work before checking cancellation.
    pub async fn run(&mut self, mut cancel: watch::Receiver<bool>) {
        loop {
            if *cancel.borrow() {
                break;
            }
            self.state = match self.state {
                EscalationState::L1Monitoring => self.run_l1(&mut cancel).await,
                EscalationState::L2Scanning => self.run_l2(),
                EscalationState::L3Verifying => self.run_l3(&mut cancel).await,
            };
        }
        info!(
            l1_scans = self.counters.l1_scans,
            l1_alerts = self.counters.l1_alerts,
            l2_scans = self.counters.l2_scans,
            l2_suspicious = self.counters.l2_suspicious,
            l3_verifications = self.counters.l3_verifications,
            l3_detections = self.counters.l3_detections,
            confirmed_miners = self.counters.confirmed_miners,
            "shutting down"
        );
    }

    async fn run_l1(&mut self, cancel: &mut watch::Receiver<bool>) -> EscalationState {
        let now = Instant::now();
        let metrics = self.collector.collect(now);

        // Windows are updated before scoring so the analyzer always sees
        // the current sample included.
        for (name, value) in &metrics {
            self.windows
                .entry(name.clone())
                .or_insert_with(|| TimeSlidingWindow::new(self.config.time_window_seconds))
                .push(*value, now);
        }

        let mut windowed = HashMap::new();
        for name in metrics.keys() {
            let window = self.windows.get_mut(name).expect("just inserted above");
            let value = if MEDIAN_METRICS.contains(&name.as_str()) {
                window.median(now)
            } else {
                window.mean(now)
            };
            windowed.insert(name.clone(), value);
        }

        let output = self.analyzer.analyze(&windowed);
        self.counters.l1_scans += 1;

        let next = if output.total > self.config.decision.warning_threshold {
            self.counters.l1_alerts += 1;
            EscalationState::L2Scanning
        } else {
            EscalationState::L1Monitoring
        };

        if next == EscalationState::L1Monitoring {
            interruptible_sleep(Duration::from_secs(self.config.sampling_interval_seconds), cancel).await;
        }

        next
    }

    fn run_l2(&mut self) -> EscalationState {
        self.counters.l2_scans += 1;
        let processes = self.enumerator.enumerate();

        let candidates: Vec<_> = processes
            .into_iter()
            .filter(|p| !self.whitelist.is_whitelisted(p))
            .map(|p| {
                let conns = self.enumerator.connections_for(p.pid);
                (p, conns)
            })
            .collect();

        let results = self.worker_pool.score_all(candidates);

        self.suspects.clear();
        for record in &results {
            if record.status == ProcessVerdict::Suspicious {
                self.suspects.insert(record.pid);
            }
        }
        self.counters.l2_suspicious += self.suspects.len() as u64;

        if self.suspects.is_empty() {
            EscalationState::L1Monitoring
        } else {
            EscalationState::L3Verifying
        }
    }

    async fn run_l3(&mut self, cancel: &mut watch::Receiver<bool>) -> EscalationState {
        let max_polls = self.config.escalation.l3_max_polls;
        let interval = Duration::from_secs(self.config.escalation.l3_poll_interval_seconds);

        for poll in 0..max_polls {
            if *cancel.borrow() {
                break;
            }
            self.counters.l3_verifications += 1;

            let header = match self.header_source.fetch().await {
                Ok(header) => header,
                Err(e) => {
                    warn!(error = %e, poll, "L3 header fetch failed, skipping poll");
                    interruptible_sleep(interval, cancel).await;
                    continue;
                }
            };
            let canonical = header.previous_block_hash.clone();
            let reversed = header.previous_block_hash_modify();

            let mut confirmed_pid = None;
            for &pid in &self.suspects.clone() {
                // Ephemeral per-poll sink; dropped at the end of this
                // iteration regardless of outcome.
                let sink = self.memory_scanner.extract_candidates(pid, SystemTime::now());
                tracing::debug!(pid, matches = sink.len(), "memory scan extracted candidate strings");

                if self.memory_scanner.contains_either(pid, &canonical, &reversed) {
                    confirmed_pid = Some(pid);
                    break;
                }
            }

            if let Some(pid) = confirmed_pid {
                self.counters.l3_detections += 1;
                self.counters.confirmed_miners += 1;
                info!(pid, "CONFIRMED cryptominer detected via block header correlation");
                self.suspects.clear();
                return EscalationState::L1Monitoring;
            }

            interruptible_sleep(interval, cancel).await;
        }

        self.suspects.clear();
        EscalationState::L1Monitoring
    }
}

/// Sleeps for `duration` unless `cancel` flips to true first, in which
/// case it returns immediately, by racing the sleep against the watch
/// channel.
async fn interruptible_sleep(duration: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel.changed() => true,
    }
}
