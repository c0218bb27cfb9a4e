//! Fuses the four dimension scorers (cpu, network, behavioral, memory)
//! into a single weighted score, confidence, and evidence list for one
//! process.

use crate::proc::enumerate::{NetworkConnection, ProcessInfo};

use super::behavioral::{self, BehavioralInput};
use super::cpu::CpuScorer;
use super::{memory, network};

const WEIGHT_CPU: f64 = 0.35;
const WEIGHT_NETWORK: f64 = 0.30;
const WEIGHT_BEHAVIORAL: f64 = 0.25;
const WEIGHT_MEMORY: f64 = 0.10;
const SUSPICIOUS_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessVerdict {
    Normal,
    Suspicious,
}

#[derive(Debug, Clone)]
pub struct ProcessEvidenceRecord {
    pub pid: u32,
    pub name: String,
    pub cpu_score: f64,
    pub network_score: f64,
    pub behavioral_score: f64,
    pub memory_score: f64,
    pub total_score: f64,
    pub confidence: f64,
    pub status: ProcessVerdict,
    pub evidence: Vec<String>,
}

pub struct ProcessScorer {
    cpu: CpuScorer,
}

impl Default for ProcessScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessScorer {
    pub fn new() -> Self {
        Self {
            cpu: CpuScorer::new(),
        }
    }

    pub fn score(&mut self, info: &ProcessInfo, connections: &[NetworkConnection]) -> ProcessEvidenceRecord {
        let cpu_dim = self.cpu.score(info.pid, &info.name, info.cpu_percent, info.uptime_seconds);
        let network_dim = network::score(connections);
        let memory_dim = memory::score(info.rss_bytes);
        let has_gui = behavioral::detect_no_gui(info.pid).map(|no_gui| !no_gui);
        let behavioral_dim = behavioral::score(BehavioralInput {
            name: &info.name,
            cmdline: &info.cmdline,
            user: info.user.as_deref(),
            has_gui,
        });

        let total = WEIGHT_CPU * cpu_dim.score
            + WEIGHT_NETWORK * network_dim.score
            + WEIGHT_BEHAVIORAL * behavioral_dim.score
            + WEIGHT_MEMORY * memory_dim.score;
        let confidence = WEIGHT_CPU * cpu_dim.confidence
            + WEIGHT_NETWORK * network_dim.confidence
            + WEIGHT_BEHAVIORAL * behavioral_dim.confidence
            + WEIGHT_MEMORY * memory_dim.confidence;

        let mut evidence = Vec::new();
        evidence.extend(cpu_dim.evidence);
        evidence.extend(network_dim.evidence);
        evidence.extend(behavioral_dim.evidence);
        evidence.extend(memory_dim.evidence);

        let status = if total >= SUSPICIOUS_THRESHOLD {
            ProcessVerdict::Suspicious
        } else {
            ProcessVerdict::Normal
        };

        ProcessEvidenceRecord {
            pid: info.pid,
            name: info.name.clone(),
            cpu_score: cpu_dim.score,
            network_score: network_dim.score,
            behavioral_score: behavioral_dim.score,
            memory_score: memory_dim.score,
            total_score: total,
            confidence,
            status,
            evidence,
        }
    }
}
