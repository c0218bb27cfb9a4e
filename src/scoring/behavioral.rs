//! Behavioral scorer: one of the four dimensions fused into a process
//! verdict. Looks at process name, command line, and environment for
//! mining-adjacent signals.

use once_cell::sync::Lazy;
use regex::RegexSet;

use super::DimensionScore;

const CONFIDENCE_FACTOR: f64 = 0.85;

const MINING_KEYWORDS: &[&str] = &[
    "miner", "xmrig", "ccminer", "ethminer", "cpuminer", "stratum", "pool", "mine", "rig",
    "crypto", "coin",
];

const SUSPICIOUS_PATTERN_SOURCES: &[&str] = &[
    r"(?i)--pool=",
    r"(?i)--url=",
    r"(?i)--user=",
    r"(?i)--pass=",
    r"(?i)stratum\+tcp://",
    r"(?i)stratum\+ssl://",
];

static SUSPICIOUS_PATTERNS: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(SUSPICIOUS_PATTERN_SOURCES).expect("suspicious pattern set compiles"));

pub struct BehavioralInput<'a> {
    pub name: &'a str,
    pub cmdline: &'a [String],
    pub user: Option<&'a str>,
    pub has_gui: Option<bool>,
}

pub fn score(input: BehavioralInput) -> DimensionScore {
    let mut score = 0.0;
    let mut evidence = Vec::new();

    let name_lower = input.name.to_lowercase();
    let matched_name: Vec<&str> = MINING_KEYWORDS
        .iter()
        .filter(|kw| name_lower.contains(*kw))
        .copied()
        .collect();
    if !matched_name.is_empty() {
        score += 0.5;
        evidence.push(format!("process name matches keyword(s): {}", matched_name.join(", ")));
    }

    let cmdline_lower = input.cmdline.join(" ").to_lowercase();
    let matched_cmd: Vec<&str> = MINING_KEYWORDS
        .iter()
        .filter(|kw| cmdline_lower.contains(*kw))
        .copied()
        .collect();
    if !matched_cmd.is_empty() {
        score += 0.4;
        evidence.push(format!("command line matches keyword(s): {}", matched_cmd.join(", ")));
    }

    let pattern_hits: Vec<&str> = SUSPICIOUS_PATTERNS
        .matches(&cmdline_lower)
        .into_iter()
        .map(|idx| SUSPICIOUS_PATTERN_SOURCES[idx])
        .collect();
    if !pattern_hits.is_empty() {
        score += 0.3;
        evidence.push(format!("command line matches suspicious pattern(s): {}", pattern_hits.join(", ")));
    }

    if matches!(input.user, Some("root") | Some("system")) {
        score += 0.2;
        evidence.push("running as root or system user".to_string());
    }

    if input.has_gui == Some(false) {
        score += 0.1;
        evidence.push("no GUI session detected".to_string());
    }

    DimensionScore::capped(score, CONFIDENCE_FACTOR, evidence)
}

/// Reads `/proc/<pid>/environ` to look for a `DISPLAY` variable as a proxy
/// for GUI attachment; unreadable environ (common for other users' PIDs)
/// yields `None`, which `score` treats as "no signal" rather than a match.
pub fn detect_no_gui(pid: u32) -> Option<bool> {
    let raw = std::fs::read(format!("/proc/{pid}/environ")).ok()?;
    let has_display = raw
        .split(|&b| b == 0)
        .any(|chunk| chunk.starts_with(b"DISPLAY="));
    Some(!has_display)
}
