//! Scans a process's readable memory regions for mining-pool strings.
//! Both the pattern extractor and the literal searcher walk
//! `/proc/<pid>/maps` and `/proc/<pid>/mem` the same way and share a
//! single per-region read cap.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::time::SystemTime;

use once_cell::sync::Lazy;
use regex::RegexSet;

const REGION_READ_CAP: usize = 512 * 1024;

pub const PATTERN_SOURCES: &[&str] = &[
    r"(?i)[0-9a-f]{64}",
    r"(?i)[0-9a-f]{60,68}",
    r"(?i)stratum\+tcp://\S+",
    r"(?i)mining\.(notify|submit|authorize)",
    r"(?i)previousblockhash",
    r"(?i)merkleroot|merkle_root",
    r"(?i)[0-9a-f]{16,}",
    r"(?i)0000000[0-9a-f]+",
];

static MINING_PATTERNS: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(PATTERN_SOURCES).expect("mining pattern set compiles"));

#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    pub readable: bool,
    pub pathname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemoryScanRecord {
    pub pid: u32,
    pub wall_clock_time: SystemTime,
    pub region_range: String,
    pub matched: String,
}

/// Parses `/proc/<pid>/maps`. Unreadable or vanished processes yield an
/// empty region list.
pub fn read_memory_regions(pid: u32) -> Vec<MemoryRegion> {
    let Ok(contents) = std::fs::read_to_string(format!("/proc/{pid}/maps")) else {
        return Vec::new();
    };
    contents.lines().filter_map(parse_maps_line).collect()
}

fn parse_maps_line(line: &str) -> Option<MemoryRegion> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;
    let (start_hex, end_hex) = range.split_once('-')?;
    let start = u64::from_str_radix(start_hex, 16).ok()?;
    let end = u64::from_str_radix(end_hex, 16).ok()?;
    let pathname = fields.nth(3).map(|s| s.to_string());
    Some(MemoryRegion {
        start,
        end,
        readable: perms.starts_with('r'),
        pathname,
    })
}

fn read_region(mem: &mut File, region: &MemoryRegion) -> Option<Vec<u8>> {
    mem.seek(SeekFrom::Start(region.start)).ok()?;
    let want = ((region.end - region.start) as usize).min(REGION_READ_CAP);
    let mut buf = vec![0u8; want];
    let read = mem.read(&mut buf).ok()?;
    buf.truncate(read);
    Some(buf)
}

/// Walks every readable region of `pid`, decodes it UTF-8-lossy, and
/// applies the mining pattern set. Per-region failures (permission
/// denied, region gone) never abort the rest of the pass. `at` is
/// stamped onto every record produced by this call, so a caller
/// snapshotting in a loop can tell which poll a match came from.
pub fn extract_mining_strings(pid: u32, at: SystemTime) -> Vec<MemoryScanRecord> {
    let regions = read_memory_regions(pid);
    let Ok(mut mem) = File::open(format!("/proc/{pid}/mem")) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for region in regions.iter().filter(|r| r.readable) {
        let Some(bytes) = read_region(&mut mem, region) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        let range_label = format!("{:x}-{:x}", region.start, region.end);
        for idx in MINING_PATTERNS.matches(&text).into_iter() {
            let pattern = regex::Regex::new(PATTERN_SOURCES[idx]).unwrap();
            for m in pattern.find_iter(&text) {
                out.push(MemoryScanRecord {
                    pid,
                    wall_clock_time: at,
                    region_range: range_label.clone(),
                    matched: m.as_str().to_string(),
                });
            }
        }
    }
    out
}

/// The separate literal-substring search used by L3: returns the first
/// `(region_range, offset)` where `needle` appears, walking regions
/// identically to `extract_mining_strings`.
pub fn search_literal(pid: u32, needle: &str) -> Option<(String, usize)> {
    let regions = read_memory_regions(pid);
    let mut mem = File::open(format!("/proc/{pid}/mem")).ok()?;

    for region in regions.iter().filter(|r| r.readable) {
        let Some(bytes) = read_region(&mut mem, region) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        if let Some(offset) = text.find(needle) {
            return Some((format!("{:x}-{:x}", region.start, region.end), offset));
        }
    }
    None
}
