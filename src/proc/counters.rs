//! Plain whitespace-split parsing over `/proc/meminfo`, `/proc/vmstat`,
//! `/proc/stat`, and `/proc/pressure/{memory,cpu}`. Any file-level read
//! error yields an empty map; callers never advance a baseline on an
//! empty read.

use std::collections::HashMap;
use std::fs;

/// The aggregate CPU-time line: `(total, idle_all)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimeSnapshot {
    pub total: u64,
    pub idle_all: u64,
}

/// `avg10` for the `some` and `full` lines of a PSI file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PressureSnapshot {
    pub some_avg10: f64,
    pub full_avg10: f64,
}

/// Parses a "name value [unit]" file such as `/proc/meminfo` or
/// `/proc/vmstat`. Lines that don't match the shape are skipped silently.
/// Read failure returns an empty map -- it is not distinguished from "file
/// parsed to nothing" because callers treat both as "no update".
pub fn read_key_value_file(path: &str) -> HashMap<String, u64> {
    let mut map = HashMap::new();
    let Ok(contents) = fs::read_to_string(path) else {
        return map;
    };
    for line in contents.lines() {
        let mut parts = line.split_whitespace();
        let Some(raw_key) = parts.next() else { continue };
        let Some(raw_val) = parts.next() else { continue };
        let key = raw_key.trim_end_matches(':');
        let digits = raw_val.strip_prefix('-').unwrap_or(raw_val);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(value) = raw_val.parse::<i64>() else { continue };
        map.insert(key.to_string(), value.unsigned_abs());
    }
    map
}

/// Parses the first line of `/proc/stat`. Fewer than eight numeric fields
/// are zero-padded; more are ignored beyond the eighth.
pub fn read_cpu_time(path: &str) -> Option<CpuTimeSnapshot> {
    let contents = fs::read_to_string(path).ok()?;
    let first_line = contents.lines().next()?;
    let mut parts = first_line.split_whitespace();
    if parts.next()? != "cpu" {
        return None;
    }
    let mut fields = [0u64; 8];
    for field in fields.iter_mut() {
        *field = parts.next().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
    }
    let [user, nice, system, idle, iowait, irq, softirq, steal] = fields;
    let idle_all = idle + iowait;
    let total = idle_all + user + nice + system + irq + softirq + steal;
    Some(CpuTimeSnapshot { total, idle_all })
}

/// Parses a PSI file (`/proc/pressure/memory` or `/proc/pressure/cpu`).
/// Missing `avg10=` fields default to 0.0; malformed numerics are
/// discarded without failing the whole read.
pub fn read_pressure_file(path: &str) -> PressureSnapshot {
    let mut snap = PressureSnapshot::default();
    let Ok(contents) = fs::read_to_string(path) else {
        return snap;
    };
    for line in contents.lines() {
        let mut tokens = line.split_whitespace();
        let Some(kind) = tokens.next() else { continue };
        let avg10 = tokens
            .find_map(|tok| tok.strip_prefix("avg10="))
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);
        match kind {
            "some" => snap.some_avg10 = avg10,
            "full" => snap.full_avg10 = avg10,
            _ => {}
        }
    }
    snap
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("sentinel-test-{name}-{:p}", contents));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn parses_meminfo_style_file() {
        let path = write_tmp("meminfo", "MemTotal:       16384 kB\nMemAvailable:    8192 kB\nBogus line\n");
        let map = read_key_value_file(&path);
        assert_eq!(map.get("MemTotal"), Some(&16384));
        assert_eq!(map.get("MemAvailable"), Some(&8192));
        fs::remove_file(path).ok();
    }

    #[test]
    fn unreadable_file_yields_empty_map() {
        let map = read_key_value_file("/nonexistent/path/for/test");
        assert!(map.is_empty());
    }

    #[test]
    fn parses_cpu_time_line_and_pads_missing_fields() {
        let path = write_tmp("stat", "cpu  100 10 50 800 5 0 0\nintr 12345\n");
        let snap = read_cpu_time(&path).unwrap();
        assert_eq!(snap.idle_all, 805);
        assert_eq!(snap.total, 805 + 100 + 10 + 50 + 0 + 0 + 0);
        fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_non_cpu_first_token() {
        let path = write_tmp("badstat", "intr 12345\n");
        assert!(read_cpu_time(&path).is_none());
        fs::remove_file(path).ok();
    }

    #[test]
    fn parses_pressure_avg10_fields() {
        let path = write_tmp(
            "pressure",
            "some avg10=1.50 avg60=0.80 avg300=0.10 total=123\nfull avg10=0.25 avg60=0.10 avg300=0.00 total=45\n",
        );
        let snap = read_pressure_file(&path);
        assert_eq!(snap.some_avg10, 1.50);
        assert_eq!(snap.full_avg10, 0.25);
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_pressure_file_defaults_to_zero() {
        let snap = read_pressure_file("/nonexistent/pressure/file");
        assert_eq!(snap, PressureSnapshot::default());
    }
}
