//! Enumerates running processes straight off `/proc/<pid>/{stat,status,cmdline}`
//! and resolves each one's remote TCP/UDP endpoints by cross-referencing
//! `/proc/<pid>/fd` socket inodes against `/proc/net/{tcp,tcp6,udp,udp6}`.

use std::collections::HashMap;
use std::fs;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cmdline: Vec<String>,
    pub user: Option<String>,
    pub cpu_percent: Option<f64>,
    pub rss_bytes: Option<u64>,
    pub uptime_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkConnection {
    pub remote_port: u16,
}

struct JiffiesSample {
    total_jiffies: u64,
    observed_at: Instant,
}

pub struct ProcessEnumerator {
    clock_ticks_per_sec: f64,
    baselines: HashMap<u32, JiffiesSample>,
}

impl Default for ProcessEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessEnumerator {
    pub fn new() -> Self {
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        Self {
            clock_ticks_per_sec: if ticks > 0 { ticks as f64 } else { 100.0 },
            baselines: HashMap::new(),
        }
    }

    /// Snapshot all live PIDs. Processes that vanish mid-enumeration are
    /// silently skipped.
    pub fn enumerate(&mut self) -> Vec<ProcessInfo> {
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir("/proc") else {
            return out;
        };
        let now = Instant::now();
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            if let Some(info) = self.read_process(pid, now) {
                out.push(info);
            }
        }
        out
    }

    fn read_process(&mut self, pid: u32, now: Instant) -> Option<ProcessInfo> {
        let stat_raw = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        let (name, utime, stime, starttime) = parse_stat_line(&stat_raw)?;

        let cmdline_raw = fs::read(format!("/proc/{pid}/cmdline")).unwrap_or_default();
        let cmdline = split_cmdline(&cmdline_raw);

        let status_raw = fs::read_to_string(format!("/proc/{pid}/status")).unwrap_or_default();
        let (user, rss_bytes) = parse_status(&status_raw);

        let uptime_seconds = read_uptime_seconds().map(|sys_uptime| {
            let proc_start_secs = starttime as f64 / self.clock_ticks_per_sec;
            (sys_uptime - proc_start_secs).max(0.0)
        });

        let total_jiffies = utime + stime;
        let cpu_percent = self.derive_cpu_percent(pid, total_jiffies, now);

        Some(ProcessInfo {
            pid,
            name,
            cmdline,
            user,
            cpu_percent,
            rss_bytes,
            uptime_seconds,
        })
    }

    fn derive_cpu_percent(&mut self, pid: u32, total_jiffies: u64, now: Instant) -> Option<f64> {
        let prev = self.baselines.insert(
            pid,
            JiffiesSample {
                total_jiffies,
                observed_at: now,
            },
        )?;
        let elapsed = now.saturating_duration_since(prev.observed_at).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let delta_ticks = total_jiffies.saturating_sub(prev.total_jiffies) as f64;
        Some(((delta_ticks / self.clock_ticks_per_sec) / elapsed * 100.0).max(0.0))
    }

    /// The PID's own remote TCP/UDP endpoints, resolved via its open
    /// socket file descriptors against the system-wide `/proc/net/*`
    /// tables. Any failure yields an empty list (transient I/O).
    pub fn connections_for(&self, pid: u32) -> Vec<NetworkConnection> {
        let inodes = socket_inodes_for_pid(pid);
        if inodes.is_empty() {
            return Vec::new();
        }

        let mut conns = Vec::new();
        for table in ["tcp", "tcp6", "udp", "udp6"] {
            let Ok(contents) = fs::read_to_string(format!("/proc/net/{table}")) else {
                continue;
            };
            for line in contents.lines().skip(1) {
                let mut fields = line.split_whitespace();
                let Some(_local) = fields.next() else { continue };
                let Some(remote) = fields.next() else { continue };
                // st, tx_queue:rx_queue, tr:tm->when, retrnsmt, uid, timeout, inode
                let mut rest = fields.skip(5);
                let Some(inode_str) = rest.next() else { continue };
                let Ok(inode) = inode_str.parse::<u64>() else { continue };
                if !inodes.contains(&inode) {
                    continue;
                }
                if let Some(port) = parse_hex_port(remote) {
                    conns.push(NetworkConnection { remote_port: port });
                }
            }
        }
        conns
    }
}

fn socket_inodes_for_pid(pid: u32) -> Vec<u64> {
    let Ok(entries) = fs::read_dir(format!("/proc/{pid}/fd")) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|e| fs::read_link(e.path()).ok())
        .filter_map(|link| {
            let s = link.to_str()?;
            let inner = s.strip_prefix("socket:[")?.strip_suffix(']')?;
            inner.parse::<u64>().ok()
        })
        .collect()
}

fn parse_hex_port(addr_colon_port: &str) -> Option<u16> {
    let port_hex = addr_colon_port.rsplit(':').next()?;
    u16::from_str_radix(port_hex, 16).ok()
}

/// `/proc/<pid>/stat` has the form `pid (comm) state ...`; `comm` may
/// itself contain spaces or parentheses, so split on the last `)`.
fn parse_stat_line(raw: &str) -> Option<(String, u64, u64, u64)> {
    let open = raw.find('(')?;
    let close = raw.rfind(')')?;
    let name = raw.get(open + 1..close)?.to_string();
    let rest: Vec<&str> = raw.get(close + 2..)?.split_whitespace().collect();
    // fields after state: ppid(0) ... utime(11) stime(12) ... starttime(19)
    // indices here are relative to `rest`, where rest[0] is `state`.
    let utime = rest.get(11)?.parse::<u64>().ok()?;
    let stime = rest.get(12)?.parse::<u64>().ok()?;
    let starttime = rest.get(19)?.parse::<u64>().ok()?;
    Some((name, utime, stime, starttime))
}

fn split_cmdline(raw: &[u8]) -> Vec<String> {
    raw.split(|&b| b == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

fn parse_status(raw: &str) -> (Option<String>, Option<u64>) {
    let mut uid = None;
    let mut rss_kb = None;
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("Uid:") {
            uid = rest.split_whitespace().next().and_then(|s| s.parse::<u32>().ok());
        } else if let Some(rest) = line.strip_prefix("VmRSS:") {
            rss_kb = rest
                .trim()
                .trim_end_matches("kB")
                .trim()
                .parse::<u64>()
                .ok();
        }
    }
    let user = uid.map(|u| if u == 0 { "root".to_string() } else { u.to_string() });
    (user, rss_kb.map(|kb| kb * 1024))
}

fn read_uptime_seconds() -> Option<f64> {
    let raw = fs::read_to_string("/proc/uptime").ok()?;
    raw.split_whitespace().next()?.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stat_line_with_parens_in_comm() {
        let line = "123 (my (weird) proc) S 1 123 123 0 -1 4194304 100 0 0 0 50 10 0 0 20 0 1 0 99999 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        let (name, utime, stime, starttime) = parse_stat_line(line).unwrap();
        assert_eq!(name, "my (weird) proc");
        assert_eq!(utime, 50);
        assert_eq!(stime, 10);
        assert_eq!(starttime, 99999);
    }

    #[test]
    fn splits_nul_separated_cmdline() {
        let raw = b"/usr/bin/xmrig\0--pool=1.2.3.4:3333\0";
        let parts = split_cmdline(raw);
        assert_eq!(parts, vec!["/usr/bin/xmrig", "--pool=1.2.3.4:3333"]);
    }

    #[test]
    fn parses_status_uid_and_rss() {
        let raw = "Name:\tfoo\nUid:\t0\t0\t0\t0\nVmRSS:\t  2048 kB\n";
        let (user, rss) = parse_status(raw);
        assert_eq!(user.as_deref(), Some("root"));
        assert_eq!(rss, Some(2048 * 1024));
    }

    #[test]
    fn parses_hex_port_from_remote_addr() {
        assert_eq!(parse_hex_port("0100007F:0D05"), Some(0x0D05));
    }
}
