//! Whitelist filter: exact-name, trusted-keyword, user-keyword, and
//! option-predicate matching against a known process. Option predicates
//! are live contributors to the match decision, not advisory-only.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SentinelError};
use crate::proc::enumerate::ProcessInfo;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhitelistOptions {
    #[serde(default)]
    pub skip_system_processes: bool,
    #[serde(default)]
    pub skip_low_cpu_processes: bool,
    #[serde(default)]
    pub cpu_threshold: f64,
    #[serde(default)]
    pub skip_short_lived_processes: bool,
    #[serde(default)]
    pub min_uptime_seconds: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhitelistFile {
    #[serde(default)]
    pub exact_matches: Vec<String>,
    #[serde(default)]
    pub trusted_processes: Vec<String>,
    #[serde(default)]
    pub user_whitelist: Vec<String>,
    #[serde(default)]
    pub options: WhitelistOptions,
}

pub struct WhitelistFilter {
    exact: HashSet<String>,
    trusted_keywords: Vec<String>,
    user_keywords: Vec<String>,
    options: WhitelistOptions,
}

impl WhitelistFilter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SentinelError::Config(format!("reading {}: {e}", path.display())))?;
        let file: WhitelistFile = serde_yaml::from_str(&raw)
            .map_err(|e| SentinelError::Config(format!("parsing {}: {e}", path.display())))?;
        Ok(Self::new(file))
    }

    pub fn new(file: WhitelistFile) -> Self {
        Self {
            exact: file.exact_matches.into_iter().collect(),
            trusted_keywords: file
                .trusted_processes
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            user_keywords: file
                .user_whitelist
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            options: file.options,
        }
    }

    /// Returns true iff `proc` should be exempt from behavioral scoring.
    /// Any transient failure reading process attributes is already folded
    /// into `ProcessInfo` as `None`/empty by the caller, so this function
    /// never fails -- a missing attribute simply can't satisfy a predicate.
    pub fn is_whitelisted(&self, proc: &ProcessInfo) -> bool {
        if self.exact.contains(&proc.name) {
            return true;
        }

        let haystack = format!(
            "{} {}",
            proc.name.to_lowercase(),
            proc.cmdline.join(" ").to_lowercase()
        );

        if self
            .trusted_keywords
            .iter()
            .any(|kw| haystack.contains(kw.as_str()))
        {
            return true;
        }

        if self
            .user_keywords
            .iter()
            .any(|kw| haystack.contains(kw.as_str()))
        {
            return true;
        }

        self.matches_option_predicate(proc)
    }

    fn matches_option_predicate(&self, proc: &ProcessInfo) -> bool {
        if self.options.skip_system_processes
            && matches!(proc.user.as_deref(), Some("root") | Some("system"))
        {
            return true;
        }

        if self.options.skip_low_cpu_processes {
            if let Some(cpu) = proc.cpu_percent {
                if cpu < self.options.cpu_threshold {
                    return true;
                }
            }
        }

        if self.options.skip_short_lived_processes {
            if let Some(uptime) = proc.uptime_seconds {
                if uptime < self.options.min_uptime_seconds {
                    return true;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(name: &str, cmdline: &[&str]) -> ProcessInfo {
        ProcessInfo {
            pid: 1,
            name: name.to_string(),
            cmdline: cmdline.iter().map(|s| s.to_string()).collect(),
            user: Some("alice".to_string()),
            cpu_percent: Some(50.0),
            rss_bytes: Some(0),
            uptime_seconds: Some(10_000.0),
        }
    }

    fn filter(file: WhitelistFile) -> WhitelistFilter {
        WhitelistFilter::new(file)
    }

    #[test]
    fn exact_match_is_whitelisted() {
        let f = filter(WhitelistFile {
            exact_matches: vec!["sshd".into()],
            ..Default::default()
        });
        assert!(f.is_whitelisted(&proc("sshd", &[])));
        assert!(!f.is_whitelisted(&proc("xmrig", &[])));
    }

    #[test]
    fn trusted_keyword_matches_cmdline_case_insensitively() {
        let f = filter(WhitelistFile {
            trusted_processes: vec!["Postgres".into()],
            ..Default::default()
        });
        assert!(f.is_whitelisted(&proc("worker", &["/usr/bin/postgres", "-D", "/data"])));
    }

    #[test]
    fn skip_system_processes_option_matches_root_user() {
        let mut p = proc("cron", &[]);
        p.user = Some("root".to_string());
        let f = filter(WhitelistFile {
            options: WhitelistOptions {
                skip_system_processes: true,
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(f.is_whitelisted(&p));
    }

    #[test]
    fn skip_short_lived_processes_honors_threshold() {
        let mut p = proc("build", &[]);
        p.uptime_seconds = Some(2.0);
        let f = filter(WhitelistFile {
            options: WhitelistOptions {
                skip_short_lived_processes: true,
                min_uptime_seconds: 5.0,
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(f.is_whitelisted(&p));
    }

    #[test]
    fn no_match_is_not_whitelisted() {
        let f = filter(WhitelistFile::default());
        assert!(!f.is_whitelisted(&proc("xmrig", &["--pool=1.2.3.4:3333"])));
    }
}
