//! Collects host metrics from `/proc`, owning its own rate-deriver and
//! cache-ratio baseline state rather than reaching into module statics.

use std::collections::HashMap;
use std::time::Instant;

use crate::proc::counters::{read_cpu_time, read_key_value_file, read_pressure_file};
use crate::proc::rates::{CpuUtilCalculator, RateDeriver};

#[derive(Debug, Clone)]
pub struct ProcPaths {
    pub meminfo: String,
    pub vmstat: String,
    pub stat: String,
    pub pressure_memory: String,
    pub pressure_cpu: String,
}

impl Default for ProcPaths {
    fn default() -> Self {
        Self {
            meminfo: "/proc/meminfo".to_string(),
            vmstat: "/proc/vmstat".to_string(),
            stat: "/proc/stat".to_string(),
            pressure_memory: "/proc/pressure/memory".to_string(),
            pressure_cpu: "/proc/pressure/cpu".to_string(),
        }
    }
}

pub struct MetricsCollector {
    paths: ProcPaths,
    rate_deriver: RateDeriver,
    cache_baseline: Option<(u64, u64)>,
    cpu_util: CpuUtilCalculator,
}

impl MetricsCollector {
    pub fn new(paths: ProcPaths) -> Self {
        let mut collector = Self {
            paths,
            rate_deriver: RateDeriver::new(),
            cache_baseline: None,
            cpu_util: CpuUtilCalculator::new(),
        };
        // Seed every baseline with one throwaway read so the first real
        // `collect()` call already has a previous sample to diff against.
        collector.collect(Instant::now());
        collector
    }

    pub fn collect(&mut self, now: Instant) -> HashMap<String, f64> {
        let mut out = HashMap::new();

        if let Some(usage) = self.memory_usage() {
            out.insert("memory_usage".to_string(), usage);
        }

        let vmstat = read_key_value_file(&self.paths.vmstat);
        if let Some(ratio) = self.cache_hit_ratio(&vmstat) {
            out.insert("cache_hit_ratio".to_string(), ratio);
        }
        for (name, value) in self.rate_deriver.derive(&vmstat, now) {
            out.insert(name, value);
        }

        let mem_pressure = read_pressure_file(&self.paths.pressure_memory);
        out.insert("some_avg10".to_string(), mem_pressure.some_avg10);
        out.insert("full_avg10".to_string(), mem_pressure.full_avg10);

        let cpu_pressure = read_pressure_file(&self.paths.pressure_cpu);
        out.insert("cpu_some_avg10".to_string(), cpu_pressure.some_avg10);

        if let Some(cpu_time) = read_cpu_time(&self.paths.stat) {
            if let Some(util) = self.cpu_util.derive(cpu_time) {
                out.insert("cpu_utilization".to_string(), util);
            }
        }

        out
    }

    fn memory_usage(&self) -> Option<f64> {
        let meminfo = read_key_value_file(&self.paths.meminfo);
        let total = *meminfo.get("MemTotal")? as f64;
        let available = *meminfo.get("MemAvailable")? as f64;
        if total <= 0.0 {
            return None;
        }
        Some(((total - available) / total).clamp(0.0, 1.0))
    }

    fn cache_hit_ratio(&mut self, vmstat: &HashMap<String, u64>) -> Option<f64> {
        let pgfault = *vmstat.get("pgfault")?;
        let pgmajfault = *vmstat.get("pgmajfault")?;

        let result = self.cache_baseline.map(|(prev_fault, prev_major)| {
            let delta_fault = pgfault.saturating_sub(prev_fault);
            let delta_major = pgmajfault.saturating_sub(prev_major);
            (1.0 - (delta_major as f64 / (delta_fault.max(1)) as f64)).clamp(0.0, 1.0)
        });

        self.cache_baseline = Some((pgfault, pgmajfault));
        result
    }
}
