//! Live utilization sampling from procfs
//!
//! Used as the fallback workload source when no forecast is available and
//! as the history the forecaster learns from:
//! - /proc/stat for CPU busy time
//! - /proc/meminfo for memory in use
//! - /proc/net/dev for network throughput

use crate::error::FleetError;
use crate::models::WorkloadSample;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Assumed network link capacity (1 Gbps) in bytes per second
pub const DEFAULT_LINK_BYTES_PER_SEC: f64 = 1000.0 * 1024.0 * 1024.0;

/// Delay between the two readings taken on the very first sample
const PRIME_INTERVAL: Duration = Duration::from_millis(100);

/// Source of live utilization samples
#[async_trait]
pub trait MetricsSampler: Send + Sync {
    async fn sample(&self) -> Result<WorkloadSample>;
}

/// Aggregate CPU jiffies from the first line of /proc/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    pub idle: u64,
}

/// Parse the aggregate `cpu` line of /proc/stat
pub fn parse_cpu_stat(content: &str) -> Result<CpuTimes> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| FleetError::malformed("/proc/stat", "missing aggregate cpu line"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse().unwrap_or(0))
        .collect();
    if fields.len() < 4 {
        return Err(FleetError::malformed("/proc/stat", "too few cpu fields").into());
    }

    // user nice system idle iowait irq softirq steal; guest time is already in user
    let overflow = || FleetError::malformed("/proc/stat", "cpu counters overflow u64");
    let total = fields
        .iter()
        .take(8)
        .try_fold(0u64, |acc, v| acc.checked_add(*v))
        .ok_or_else(overflow)?;
    let idle = fields[3]
        .checked_add(fields.get(4).copied().unwrap_or(0))
        .ok_or_else(overflow)?;
    Ok(CpuTimes { total, idle })
}

/// Busy percentage between two /proc/stat readings
pub fn cpu_percent(previous: CpuTimes, current: CpuTimes) -> f64 {
    let total = current.total.saturating_sub(previous.total);
    if total == 0 {
        return 0.0;
    }
    let idle = current.idle.saturating_sub(previous.idle).min(total);
    (total - idle) as f64 / total as f64 * 100.0
}

/// Memory in use as a percentage of MemTotal
pub fn parse_meminfo(content: &str) -> Result<f64> {
    let mut values: HashMap<&str, u64> = HashMap::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if let Ok(v) = value.parse::<u64>() {
                values.insert(key.trim_end_matches(':'), v);
            }
        }
    }

    let total = match values.get("MemTotal") {
        Some(&t) if t > 0 => t,
        _ => return Err(FleetError::malformed("/proc/meminfo", "missing MemTotal").into()),
    };
    let available = values.get("MemAvailable").copied().unwrap_or_else(|| {
        ["MemFree", "Buffers", "Cached"]
            .iter()
            .filter_map(|k| values.get(k))
            .sum()
    });

    Ok(total.saturating_sub(available) as f64 / total as f64 * 100.0)
}

/// Total received plus transmitted bytes across non-loopback interfaces
pub fn parse_net_dev(content: &str) -> u64 {
    content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(iface, _)| iface.trim() != "lo")
        .map(|(_, counters)| {
            let fields: Vec<u64> = counters
                .split_whitespace()
                .map(|v| v.parse().unwrap_or(0))
                .collect();
            // field 0 is rx bytes, field 8 is tx bytes
            fields.first().copied().unwrap_or(0) + fields.get(8).copied().unwrap_or(0)
        })
        .sum()
}

#[derive(Debug, Clone, Copy)]
struct Reading {
    cpu: CpuTimes,
    net_bytes: u64,
    at: Instant,
}

/// Samples host utilization from a procfs tree
pub struct ProcSampler {
    proc_path: PathBuf,
    link_bytes_per_sec: f64,
    previous: Mutex<Option<Reading>>,
}

impl ProcSampler {
    pub fn new() -> Self {
        Self::with_proc_path("/proc")
    }

    /// Create a sampler over a custom procfs root (for testing)
    pub fn with_proc_path(proc_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_path: proc_path.into(),
            link_bytes_per_sec: DEFAULT_LINK_BYTES_PER_SEC,
            previous: Mutex::new(None),
        }
    }

    pub fn with_link_capacity(mut self, bytes_per_sec: f64) -> Self {
        self.link_bytes_per_sec = bytes_per_sec;
        self
    }

    async fn read(&self, name: &str) -> Result<String> {
        let path = self.proc_path.join(name);
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn reading(&self) -> Result<Reading> {
        let cpu = parse_cpu_stat(&self.read("stat").await?)?;
        // hosts without network counters still report CPU and memory
        let net_bytes = match self.read("net/dev").await {
            Ok(content) => parse_net_dev(&content),
            Err(_) => 0,
        };
        Ok(Reading {
            cpu,
            net_bytes,
            at: Instant::now(),
        })
    }
}

impl Default for ProcSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSampler for ProcSampler {
    async fn sample(&self) -> Result<WorkloadSample> {
        let mut previous = self.previous.lock().await;

        let before = match *previous {
            Some(r) => r,
            None => {
                let first = self.reading().await?;
                tokio::time::sleep(PRIME_INTERVAL).await;
                first
            }
        };
        let now = self.reading().await?;
        let memory_usage = parse_meminfo(&self.read("meminfo").await?)?;

        let elapsed = now.at.duration_since(before.at).as_secs_f64();
        let network_usage = if elapsed > 0.0 && self.link_bytes_per_sec > 0.0 {
            let rate = now.net_bytes.saturating_sub(before.net_bytes) as f64 / elapsed;
            (rate / self.link_bytes_per_sec * 100.0).min(100.0)
        } else {
            0.0
        };

        *previous = Some(now);

        let sample = WorkloadSample {
            cpu_usage: cpu_percent(before.cpu, now.cpu),
            memory_usage,
            network_usage,
        };
        debug!(
            cpu = sample.cpu_usage,
            memory = sample.memory_usage,
            network = sample.network_usage,
            "Sampled host utilization"
        );
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STAT: &str = "cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 50 0 50 350 50 0 0 0 0 0\n";
    const MEMINFO: &str = "MemTotal:       16000 kB\nMemFree:         2000 kB\nMemAvailable:    4000 kB\n";
    const NET_DEV: &str = "Inter-|   Receive                            |  Transmit\n face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    lo: 5000 10 0 0 0 0 0 0 5000 10 0 0 0 0 0 0\n  eth0: 1000 10 0 0 0 0 0 0 2000 10 0 0 0 0 0 0\n";

    fn write_proc(dir: &TempDir, stat: &str) {
        std::fs::create_dir_all(dir.path().join("net")).unwrap();
        std::fs::write(dir.path().join("stat"), stat).unwrap();
        std::fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();
        std::fs::write(dir.path().join("net/dev"), NET_DEV).unwrap();
    }

    #[test]
    fn test_parse_cpu_stat() {
        let times = parse_cpu_stat(STAT).unwrap();
        assert_eq!(times.total, 1000);
        assert_eq!(times.idle, 800);
    }

    #[test]
    fn test_parse_cpu_stat_missing_line() {
        assert!(parse_cpu_stat("intr 1 2 3\n").is_err());
    }

    #[test]
    fn test_parse_cpu_stat_overflow_is_error() {
        let stat = format!("cpu  {} {} 0 10 0 0 0 0\n", u64::MAX, u64::MAX);
        let err = parse_cpu_stat(&stat).unwrap_err();
        assert!(err.to_string().contains("overflow"));

        let stat = format!("cpu  1 0 0 {} 1 0 0 0\n", u64::MAX);
        assert!(parse_cpu_stat(&stat).is_err());
    }

    #[test]
    fn test_cpu_percent() {
        let before = CpuTimes { total: 1000, idle: 800 };
        let after = CpuTimes { total: 2000, idle: 1400 };
        assert!((cpu_percent(before, after) - 40.0).abs() < 1e-9);
        assert_eq!(cpu_percent(after, after), 0.0);
    }

    #[test]
    fn test_parse_meminfo() {
        assert!((parse_meminfo(MEMINFO).unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_meminfo_without_available() {
        let content = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 100 kB\nCached: 300 kB\n";
        assert!((parse_meminfo(content).unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(parse_meminfo("MemFree: 100 kB\n").is_err());
    }

    #[test]
    fn test_parse_net_dev_skips_loopback() {
        assert_eq!(parse_net_dev(NET_DEV), 3000);
    }

    #[tokio::test]
    async fn test_sample_from_fake_proc() {
        let dir = TempDir::new().unwrap();
        write_proc(&dir, STAT);

        let sampler = ProcSampler::with_proc_path(dir.path());
        let sample = tokio_test::assert_ok!(sampler.sample().await);
        // counters did not move between readings
        assert_eq!(sample.cpu_usage, 0.0);
        assert_eq!(sample.network_usage, 0.0);
        assert!((sample.memory_usage - 75.0).abs() < 1e-9);

        write_proc(&dir, "cpu  200 0 200 1300 100 0 0 0 0 0\n");
        let sample = sampler.sample().await.unwrap();
        assert!((sample.cpu_usage - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sample_missing_proc_fails() {
        let dir = TempDir::new().unwrap();
        let sampler = ProcSampler::with_proc_path(dir.path());
        tokio_test::assert_err!(sampler.sample().await);
    }
}
