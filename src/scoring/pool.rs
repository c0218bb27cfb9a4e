//! Bounded worker pool for per-PID scoring: a fixed set of threads, each
//! driven by its own `crossbeam_channel` receiver, so dispatch never needs
//! a lock. Each shard owns its own `ProcessScorer` for the lifetime of the
//! pool and a PID is always routed to the same shard (`pid % shard_count`),
//! so a PID's CPU history is always mutated by exactly one thread.

use crossbeam_channel::{bounded, Sender};
use std::thread::JoinHandle;

use crate::proc::enumerate::{NetworkConnection, ProcessInfo};

use super::process_scorer::{ProcessEvidenceRecord, ProcessScorer};

struct WorkItem {
    info: ProcessInfo,
    connections: Vec<NetworkConnection>,
    reply: Sender<ProcessEvidenceRecord>,
}

pub struct L2WorkerPool {
    senders: Vec<Sender<WorkItem>>,
    handles: Vec<JoinHandle<()>>,
}

impl L2WorkerPool {
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let mut senders = Vec::with_capacity(shard_count);
        let mut handles = Vec::with_capacity(shard_count);

        for _ in 0..shard_count {
            let (tx, rx) = bounded::<WorkItem>(256);
            let handle = std::thread::spawn(move || {
                let mut scorer = ProcessScorer::new();
                while let Ok(item) = rx.recv() {
                    let record = scorer.score(&item.info, &item.connections);
                    let _ = item.reply.send(record);
                }
            });
            senders.push(tx);
            handles.push(handle);
        }

        Self { senders, handles }
    }

    /// Scores every process, fanning out across the shard pool, then
    /// gathers all results before returning.
    pub fn score_all(&self, processes: Vec<(ProcessInfo, Vec<NetworkConnection>)>) -> Vec<ProcessEvidenceRecord> {
        let (reply_tx, reply_rx) = bounded::<ProcessEvidenceRecord>(processes.len().max(1));
        let count = processes.len();

        for (info, connections) in processes {
            let shard = (info.pid as usize) % self.senders.len();
            let item = WorkItem {
                info,
                connections,
                reply: reply_tx.clone(),
            };
            if self.senders[shard].send(item).is_err() {
                continue;
            }
        }
        drop(reply_tx);

        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            match reply_rx.recv() {
                Ok(record) => results.push(record),
                Err(_) => break,
            }
        }
        results
    }
}

impl Drop for L2WorkerPool {
    fn drop(&mut self) {
        self.senders.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(pid: u32, name: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: name.to_string(),
            cmdline: vec![name.to_string()],
            user: Some("alice".to_string()),
            cpu_percent: Some(5.0),
            rss_bytes: Some(0),
            uptime_seconds: Some(10.0),
        }
    }

    #[test]
    fn scores_every_submitted_process() {
        let pool = L2WorkerPool::new(2);
        let work = vec![
            (info(1, "bash"), vec![]),
            (info(2, "python"), vec![]),
            (info(3, "xmrig-test"), vec![]),
        ];
        let results = pool.score_all(work);
        assert_eq!(results.len(), 3);
    }
}
