// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/hashrate.rs
//
// Rolling per-thread hash rate, adapted from the teacher's
// miner/stats/thread_stats.rs ring-buffer-free rolling average into a
// fixed-capacity ring per thread so `calc` can serve short/medium/long
// windows without reallocating on the hot path.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const SHORT_WINDOW: Duration = Duration::from_secs(10);
pub const MEDIUM_WINDOW: Duration = Duration::from_secs(60);
pub const LONG_WINDOW: Duration = Duration::from_secs(15 * 60);

struct Sample {
    at: Instant,
    hash_count: u64,
}

struct ThreadRing {
    samples: VecDeque<Sample>,
    total: u64,
}

impl ThreadRing {
    fn new() -> Self {
        Self {
            samples: VecDeque::new(),
            total: 0,
        }
    }

    fn push(&mut self, hash_count: u64, at: Instant) {
        self.total += hash_count;
        self.samples.push_back(Sample { at, hash_count });
        // Ring only needs to cover the longest window we're asked for.
        let cutoff = at.checked_sub(LONG_WINDOW).unwrap_or(at);
        while let Some(front) = self.samples.front() {
            if front.at < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn rate(&self, window: Duration, now: Instant) -> f64 {
        let cutoff = now.checked_sub(window).unwrap_or(now);
        let mut hashes = 0u64;
        let mut earliest = now;
        for sample in self.samples.iter().rev() {
            if sample.at < cutoff {
                break;
            }
            hashes += sample.hash_count;
            earliest = sample.at;
        }
        let elapsed = now.saturating_duration_since(earliest).as_secs_f64();
        if elapsed <= 0.0 {
            0.0
        } else {
            hashes as f64 / elapsed
        }
    }
}

/// Published every 8 hashing iterations by a worker (see `Worker::run_loop`),
/// consumed by the 500 ms dispatcher tick and the HTTP summary endpoint.
/// Not on the hot path: contention is bounded by that 8-iteration stride.
pub struct HashRate {
    threads: Mutex<Vec<ThreadRing>>,
    highest: std::sync::atomic::AtomicU64,
}

impl HashRate {
    pub fn new(thread_count: usize) -> Self {
        Self {
            threads: Mutex::new((0..thread_count).map(|_| ThreadRing::new()).collect()),
            highest: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn record(&self, thread_id: usize, hash_count: u64) {
        let now = Instant::now();
        let mut threads = self.threads.lock().expect("hashrate mutex poisoned");
        if let Some(ring) = threads.get_mut(thread_id) {
            ring.push(hash_count, now);
            let total_rate = threads.iter().map(|r| r.rate(SHORT_WINDOW, now)).sum::<f64>();
            let bits = total_rate.to_bits();
            self.highest
                .fetch_max(bits, std::sync::atomic::Ordering::Relaxed);
        }
    }

    pub fn calc(&self, thread_id: usize, window: Duration) -> f64 {
        let now = Instant::now();
        let threads = self.threads.lock().expect("hashrate mutex poisoned");
        threads.get(thread_id).map_or(0.0, |r| r.rate(window, now))
    }

    pub fn total(&self, window: Duration) -> f64 {
        let now = Instant::now();
        let threads = self.threads.lock().expect("hashrate mutex poisoned");
        threads.iter().map(|r| r.rate(window, now)).sum()
    }

    pub fn highest(&self) -> f64 {
        f64::from_bits(self.highest.load(std::sync::atomic::Ordering::Relaxed))
    }

    pub fn print(&self) {
        tracing::info!(
            short = format!("{:.2} H/s", self.total(SHORT_WINDOW)),
            medium = format!("{:.2} H/s", self.total(MEDIUM_WINDOW)),
            long = format!("{:.2} H/s", self.total(LONG_WINDOW)),
            highest = format!("{:.2} H/s", self.highest()),
            "hashrate"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_per_thread() {
        let hr = HashRate::new(2);
        hr.record(0, 100);
        hr.record(1, 50);
        assert!(hr.calc(0, SHORT_WINDOW) >= 0.0);
        assert!(hr.calc(1, SHORT_WINDOW) >= 0.0);
    }

    #[test]
    fn unknown_thread_id_returns_zero() {
        let hr = HashRate::new(1);
        assert_eq!(hr.calc(5, SHORT_WINDOW), 0.0);
    }
}
