// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/dispatcher.rs
//
// The process-wide worker pool coordinator, a single owned value replacing
// original_source's file-scope `Workers` statics (see the DESIGN NOTES on
// "Global dispatcher state"). `sequence`/`paused` are the synchronization
// boundary described in Workers.h/.cpp: a worker compares its cached
// sequence to the dispatcher's atomic and reloads the job on any mismatch.

use crate::config::Config;
use crate::core::algorithm::Algorithm;
use crate::core::hashrate::HashRate;
use crate::core::job::{Job, Solution};
use crate::job_source::JobSource;
use crate::worker::dataset::DatasetCoordinator;
use crate::worker::state::LaunchStatus;
use crate::worker::Worker;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

pub struct Dispatcher {
    job: RwLock<Job>,
    sequence: AtomicU64,
    paused: AtomicU8,
    active: AtomicBool,
    enabled: AtomicBool,
    status: Mutex<LaunchStatus>,
    queue: Mutex<VecDeque<Solution>>,
    hashrate: HashRate,
    dataset: Arc<DatasetCoordinator>,
    source: RwLock<Option<Arc<dyn JobSource>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// `threads` is the resolved thread count (config's `max_threads_hint`
    /// or `num_cpus::get()`); `ways_per_thread` is this crate's multiway
    /// batch size per worker (spec's `N`, 1..=5).
    pub fn start(
        config: &Config,
        algorithm: Algorithm,
        threads: usize,
        ways_per_thread: usize,
        source: Arc<dyn JobSource>,
    ) -> Arc<Self> {
        let total_ways = (threads * ways_per_thread) as u32;

        let dispatcher = Arc::new(Self {
            job: RwLock::new(Job::default()),
            sequence: AtomicU64::new(1),
            paused: AtomicU8::new(1),
            active: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            status: Mutex::new(LaunchStatus {
                threads_configured: threads,
                threads_started: 0,
                huge_pages_granted: 0,
                huge_pages_requested: if config.cpu.huge_pages { threads } else { 0 },
                total_ways: total_ways as usize,
                algorithm,
            }),
            queue: Mutex::new(VecDeque::new()),
            hashrate: HashRate::new(threads),
            dataset: Arc::new(DatasetCoordinator::new()),
            source: RwLock::new(Some(source)),
            workers: Mutex::new(Vec::new()),
        });

        let mut handles = Vec::with_capacity(threads);
        for thread_id in 0..threads {
            let offset = (thread_id * ways_per_thread) as u32;
            let dispatcher_clone = Arc::clone(&dispatcher);
            let handle = Worker::spawn(
                dispatcher_clone,
                thread_id,
                ways_per_thread,
                offset,
                total_ways,
                algorithm,
                config.cpu.huge_pages,
            );
            handles.push(handle);
        }
        *dispatcher.workers.lock().expect("workers mutex poisoned") = handles;

        dispatcher
    }

    pub fn job(&self) -> Job {
        self.job.read().expect("job rwlock poisoned").clone()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Exposes the raw atomic to the dataset barrier, which needs to poll
    /// it during its spin-yield loops without going through `Dispatcher`'s
    /// higher-level methods.
    pub fn sequence_atomic(&self) -> &AtomicU64 {
        &self.sequence
    }

    pub fn is_outdated(&self, observed: u64) -> bool {
        self.sequence() != observed
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed) == 1
    }

    pub fn dataset(&self) -> &Arc<DatasetCoordinator> {
        &self.dataset
    }

    pub fn hashrate(&self) -> &HashRate {
        &self.hashrate
    }

    pub fn status(&self) -> LaunchStatus {
        self.status.lock().expect("status mutex poisoned").clone()
    }

    pub fn report_worker_started(&self, huge_pages_granted: bool) {
        let mut status = self.status.lock().expect("status mutex poisoned");
        status.threads_started += 1;
        if huge_pages_granted {
            status.huge_pages_granted += 1;
        }
        if status.threads_started == status.threads_configured {
            tracing::info!(
                threads = status.threads_started,
                huge_pages = format!("{}/{}", status.huge_pages_granted, status.threads_configured),
                "all workers ready"
            );
        }
    }

    /// Replaces the current job. `is_donation` forces `pool_id = -1` on the
    /// published copy, matching `Workers::setJob`'s donation rewrite.
    ///
    /// `active` is always raised, even while mining is disabled, since the
    /// original unlocks the job regardless of `m_enabled` and only gates the
    /// pause/sequence side effects on it.
    pub fn set_job(&self, mut job: Job, is_donation: bool) {
        if is_donation {
            job.pool_id = crate::core::job::POOL_ID_DONATION;
        }
        {
            let mut guard = self.job.write().expect("job rwlock poisoned");
            *guard = job;
        }
        self.active.store(true, Ordering::Relaxed);
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        self.sequence.fetch_add(1, Ordering::Relaxed);
        self.paused.store(0, Ordering::Relaxed);
    }

    /// Ported from `Workers::setEnabled`: a no-op until the value actually
    /// flips, and a no-op on `paused`/`sequence` until a job has been
    /// published at least once (`active`).
    pub fn set_enabled(&self, enabled: bool) {
        let prev = self.enabled.swap(enabled, Ordering::Relaxed);
        if prev == enabled {
            return;
        }
        if !self.active.load(Ordering::Relaxed) {
            return;
        }
        self.paused.store(if enabled { 0 } else { 1 }, Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Relaxed);
    }

    /// Producer side: a worker that found a share pushes it here and the
    /// caller is expected to periodically drain via `drain_results`.
    pub fn submit(&self, solution: Solution) {
        self.queue
            .lock()
            .expect("result queue mutex poisoned")
            .push_back(solution);
    }

    /// Single-consumer FIFO drain, forwarding each `Solution` to the
    /// registered `JobSource` in submission order.
    pub fn drain_results(&self) {
        let drained: Vec<Solution> = {
            let mut queue = self.queue.lock().expect("result queue mutex poisoned");
            queue.drain(..).collect()
        };
        if drained.is_empty() {
            return;
        }
        let source = self.source.read().expect("source rwlock poisoned").clone();
        if let Some(source) = source {
            for solution in drained {
                source.submit_solution(solution);
            }
        }
    }

    pub fn tick_hashrate_sample(&self) {
        let source = self.source.read().expect("source rwlock poisoned").clone();
        if let Some(source) = source {
            source.on_hashrate_sample(self.hashrate.total(crate::core::hashrate::SHORT_WINDOW));
        }
    }

    pub fn pause(&self) {
        self.active.store(false, Ordering::Relaxed);
        self.paused.store(1, Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Relaxed);
    }

    /// Universal cancel: every worker observes `sequence == 0` within one
    /// loop iteration and within the dataset barrier's spin.
    pub fn stop(&self) {
        self.paused.store(0, Ordering::Relaxed);
        self.sequence.store(0, Ordering::Relaxed);
        let handles = std::mem::take(&mut *self.workers.lock().expect("workers mutex poisoned"));
        for handle in handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CpuConfig, PoolConfig};
    use crate::core::algorithm::{Family, Variant};
    use std::sync::Mutex as StdMutex;

    struct RecordingSource {
        solutions: StdMutex<Vec<Solution>>,
    }

    impl JobSource for RecordingSource {
        fn submit_solution(&self, solution: Solution) {
            self.solutions.lock().unwrap().push(solution);
        }
    }

    fn test_config() -> Config {
        Config {
            pools: vec![PoolConfig {
                url: "pool.example:3333".into(),
                user: "wallet".into(),
                pass: "x".into(),
                nicehash: false,
                enabled: true,
                keepalive: true,
                rig_id: None,
                algo: "cryptonight/2".into(),
                variant: None,
            }],
            cpu: CpuConfig {
                enabled: true,
                huge_pages: false,
                max_threads_hint: Some(1),
            },
            retries: 5,
            retry_pause: 5,
            donate_level: 0,
            http_port: 8080,
        }
    }

    #[test]
    fn sequence_starts_at_one_and_set_job_bumps_it() {
        let config = test_config();
        let algo = Algorithm::new(Family::Cn, Variant::V2).unwrap();
        let source = Arc::new(RecordingSource {
            solutions: StdMutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::start(&config, algo, 1, 1, source);
        dispatcher.set_enabled(true);
        let seq_before = dispatcher.sequence();
        let mut job = Job::default();
        job.size = 84;
        job.target = 1;
        job.id = "abc".into();
        dispatcher.set_job(job, false);
        assert!(dispatcher.sequence() > seq_before);
        dispatcher.stop();
    }

    #[test]
    fn stop_zeroes_sequence() {
        let config = test_config();
        let algo = Algorithm::new(Family::Cn, Variant::V2).unwrap();
        let source = Arc::new(RecordingSource {
            solutions: StdMutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::start(&config, algo, 1, 1, source);
        dispatcher.stop();
        assert_eq!(dispatcher.sequence(), 0);
    }

    #[test]
    fn donation_job_is_rewritten_to_pool_id_minus_one() {
        let config = test_config();
        let algo = Algorithm::new(Family::Cn, Variant::V2).unwrap();
        let source = Arc::new(RecordingSource {
            solutions: StdMutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::start(&config, algo, 1, 1, source);
        let mut job = Job::default();
        job.size = 84;
        job.target = 1;
        job.pool_id = 0;
        dispatcher.set_job(job, true);
        assert_eq!(dispatcher.job().pool_id, crate::core::job::POOL_ID_DONATION);
        dispatcher.stop();
    }
}
