// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: tests/integration_test.rs
//
// End-to-end tests against the dispatcher's public API: job publication,
// donation transitions, sequence monotonicity, and the RandomX dataset
// barrier under concurrent workers.

use rxcn_miner::config::{Config, CpuConfig, PoolConfig};
use rxcn_miner::core::algorithm::{Algorithm, Family, Variant};
use rxcn_miner::core::job::{Job, Solution, POOL_ID_DONATION};
use rxcn_miner::job_source::JobSource;
use rxcn_miner::worker::dataset::{DatasetCoordinator, DatasetOutcome};
use rxcn_miner::Dispatcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct RecordingSource {
    solutions: Mutex<Vec<Solution>>,
}

impl RecordingSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            solutions: Mutex::new(Vec::new()),
        })
    }
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

fn sample_job(pool_id: i64, id: &str) -> Job {
    Job {
        size: 84,
        target: 1,
        pool_id,
        id: id.to_string(),
        ..Job::default()
    }
}

#[test]
fn job_publication_bumps_sequence_and_drains_to_job_source() {
    let config = test_config();
    let algo = Algorithm::new(Family::Cn, Variant::V2).unwrap();
    let source = RecordingSource::new();
    let dispatcher = Dispatcher::start(&config, algo, 1, 1, source.clone());

    dispatcher.set_enabled(true);
    let seq0 = dispatcher.sequence();
    dispatcher.set_job(sample_job(0, "job-a"), false);
    assert!(dispatcher.sequence() > seq0, "publishing a job must bump sequence");
    assert_eq!(dispatcher.job().id, "job-a");

    dispatcher.submit(Solution {
        pool_id: 0,
        job_id: "job-a".into(),
        client_id: String::new(),
        nonce: 42,
        hash: [0u8; 32],
        difficulty: 1,
        algorithm: algo,
    });
    dispatcher.drain_results();
    assert_eq!(source.solutions.lock().unwrap().len(), 1);

    dispatcher.stop();
    assert_eq!(dispatcher.sequence(), 0, "stop() must zero the sequence");
}

#[test]
fn donation_transition_rewrites_pool_id_and_preserves_real_job() {
    let config = test_config();
    let algo = Algorithm::new(Family::Cn, Variant::V2).unwrap();
    let source = RecordingSource::new();
    let dispatcher = Dispatcher::start(&config, algo, 1, 1, source);

    dispatcher.set_job(sample_job(0, "real-job"), false);
    assert_eq!(dispatcher.job().pool_id, 0);

    dispatcher.set_job(sample_job(0, "donation-job"), true);
    assert_eq!(dispatcher.job().pool_id, POOL_ID_DONATION);
    assert_eq!(dispatcher.job().id, "donation-job");

    dispatcher.set_job(sample_job(0, "real-job"), false);
    assert_eq!(dispatcher.job().pool_id, 0);
    assert_eq!(dispatcher.job().id, "real-job");

    dispatcher.stop();
}

#[test]
fn dataset_barrier_completes_for_all_concurrent_workers() {
    let coordinator = Arc::new(DatasetCoordinator::new());
    let sequence = Arc::new(AtomicU64::new(1));
    let seed = [7u8; 32];
    let total_ways = 4u32;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let sequence = Arc::clone(&sequence);
            std::thread::spawn(move || coordinator.update_dataset(seed, total_ways, &sequence))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), DatasetOutcome::Ready);
    }

    // Same seed again must short-circuit without re-entering the barrier.
    let outcome = coordinator.update_dataset(seed, total_ways, &sequence);
    assert_eq!(outcome, DatasetOutcome::Ready);
}

#[test]
fn dataset_barrier_cancels_all_waiters_when_sequence_drops_to_zero() {
    let coordinator = Arc::new(DatasetCoordinator::new());
    let sequence = Arc::new(AtomicU64::new(1));
    let seed = [9u8; 32];
    let total_ways = 2u32;

    let coordinator_clone = Arc::clone(&coordinator);
    let sequence_clone = Arc::clone(&sequence);
    let waiter = std::thread::spawn(move || coordinator_clone.update_dataset(seed, total_ways, &sequence_clone));

    std::thread::sleep(std::time::Duration::from_millis(50));
    sequence.store(0, Ordering::Relaxed);

    assert_eq!(waiter.join().unwrap(), DatasetOutcome::Cancelled);
}
