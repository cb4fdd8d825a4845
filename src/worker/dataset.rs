// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/worker/dataset.rs
//
// RandomX dataset coordinator: the two-phase spin-yield barrier ported from
// original_source's Workers::updateDataset. A real RandomX dataset is
// multiple gigabytes; this stand-in uses a much smaller deterministic
// buffer (the barrier mechanics are the point here, not dataset size) — see
// the REDESIGN note on kernel depth.

use sha3::{Digest, Sha3_256};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

const CACHE_SIZE: usize = 64 * 1024;
const DATASET_SIZE: usize = 1024 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum DatasetOutcome {
    Ready,
    Cancelled,
}

/// The check-and-rebuild half of the barrier: whether the cache matches the
/// current seed, and the cache itself. Guards only this -- never the
/// dataset fill, which is the expensive part this barrier exists to
/// parallelize.
struct CacheState {
    seed_hash: [u8; 32],
    initialized: bool,
    cache: Vec<u8>,
}

/// `dataset` is sized once at construction and never resized afterward, so
/// every worker's disjoint byte range (computed from `thread_id`/`total_ways`
/// the same way on every thread) stays valid for the coordinator's lifetime.
/// The arrival/departure barriers in `update_dataset` are what make disjoint,
/// lock-free writes into it sound: every worker that holds a slice of
/// `dataset` is inside the same barrier round, so no two slices overlap and
/// no reader observes a partially-written dataset mid-round.
pub struct DatasetCoordinator {
    counter: AtomicU32,
    state: Mutex<CacheState>,
    dataset: UnsafeCell<Vec<u8>>,
}

unsafe impl Sync for DatasetCoordinator {}

impl DatasetCoordinator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            state: Mutex::new(CacheState {
                seed_hash: [0u8; 32],
                initialized: false,
                cache: Vec::new(),
            }),
            dataset: UnsafeCell::new(vec![0u8; DATASET_SIZE]),
        }
    }

    /// Called by every RandomX worker on every hash iteration (see
    /// `Worker::run_loop`'s dispatch). Cheap no-barrier fast path when the
    /// seed hasn't changed; otherwise all workers sharing `total_ways`
    /// collectively rebuild the dataset for the new seed before any of
    /// them proceeds.
    pub fn update_dataset(&self, seed_hash: [u8; 32], total_ways: u32, sequence: &AtomicU64) -> DatasetOutcome {
        {
            let state = self.state.lock().expect("dataset mutex poisoned");
            if state.initialized && state.seed_hash == seed_hash {
                return DatasetOutcome::Ready;
            }
        }

        let thread_id = self.counter.fetch_add(1, Ordering::SeqCst);

        // Phase A: arrival barrier.
        loop {
            if sequence.load(Ordering::Relaxed) == 0 {
                self.counter.fetch_sub(1, Ordering::SeqCst);
                return DatasetOutcome::Cancelled;
            }
            if self.counter.load(Ordering::SeqCst) >= total_ways {
                break;
            }
            std::thread::yield_now();
        }

        // Double-checked re-init: every thread takes the lock in turn but
        // only the first to observe a stale seed does the work. The cache
        // is cloned out here so Phase B's fill runs with the lock released.
        let cache = {
            let mut state = self.state.lock().expect("dataset mutex poisoned");
            if !state.initialized || state.seed_hash != seed_hash {
                state.seed_hash = seed_hash;
                state.cache = derive_cache(&seed_hash);
                state.initialized = true;
            }
            state.cache.clone()
        };

        // Phase B: work partition. Each thread fills its own disjoint slice
        // of the dataset directly, with no lock held -- the arrival barrier
        // above already guarantees every other worker this round computes
        // the same start/end split from a distinct `thread_id`, so no two
        // workers ever touch the same byte.
        {
            let len = unsafe { (*self.dataset.get()).len() };
            let ways = total_ways.max(1) as usize;
            let start = len * (thread_id as usize) / ways;
            let end = len * (thread_id as usize + 1) / ways;
            let base_ptr = unsafe { (*self.dataset.get()).as_mut_ptr() };
            let range = unsafe { std::slice::from_raw_parts_mut(base_ptr.add(start), end - start) };
            fill_dataset_range(range, &cache, start);
        }

        // Phase C: departure barrier.
        self.counter.fetch_sub(1, Ordering::SeqCst);
        loop {
            if sequence.load(Ordering::Relaxed) == 0 {
                return DatasetOutcome::Cancelled;
            }
            if self.counter.load(Ordering::SeqCst) == 0 {
                break;
            }
            std::thread::yield_now();
        }
        DatasetOutcome::Ready
    }

    pub fn current_seed(&self) -> Option<[u8; 32]> {
        let state = self.state.lock().expect("dataset mutex poisoned");
        state.initialized.then_some(state.seed_hash)
    }
}

fn derive_cache(seed_hash: &[u8; 32]) -> Vec<u8> {
    let mut cache = vec![0u8; CACHE_SIZE];
    let mut block = Sha3_256::digest(seed_hash);
    for chunk in cache.chunks_mut(32) {
        chunk.copy_from_slice(&block[..chunk.len()]);
        block = Sha3_256::digest(block);
    }
    cache
}

fn fill_dataset_range(range: &mut [u8], cache: &[u8], base_offset: usize) {
    for (i, byte) in range.iter_mut().enumerate() {
        let cache_idx = (base_offset + i) % cache.len();
        *byte = cache[cache_idx] ^ ((base_offset + i) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn single_worker_barrier_completes() {
        let coordinator = DatasetCoordinator::new();
        let sequence = AtomicU64::new(1);
        let outcome = coordinator.update_dataset([1u8; 32], 1, &sequence);
        assert_eq!(outcome, DatasetOutcome::Ready);
        assert_eq!(coordinator.current_seed(), Some([1u8; 32]));
    }

    #[test]
    fn repeated_call_with_same_seed_skips_barrier() {
        let coordinator = DatasetCoordinator::new();
        let sequence = AtomicU64::new(1);
        coordinator.update_dataset([2u8; 32], 1, &sequence);
        // A second call with the same seed must not touch the counter.
        let outcome = coordinator.update_dataset([2u8; 32], 1, &sequence);
        assert_eq!(outcome, DatasetOutcome::Ready);
    }

    #[test]
    fn four_workers_all_exit_barrier() {
        let coordinator = Arc::new(DatasetCoordinator::new());
        let sequence = Arc::new(AtomicU64::new(1));
        let seed = [7u8; 32];

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let sequence = Arc::clone(&sequence);
                std::thread::spawn(move || coordinator.update_dataset(seed, 4, &sequence))
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), DatasetOutcome::Ready);
        }
        assert_eq!(coordinator.current_seed(), Some(seed));
    }

    #[test]
    fn cancellation_during_arrival_releases_waiters() {
        let coordinator = Arc::new(DatasetCoordinator::new());
        let sequence = Arc::new(AtomicU64::new(1));
        let seed = [9u8; 32];

        // Only 1 of 2 expected workers arrives; the other "arrives" via
        // sequence hitting zero, which must release the first.
        let coordinator2 = Arc::clone(&coordinator);
        let sequence2 = Arc::clone(&sequence);
        let waiter = std::thread::spawn(move || coordinator2.update_dataset(seed, 2, &sequence2));

        std::thread::sleep(std::time::Duration::from_millis(50));
        sequence.store(0, Ordering::Relaxed);

        assert_eq!(waiter.join().unwrap(), DatasetOutcome::Cancelled);
    }
}
