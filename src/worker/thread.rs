// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/worker/thread.rs
//
// The worker main loop: a direct port of original_source's
// MultiWorker<N>::start/consumeJob/save/resume, with the compile-time `N`
// replaced by a runtime `ways` field (see DESIGN NOTES). The nonce
// partitioning formulas and the donation save/resume logic reproduce the
// original exactly.

use crate::core::algorithm::Variant;
use crate::core::hashfn::{self, HashCtx};
use crate::core::job::Job;
use crate::dispatcher::Dispatcher;
use crate::worker::dataset::DatasetOutcome;
use crate::worker::state::WorkerState;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const PAUSED_POLL: Duration = Duration::from_millis(200);
const HASHRATE_REPORT_STRIDE: u64 = 8;

pub struct Worker {
    dispatcher: Arc<Dispatcher>,
    thread_id: usize,
    ways: usize,
    offset: u32,
    total_ways: u32,
    algorithm: crate::core::algorithm::Algorithm,
    ctx: HashCtx,
    sequence: u64,
    state: WorkerState,
    paused_state: Option<WorkerState>,
    iterations: u64,
    hashes_since_report: u64,
}

impl Worker {
    pub fn spawn(
        dispatcher: Arc<Dispatcher>,
        thread_id: usize,
        ways: usize,
        offset: u32,
        total_ways: u32,
        algorithm: crate::core::algorithm::Algorithm,
        huge_pages_requested: bool,
    ) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name(format!("rxcn-worker-{thread_id}"))
            .spawn(move || {
                let ctx = match HashCtx::with_huge_pages(algorithm.scratchpad_bytes(), huge_pages_requested) {
                    Ok(ctx) => ctx,
                    Err(e) => {
                        tracing::error!(thread_id, error = %e, "scratchpad allocation failed");
                        return;
                    }
                };
                let huge_pages_granted = ctx.huge_pages_granted();

                let mut worker = Worker {
                    dispatcher: Arc::clone(&dispatcher),
                    thread_id,
                    ways,
                    offset,
                    total_ways,
                    algorithm,
                    ctx,
                    sequence: 0,
                    state: WorkerState::empty(ways),
                    paused_state: None,
                    iterations: 0,
                    hashes_since_report: 0,
                };

                if let Err(e) = worker.self_test() {
                    if let crate::error::MinerError::SelfTest { family, variant, way } = &e {
                        tracing::error!(
                            thread_id,
                            ?family,
                            ?variant,
                            way,
                            "self-test failed, worker will not start"
                        );
                    } else {
                        tracing::error!(thread_id, error = %e, "self-test failed, worker will not start");
                    }
                    return;
                }

                dispatcher.report_worker_started(huge_pages_granted);
                worker.run_loop();
            })
            .expect("failed to spawn worker thread")
    }

    fn self_test(&mut self) -> crate::error::Result<()> {
        hashfn::verify(self.algorithm)?;
        if matches!(self.algorithm.variant, Variant::Wow | Variant::R) {
            for ways in 1..=self.ways.max(1) {
                hashfn::verify_multiway(self.algorithm, ways)?;
            }
        } else if self.ways > 1 {
            hashfn::verify_multiway(self.algorithm, self.ways)?;
        }
        Ok(())
    }

    fn run_loop(&mut self) {
        loop {
            if self.dispatcher.sequence() == 0 {
                return;
            }

            if self.dispatcher.is_paused() {
                loop {
                    std::thread::sleep(PAUSED_POLL);
                    if !self.dispatcher.is_paused() {
                        break;
                    }
                    if self.dispatcher.sequence() == 0 {
                        return;
                    }
                }
                self.consume_job();
            }

            while !self.dispatcher.is_outdated(self.sequence) {
                if self.dispatcher.sequence() == 0 {
                    return;
                }

                if self.iterations % HASHRATE_REPORT_STRIDE == 0 && self.hashes_since_report > 0 {
                    self.dispatcher.hashrate().record(self.thread_id, self.hashes_since_report);
                    self.hashes_since_report = 0;
                }

                if let Err(e) = self.hash_once() {
                    tracing::error!(thread_id = self.thread_id, error = %e, "hash iteration failed");
                    return;
                }

                self.iterations += 1;
                self.hashes_since_report += self.ways as u64;
                std::thread::yield_now();
            }

            self.consume_job();
        }
    }

    fn hash_once(&mut self) -> crate::error::Result<()> {
        let job = &self.state.job;
        let effective = job.algorithm.resolve_variant(job.fixed_byte());

        if effective.variant == Variant::RxDefyx {
            let seed_hash = job.seed_hash;
            match self
                .dispatcher
                .dataset()
                .update_dataset(seed_hash, self.total_ways, sequence_ref(&self.dispatcher))
            {
                DatasetOutcome::Cancelled => return Ok(()),
                DatasetOutcome::Ready => {}
            }
        }

        let way_size = job.size;
        let (kernel, tag) = hashfn::resolve(effective)?;
        kernel(
            tag,
            &self.state.blob,
            way_size,
            &mut self.state.hash,
            &mut self.ctx,
            job.height,
        )?;

        let target = job.target;
        let pool_id = job.pool_id;
        let job_id = job.id.clone();
        let algorithm = job.algorithm;

        for i in 0..self.ways {
            let word = u64::from_le_bytes(
                self.state.hash[i * 32 + 24..i * 32 + 32]
                    .try_into()
                    .expect("hash slot slice is 8 bytes"),
            );
            if word < target {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&self.state.hash[i * 32..i * 32 + 32]);
                self.dispatcher.submit(crate::core::job::Solution {
                    pool_id,
                    job_id: job_id.clone(),
                    client_id: String::new(),
                    nonce: self.state.nonce_cursors[i],
                    hash,
                    difficulty: if target == 0 { 0 } else { u64::MAX / target },
                    algorithm,
                });
            }
            self.state.nonce_cursors[i] = self.state.nonce_cursors[i].wrapping_add(1);
            self.write_nonce_into_blob(i);
        }
        Ok(())
    }

    fn write_nonce_into_blob(&mut self, way: usize) {
        let way_size = self.state.job.size;
        let offset = way * way_size + crate::core::job::NONCE_OFFSET;
        self.state.blob[offset..offset + 4].copy_from_slice(&self.state.nonce_cursors[way].to_le_bytes());
    }

    /// Ported from `MultiWorker::consumeJob`.
    fn consume_job(&mut self) {
        let job = self.dispatcher.job();
        self.sequence = self.dispatcher.sequence();
        if self.state.job == job {
            return;
        }

        self.save(&job);

        if self.resume(&job) {
            return;
        }

        let way_size = job.size;
        let mut blob = vec![0u8; way_size * self.ways];
        for way in 0..self.ways {
            blob[way * way_size..(way + 1) * way_size].copy_from_slice(&job.blob[..way_size]);
        }

        let nicehash = job.nicehash;
        let incoming_nonce = job.nonce();
        let mut nonce_cursors = vec![0u32; self.ways];
        for (i, cursor) in nonce_cursors.iter_mut().enumerate() {
            *cursor = if nicehash {
                (incoming_nonce & 0xff00_0000) + (0x00ff_ffffu32 / self.total_ways.max(1) * (self.offset + i as u32))
            } else {
                0xffff_ffffu32 / self.total_ways.max(1) * (self.offset + i as u32)
            };
        }

        self.state = WorkerState {
            job,
            blob,
            hash: vec![0u8; 32 * self.ways],
            nonce_cursors,
        };
        for way in 0..self.ways {
            self.write_nonce_into_blob(way);
        }
    }

    /// Ported from `MultiWorker::save`: snapshot state only on a
    /// real-job-to-donation transition.
    fn save(&mut self, incoming: &Job) {
        if incoming.is_donation() && !self.state.job.is_donation() && self.state.job.pool_id >= 0 {
            self.paused_state = Some(self.state.clone());
        }
    }

    /// Ported from `MultiWorker::resume`: restore verbatim when returning
    /// to the same real job id after a donation detour.
    fn resume(&mut self, incoming: &Job) -> bool {
        if self.state.job.is_donation() && !incoming.is_donation() {
            if let Some(paused) = &self.paused_state {
                if paused.job.id == incoming.id {
                    self.state = paused.clone();
                    return true;
                }
            }
        }
        false
    }
}

/// Helper to expose the dispatcher's raw sequence atomic to the dataset
/// barrier without leaking the dispatcher's internals beyond what the
/// barrier needs: the dataset coordinator only ever reads it.
fn sequence_ref(dispatcher: &Arc<Dispatcher>) -> &std::sync::atomic::AtomicU64 {
    dispatcher.sequence_atomic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithm::{Algorithm, Family};
    use crate::core::job::Job;

    fn sample_job(pool_id: i64, nonce: u32, id: &str) -> Job {
        let mut job = Job {
            algorithm: Algorithm::new(Family::Cn, crate::core::algorithm::Variant::V2).unwrap(),
            pool_id,
            id: id.to_string(),
            size: 84,
            target: 1,
            ..Job::default()
        };
        job.set_nonce(nonce);
        job
    }

    #[test]
    fn nonce_partitioning_matches_non_nicehash_formula() {
        // W=4, N=1: initial nonces {0, 0x3FFFFFFF, 0x7FFFFFFE, 0xBFFFFFFD}
        let expected = [0u32, 0x3FFF_FFFF, 0x7FFF_FFFE, 0xBFFF_FFFD];
        for (offset, exp) in expected.iter().enumerate() {
            let nonce = 0xffff_ffffu32 / 4 * (offset as u32);
            assert_eq!(nonce, *exp);
        }
    }

    #[test]
    fn nicehash_partitioning_preserves_high_byte() {
        // W=2, N=2, incoming nonce 0xAB000000.
        let incoming = 0xAB00_0000u32;
        let total_ways = 4u32;
        let expected_low = [0u32, 0x3F_FFFF, 0x7F_FFFE, 0xBF_FFFD];
        for (k, exp_low) in expected_low.iter().enumerate() {
            let nonce = (incoming & 0xff00_0000) + (0x00ff_ffffu32 / total_ways * (k as u32));
            assert_eq!(nonce & 0xff00_0000, 0xAB00_0000);
            assert_eq!(nonce & 0x00ff_ffff, *exp_low);
        }
    }
}
