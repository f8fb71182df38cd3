//! The forging scheduler.
//!
//! Miners push candidate nonces into a bounded queue; one persistent worker
//! drains it, keeps the best submission for the current tip, sleeps until
//! that submission's time-bent deadline, and then builds, signs and submits
//! the block. A new tip clears the pending forge (after a defensive-forging
//! check); a better submission replaces it; a worse one is dropped.
//!
//! All forge state belongs to the worker thread. Producers touch only the
//! queue; the condition variable wakes the worker on enqueue, tip change
//! and shutdown.

pub mod submission;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::address::AccountId;
use crate::assignments::effective_signer;
use crate::consensus::difficulty::new_block_context;
use crate::consensus::params::ConsensusParams;
use crate::consensus::time_bending::time_bended_deadline;
use crate::interfaces::{
    BlockIndex, BlockSubmitter, BlockTemplateBuilder, BlockTemplateOptions, ChainView, Signer,
};
use crate::primitives::block::PoCXProof;
use crate::primitives::transaction::Script;

pub use submission::{improves_on, NonceSubmission};

/// Queue bound; overflow is back-pressure, not a fatal condition.
pub const MAX_QUEUE_SIZE: usize = 1000;

/// How long the idle worker sleeps between queue checks.
const IDLE_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("submission queue full")]
    QueueFull,
}

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("block template creation failed: {0}")]
    Template(#[from] anyhow::Error),
    #[error("no signing key for effective signer {0}")]
    NoKey(AccountId),
    #[error("block signing failed for {0}")]
    SigningFailed(AccountId),
    #[error("block rejected by submission pipeline")]
    Rejected,
}

/// Host services the scheduler forges with.
#[derive(Clone)]
pub struct SchedulerServices {
    pub params: ConsensusParams,
    pub chain: Arc<dyn ChainView>,
    pub template_builder: Arc<dyn BlockTemplateBuilder>,
    pub signer: Arc<dyn Signer>,
    pub submitter: Arc<dyn BlockSubmitter>,
}

struct Shared {
    queue: Mutex<VecDeque<NonceSubmission>>,
    queue_cv: Condvar,
    shutdown: AtomicBool,
    /// Bumped by `notify_new_tip`; lets the waiting worker notice tips that
    /// arrive while it sleeps towards a deadline.
    tip_epoch: AtomicU64,
}

/// The best submission seen for the current tip, waiting for its deadline.
#[derive(Clone)]
struct PendingForge {
    account_id: AccountId,
    seed: [u8; 32],
    nonce: u64,
    quality: u64,
    compression: u32,
    deadline_seconds: u64,
    base_target: u64,
    height: i32,
    gen_sig: [u8; 32],
    tip_hash: [u8; 32],
    forge_time: SystemTime,
    cancelled: bool,
}

pub struct ForgingScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ForgingScheduler {
    pub fn new(services: SchedulerServices) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
            tip_epoch: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("pocx-forger".to_string())
            .spawn(move || {
                Worker {
                    services,
                    shared: worker_shared,
                    current: None,
                }
                .run()
            })
            .expect("spawn forging worker");

        ForgingScheduler {
            shared,
            worker: Some(worker),
        }
    }

    /// Queue a submission. Fails only when the queue is full.
    pub fn submit_nonce(&self, submission: NonceSubmission) -> Result<(), SubmitError> {
        {
            let mut queue = self.shared.queue.lock().expect("queue lock");
            if queue.len() >= MAX_QUEUE_SIZE {
                warn!(target: "pocx::scheduler", len = queue.len(),
                      "submission queue full, rejecting");
                return Err(SubmitError::QueueFull);
            }
            queue.push_back(submission);
        }
        self.shared.queue_cv.notify_one();
        Ok(())
    }

    /// Tell the worker the active tip changed so it can re-check a pending
    /// forge instead of sleeping through a stale deadline.
    pub fn notify_new_tip(&self) {
        self.shared.tip_epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.queue_cv.notify_all();
    }

    pub fn shutdown(&mut self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(target: "pocx::scheduler", "shutting down forging worker");
        self.shared.queue_cv.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for ForgingScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum WaitOutcome {
    Deadline,
    NewSubmission,
    Cancelled,
    Shutdown,
}

struct Worker {
    services: SchedulerServices,
    shared: Arc<Shared>,
    current: Option<PendingForge>,
}

impl Worker {
    fn run(mut self) {
        info!(target: "pocx::scheduler", "forging worker started");
        while !self.shared.shutdown.load(Ordering::SeqCst) {
            let next = {
                let mut queue = self.shared.queue.lock().expect("queue lock");
                queue.pop_front()
            };

            if let Some(submission) = next {
                self.process_submission(submission);
                continue;
            }

            if self.current.as_ref().map(|f| !f.cancelled).unwrap_or(false) {
                self.wait_for_deadline_or_new_submission();
            } else {
                let queue = self.shared.queue.lock().expect("queue lock");
                let _ = self
                    .shared
                    .queue_cv
                    .wait_timeout_while(queue, IDLE_WAIT, |q| {
                        q.is_empty() && !self.shared.shutdown.load(Ordering::SeqCst)
                    });
            }
        }
        info!(target: "pocx::scheduler", "forging worker stopped");
    }

    fn process_submission(&mut self, submission: NonceSubmission) {
        let Some(tip) = self.services.chain.active_tip() else {
            return;
        };

        // Tip moved under a pending forge: maybe publish a competing block,
        // then start over for the new tip.
        if let Some(forge) = self.current.clone() {
            if forge.tip_hash != tip.hash {
                self.check_defensive_forging(&forge, &tip);
                self.current = None;
            }
        }

        let Ok(context) = new_block_context(self.services.chain.as_ref(), &self.services.params)
        else {
            return;
        };

        if !submission.matches_context(context.height, &context.gen_sig) {
            debug!(target: "pocx::scheduler",
                   expected_height = submission.expected_height, height = context.height,
                   "stale submission dropped");
            return;
        }

        if !improves_on(submission.quality, self.current.as_ref().map(|f| f.quality)) {
            debug!(target: "pocx::scheduler", quality = submission.quality,
                   "submission does not beat current candidate");
            return;
        }

        let deadline_seconds = time_bended_deadline(
            submission.quality,
            context.base_target,
            self.services.params.target_spacing,
        );

        if let Some(forge) = self.current.as_mut() {
            forge.cancelled = true;
            self.shared.queue_cv.notify_all();
        }

        let forge_time = UNIX_EPOCH + Duration::from_secs(u64::from(tip.time) + deadline_seconds);
        info!(target: "pocx::scheduler", height = context.height,
              quality = submission.quality, deadline = deadline_seconds,
              "submission accepted as forging candidate");

        self.current = Some(PendingForge {
            account_id: submission.account_id,
            seed: submission.seed,
            nonce: submission.nonce,
            quality: submission.quality,
            compression: submission.compression,
            deadline_seconds,
            base_target: context.base_target,
            height: context.height,
            gen_sig: context.gen_sig,
            tip_hash: tip.hash,
            forge_time,
            cancelled: false,
        });
    }

    fn wait_for_deadline_or_new_submission(&mut self) {
        let Some(forge) = self.current.clone() else {
            return;
        };

        match self.wait_until(&forge) {
            WaitOutcome::Shutdown | WaitOutcome::NewSubmission | WaitOutcome::Cancelled => {}
            WaitOutcome::Deadline => self.deadline_reached(forge),
        }
    }

    /// Sleep towards the forge time, waking for submissions, cancellation,
    /// shutdown or tip changes.
    fn wait_until(&mut self, forge: &PendingForge) -> WaitOutcome {
        let mut epoch = self.shared.tip_epoch.load(Ordering::SeqCst);
        loop {
            let remaining = forge
                .forge_time
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO);
            if remaining.is_zero() {
                return WaitOutcome::Deadline;
            }

            let queue = self.shared.queue.lock().expect("queue lock");
            let (queue, _timeout) = self
                .shared
                .queue_cv
                .wait_timeout(queue, remaining)
                .expect("queue lock");
            let queue_len = queue.len();
            drop(queue);

            if self.shared.shutdown.load(Ordering::SeqCst) {
                return WaitOutcome::Shutdown;
            }
            if queue_len > 0 {
                return WaitOutcome::NewSubmission;
            }
            if self.current.as_ref().map(|f| f.cancelled).unwrap_or(true) {
                return WaitOutcome::Cancelled;
            }

            let now_epoch = self.shared.tip_epoch.load(Ordering::SeqCst);
            if now_epoch != epoch {
                epoch = now_epoch;
                // A tip arrived mid-wait. If our context is gone, react now
                // rather than at the deadline.
                let stale = match new_block_context(
                    self.services.chain.as_ref(),
                    &self.services.params,
                ) {
                    Ok(context) => {
                        context.height != forge.height || context.gen_sig != forge.gen_sig
                    }
                    Err(_) => true,
                };
                if stale {
                    if let Some(tip) = self.services.chain.active_tip() {
                        self.check_defensive_forging(forge, &tip);
                    }
                    self.current = None;
                    return WaitOutcome::Cancelled;
                }
            }
            // Spurious wake: loop and re-compute the remaining time.
        }
    }

    fn deadline_reached(&mut self, forge: PendingForge) {
        let Ok(context) = new_block_context(self.services.chain.as_ref(), &self.services.params)
        else {
            self.current = None;
            return;
        };

        if forge.height != context.height || forge.gen_sig != context.gen_sig {
            debug!(target: "pocx::scheduler", height = forge.height,
                   "forging context went stale at deadline, dropping");
            self.current = None;
            return;
        }

        // Same tip but the base target moved mid-adjustment: re-derive the
        // deadline and keep waiting.
        if forge.base_target != context.base_target {
            let deadline_seconds = time_bended_deadline(
                forge.quality,
                context.base_target,
                self.services.params.target_spacing,
            );
            let tip_time = self
                .services
                .chain
                .active_tip()
                .map(|tip| u64::from(tip.time))
                .unwrap_or(0);
            if let Some(current) = self.current.as_mut() {
                current.deadline_seconds = deadline_seconds;
                current.base_target = context.base_target;
                current.forge_time = UNIX_EPOCH + Duration::from_secs(tip_time + deadline_seconds);
            }
            return;
        }

        match self.forge_block(&forge) {
            Ok(()) => info!(target: "pocx::scheduler",
                            deadline = forge.deadline_seconds, "deadline reached, block forged"),
            Err(err) => warn!(target: "pocx::scheduler",
                              deadline = forge.deadline_seconds, error = %err,
                              "deadline reached but forging failed"),
        }
        self.current = None;
    }

    /// Build, sign and submit a block for the pending forge.
    fn forge_block(&self, forge: &PendingForge) -> Result<(), ForgeError> {
        let signer_account = effective_signer(
            &forge.account_id,
            forge.height,
            self.services.chain.as_ref(),
        );

        let mut block = self.services.template_builder.create(BlockTemplateOptions {
            coinbase_script: Script::p2wpkh(&signer_account),
            use_mempool: true,
        })?;

        block.header.proof = PoCXProof {
            seed: forge.seed,
            account_id: forge.account_id,
            compression: forge.compression,
            nonce: forge.nonce,
            quality: forge.quality,
        };
        block.header.merkle_root = block.merkle_root();

        let pubkey = self
            .services
            .signer
            .pubkey(&signer_account)
            .ok_or(ForgeError::NoKey(signer_account))?;
        block.header.pubkey = pubkey;

        let signing_hash = crate::primitives::block::block_signature_hash(&block.hash());
        let signature = self
            .services
            .signer
            .sign_compact(&signer_account, &signing_hash)
            .ok_or(ForgeError::SigningFailed(signer_account))?;
        block.header.signature = signature;

        let hash = block.hash();
        info!(target: "pocx::scheduler", hash = %hex::encode(hash),
              height = forge.height, nonce = forge.nonce, quality = forge.quality,
              compression = forge.compression, "submitting forged block");

        if !self
            .services
            .submitter
            .process_new_block(&block, true, true)
        {
            return Err(ForgeError::Rejected);
        }
        Ok(())
    }

    /// A block built on our recorded tip arrived while we were holding a
    /// better quality: publish our block too, so neighbours can prefer it.
    fn check_defensive_forging(&self, forge: &PendingForge, new_tip: &BlockIndex) {
        if new_tip.prev_hash != forge.tip_hash {
            return; // reorg, not same-height competition
        }
        if forge.quality < new_tip.proof.quality {
            info!(target: "pocx::scheduler",
                  ours = forge.quality, theirs = new_tip.proof.quality,
                  "defensive forging: our quality beats the arriving block");
            if let Err(err) = self.forge_block(forge) {
                warn!(target: "pocx::scheduler", error = %err, "defensive forging failed");
            }
        }
    }
}
