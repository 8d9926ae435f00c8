//! Short-ID and room-code allocation: an atomic read-modify-write over a
//! per-scope width record, bounded random attempts within the current digit
//! width, widening once a width's keyspace is spent. A call that exhausts
//! its attempts fails with a retryable error; the caller re-invokes it.

use crate::store::AllocatorStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use talkie_core::{ServiceError, ShortId};
use tracing::{debug, info};

/// Width state for one allocation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorState {
    pub width: u32,
    /// Successful allocations at the current width.
    pub issued: u64,
}

impl AllocatorState {
    pub fn new(width: u32) -> Self {
        Self { width, issued: 0 }
    }
}

/// Attempt and widening policy, separated from the allocator so it can be
/// tuned and tested on its own.
#[derive(Debug, Clone, Copy)]
pub struct AllocatorPolicy {
    pub initial_width: u32,
    pub max_attempts: u32,
}

impl AllocatorPolicy {
    /// User IDs hand out the shortest values first.
    pub fn user_ids() -> Self {
        Self {
            initial_width: 1,
            max_attempts: 20,
        }
    }

    /// Room codes start wide enough that guessing is impractical.
    pub fn room_codes() -> Self {
        Self {
            initial_width: 6,
            max_attempts: 20,
        }
    }

    /// Values available at a width. Width 1 excludes 0, so a bare "0" is
    /// never a user ID; wider values are zero-padded.
    pub fn keyspace(&self, width: u32) -> u64 {
        if width == 1 { 9 } else { 10u64.pow(width) }
    }

    pub fn draw(&self, width: u32, rng: &mut impl Rng) -> ShortId {
        let value = if width == 1 {
            rng.gen_range(1..=9)
        } else {
            rng.gen_range(0..10u64.pow(width))
        };
        ShortId::from_value(value, width)
    }
}

pub struct IdAllocator {
    store: Arc<dyn AllocatorStore>,
    scope: String,
    policy: AllocatorPolicy,
    rng: Mutex<StdRng>,
}

impl IdAllocator {
    pub fn new(store: Arc<dyn AllocatorStore>, scope: impl Into<String>, policy: AllocatorPolicy) -> Self {
        Self {
            store,
            scope: scope.into(),
            policy,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(
        store: Arc<dyn AllocatorStore>,
        scope: impl Into<String>,
        policy: AllocatorPolicy,
        seed: u64,
    ) -> Self {
        Self {
            store,
            scope: scope.into(),
            policy,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Allocate one value for `owner`. Fails `ResourceExhausted` after the
    /// policy's attempt budget; safe to re-invoke.
    pub async fn allocate(&self, owner: &str) -> Result<ShortId, ServiceError> {
        for attempt in 0..self.policy.max_attempts {
            let state = self
                .store
                .allocator_state(&self.scope, self.policy.initial_width)
                .await?;

            if state.issued >= self.policy.keyspace(state.width) {
                let widened = AllocatorState {
                    width: state.width + 1,
                    issued: 0,
                };
                // Losing this swap means another allocator already widened;
                // the next load sees the winner's state either way.
                if self
                    .store
                    .compare_and_swap_state(&self.scope, state, widened)
                    .await?
                {
                    info!(
                        scope = %self.scope,
                        from = state.width,
                        to = state.width + 1,
                        "keyspace spent, widening"
                    );
                }
                continue;
            }

            let candidate = {
                let mut rng = self.rng.lock().expect("allocator rng poisoned");
                self.policy.draw(state.width, &mut *rng)
            };
            if self.store.try_claim(&self.scope, &candidate, owner).await? {
                self.record_issue(state).await?;
                debug!(scope = %self.scope, %candidate, attempt, "allocated");
                return Ok(candidate);
            }
        }

        Err(ServiceError::ResourceExhausted(format!(
            "could not allocate an ID in {} attempts, retry",
            self.policy.max_attempts
        )))
    }

    /// Count one successful claim against the width it was drawn at. The
    /// swap retries against fresh state so concurrent claims never lose an
    /// increment; if a concurrent widening reset the count, the claim
    /// belongs to the spent width and is not counted.
    async fn record_issue(&self, claimed_at: AllocatorState) -> Result<(), ServiceError> {
        let mut current = claimed_at;
        loop {
            if current.width != claimed_at.width {
                return Ok(());
            }
            let next = AllocatorState {
                width: current.width,
                issued: current.issued + 1,
            };
            if self
                .store
                .compare_and_swap_state(&self.scope, current, next)
                .await?
            {
                return Ok(());
            }
            current = self
                .store
                .allocator_state(&self.scope, self.policy.initial_width)
                .await?;
        }
    }
}
