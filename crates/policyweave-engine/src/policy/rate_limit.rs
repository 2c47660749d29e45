use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use policyweave_core::{Event, PolicyError, Result};

use super::{rejection, Policy};
use crate::chain::{OperationCall, OperationNext, SourceNext};
use crate::state::PolicyState;

/// Token-bucket rate limit shared by every invocation the policy is bound to.
///
/// Sources over the limit get a 429 rejection response; operations fail with `Rejected`.
pub struct RateLimitPolicy {
    id: String,
    bucket: Mutex<TokenBucket>,
}

impl RateLimitPolicy {
    pub fn new(id: impl Into<String>, rps: u32, burst: u32) -> Self {
        Self {
            id: id.into(),
            bucket: Mutex::new(TokenBucket::new(rps, burst)),
        }
    }

    fn allow(&self) -> bool {
        // Poisoned mutex means logic bug; treat as "deny" instead of panic.
        if let Ok(mut g) = self.bucket.lock() {
            g.allow()
        } else {
            false
        }
    }
}

#[async_trait]
impl Policy for RateLimitPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    async fn on_source(&self, event: Event, next: SourceNext<'_>, _state: PolicyState) -> Result<Event> {
        if !self.allow() {
            tracing::debug!(policy = %self.id, execution = %event.execution_id(), "source rate limited");
            return Ok(rejection(event, 429, "rate limited"));
        }
        next.run(event).await
    }

    async fn on_operation(
        &self,
        call: OperationCall,
        next: OperationNext<'_>,
        _state: PolicyState,
    ) -> Result<Event> {
        if !self.allow() {
            return Err(PolicyError::rejected(&self.id, "rate limited"));
        }
        next.run(call).await
    }
}

#[derive(Debug)]
struct TokenBucket {
    rps: u32,
    capacity: u32,
    tokens: u32,
    last: Instant,
}

impl TokenBucket {
    fn new(rps: u32, burst: u32) -> Self {
        let rps = rps.max(1);
        let capacity = burst.max(1);
        Self {
            rps,
            capacity,
            tokens: capacity,
            last: Instant::now(),
        }
    }

    fn allow(&mut self) -> bool {
        self.refill();

        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        if elapsed < Duration::from_millis(50) {
            return;
        }

        let earned = elapsed
            .as_millis()
            .saturating_mul(u128::from(self.rps))
            / 1000;
        if earned == 0 {
            return;
        }
        // never more than a full bucket, so the narrowing below is lossless
        let add = u32::try_from(earned.min(u128::from(self.capacity))).unwrap_or(self.capacity);
        self.tokens = self.tokens.saturating_add(add).min(self.capacity);
        self.last = now;
    }
}
