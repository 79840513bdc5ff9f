//! Suspension between ticks.

use async_trait::async_trait;
use std::time::Duration;

/// Suspends the control loop between ticks. Tests swap in schedulers
/// that return immediately.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock scheduler backed by `tokio::time::sleep`.
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
