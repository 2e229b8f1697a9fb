use async_trait::async_trait;
use tokio::time::Instant;

/// Time source for the scheduling loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep_until(&self, deadline: Instant);
}

/// [`Clock`] backed by tokio's timer, which honours a paused test runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}
