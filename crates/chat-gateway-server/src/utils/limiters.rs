use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::services::engine::EngineError;

/// Bounds concurrent calls to the answering engine.
#[derive(Clone)]
pub struct Limiters {
    pub engine: Arc<Semaphore>,
    pub acquire_timeout: Duration,
}

impl Limiters {
    pub fn new(cfg: &crate::config::EngineConfig) -> Self {
        Self {
            engine: Arc::new(Semaphore::new(cfg.max_concurrency.max(1))),
            acquire_timeout: Duration::from_millis(cfg.acquire_timeout_ms.max(1)),
        }
    }

    pub async fn acquire_engine(&self) -> Result<(OwnedSemaphorePermit, Duration), EngineError> {
        Self::acquire_timed(self.engine.clone(), self.acquire_timeout, "engine_answer").await
    }

    pub async fn acquire_timed(
        sem: Arc<Semaphore>,
        acquire_timeout: Duration,
        op: &'static str,
    ) -> Result<(OwnedSemaphorePermit, Duration), EngineError> {
        let start = Instant::now();

        let permit = tokio::time::timeout(acquire_timeout, sem.acquire_owned())
            .await
            .map_err(|_| EngineError::Busy(format!("limiter acquire timeout for op={}", op)))?
            .map_err(|_| EngineError::Busy(format!("limiter closed for op={}", op)))?;

        Ok((permit, start.elapsed()))
    }

    pub fn available_engine_permits(&self) -> usize {
        self.engine.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let mut cfg = Settings::defaults().unwrap().engine;
        cfg.max_concurrency = 1;
        cfg.acquire_timeout_ms = 20;
        let limiters = Limiters::new(&cfg);

        let (held, _) = limiters.acquire_engine().await.unwrap();
        assert_eq!(limiters.available_engine_permits(), 0);

        let second = limiters.acquire_engine().await;
        assert!(matches!(second, Err(EngineError::Busy(_))));

        drop(held);
        assert!(limiters.acquire_engine().await.is_ok());
    }
}
