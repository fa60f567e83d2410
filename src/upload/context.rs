//! Outer cancellation and deadline for a session
//!
//! Every network call and backoff sleep of a session runs through
//! [`SessionContext::run`], which races it against the cancellation token
//! and the deadline. Losing the race drops the inner future, aborting the
//! in-flight request.

use super::{Stage, UploadError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-owned cancellation scope for one upload session
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the session `budget` from now
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Abort the session when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this session
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the session was already cancelled or timed out
    pub fn check(&self, stage: Stage) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled { stage });
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(UploadError::DeadlineExceeded { stage })
            }
            _ => Ok(()),
        }
    }

    /// Drive `fut` unless the session is cancelled or its deadline passes first
    pub async fn run<F, T>(&self, stage: Stage, fut: F) -> Result<T, UploadError>
    where
        F: Future<Output = T>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled { stage }),
            _ = deadline => Err(UploadError::DeadlineExceeded { stage }),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_passes_output_through() {
        let ctx = SessionContext::new();
        let value = ctx.run(Stage::Commit, async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_cancelled_before_run() {
        let ctx = SessionContext::new();
        ctx.cancel_token().cancel();

        assert!(matches!(
            ctx.check(Stage::Open),
            Err(UploadError::Cancelled { stage: Stage::Open })
        ));
        let result = ctx.run(Stage::UploadBlock(2), async { 1 }).await;
        assert!(matches!(
            result,
            Err(UploadError::Cancelled {
                stage: Stage::UploadBlock(2)
            })
        ));
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_future() {
        let ctx = SessionContext::new().with_deadline(Duration::from_millis(50));
        let slow = tokio::time::sleep(Duration::from_secs(60));
        let result = ctx.run(Stage::UploadBlock(0), slow).await;
        assert!(matches!(
            result,
            Err(UploadError::DeadlineExceeded {
                stage: Stage::UploadBlock(0)
            })
        ));
        assert!(ctx.check(Stage::Commit).is_err());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_future() {
        let token = CancellationToken::new();
        let ctx = SessionContext::new().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = ctx
            .run(Stage::Commit, tokio::time::sleep(Duration::from_secs(30)))
            .await;
        canceller.await.unwrap();
        assert!(matches!(
            result,
            Err(UploadError::Cancelled {
                stage: Stage::Commit
            })
        ));
    }
}
