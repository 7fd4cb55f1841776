use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{ConnectorError, Result};

/// Caller-side controls for one logical call.
///
/// Every suspension point of the call (network round trip, backoff sleep,
/// poll wait) is raced against the cancellation token and the deadline.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Same cancellation, deadline tightened to `deadline` if that is earlier.
    pub(crate) fn narrowed(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    /// Runs `fut` unless the call is canceled or its deadline passes first.
    ///
    /// A losing `fut` is dropped, which releases whatever it holds.
    pub(crate) async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.is_canceled() {
            return Err(ConnectorError::Canceled);
        }
        let canceled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = canceled => Err(ConnectorError::Canceled),
            _ = expired => Err(ConnectorError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use super::CallContext;
    use crate::ConnectorError;

    #[tokio::test]
    async fn completes_when_nothing_interrupts() {
        let value = CallContext::new().guard(async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_future() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());
        let canceler = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let result = ctx.guard(std::future::pending::<()>()).await;
        canceler.await.unwrap();
        assert!(matches!(result, Err(ConnectorError::Canceled)));
    }

    #[tokio::test]
    async fn deadline_interrupts_pending_future() {
        let ctx = CallContext::new().with_deadline(Instant::now() + Duration::from_millis(20));
        let result = ctx.guard(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(ConnectorError::DeadlineExceeded)));
    }

    #[test]
    fn narrowed_keeps_earlier_deadline() {
        let now = Instant::now();
        let early = now + Duration::from_secs(1);
        let late = now + Duration::from_secs(5);
        let ctx = CallContext::new().with_deadline(early);
        assert_eq!(ctx.narrowed(late).deadline(), Some(early));
        assert_eq!(CallContext::new().narrowed(late).deadline(), Some(late));
    }
}
