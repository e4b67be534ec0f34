//! Lifetime bound for the requests a view starts.
//!
//! Each list, detail page and form owns a [`ViewScope`]. When the view is
//! torn down the scope is closed and any response still in flight is
//! discarded instead of being written into the dead view.

use std::future::Future;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("View scope closed");
        }
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drives `fut` to completion unless the scope closes first.
    ///
    /// Returns `None` when the scope was closed before or during the call.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_closed() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn open_scope_yields_output() {
        let scope = ViewScope::new();
        assert_eq!(scope.run(async { 42 }).await, Some(42));
    }

    #[tokio::test]
    async fn closed_scope_skips_the_future() {
        let scope = ViewScope::new();
        scope.close();
        assert!(scope.is_closed());
        assert_eq!(scope.run(async { 42 }).await, None);
    }

    #[tokio::test]
    async fn closing_mid_flight_discards_the_result() {
        let scope = ViewScope::new();
        let closer = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });
        let out = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            })
            .await;
        assert_eq!(out, None);
    }
}
