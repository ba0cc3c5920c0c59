use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Lifetime of one rendered page.
///
/// Work started through [`PageScope::run`] yields `None` once the scope is
/// cancelled, including when the result arrives after cancellation. Dropping
/// the scope cancels it, so a request that goes away never applies a late
/// backend response.
#[derive(Debug, Default)]
pub struct PageScope {
    token: CancellationToken,
}

impl PageScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for work that must stop with the page, e.g. a camera scan.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Handle that can cancel this scope from elsewhere.
    pub fn canceller(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn run<F, T>(&self, work: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            output = work => (!self.token.is_cancelled()).then_some(output),
        }
    }
}

impl Drop for PageScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
