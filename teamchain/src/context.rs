// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Per-operation context which is passed by reference through every collaborator call.
///
/// Carries the tracing span all log output of the operation is attached to and a cancellation
/// token. Cancelling the token makes a running commit stop at its next step. Requesting a
/// downgrade lease is never interrupted, once granted the lease is released before the commit
/// returns.
#[derive(Clone, Debug)]
pub struct Context {
    span: Span,
    cancel: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self {
            span: Span::current(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach all log output of operations using this context to the given span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Use an externally owned cancellation token, for example one shared by all operations of
    /// a request.
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive the future to completion unless this context gets cancelled first.
    ///
    /// An already cancelled context never polls the future.
    pub async fn run_until_cancelled<F>(&self, future: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            output = future => Ok(output),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{Cancelled, Context};

    #[tokio::test]
    async fn run_until_cancelled() {
        let ctx = Context::new();
        assert_matches!(ctx.run_until_cancelled(async { 42 }).await, Ok(42));

        let child = ctx.clone();
        ctx.cancel();
        assert!(child.is_cancelled());
        assert_matches!(
            child.run_until_cancelled(async { 42 }).await,
            Err(Cancelled)
        );
    }
}
