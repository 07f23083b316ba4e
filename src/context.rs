use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::Result;

/// Deadline and cancellation scope for a single operation.
///
/// Clones share the same cancellation token, so a caller can hold one clone
/// and cancel an `exec` in flight. The deadline is propagated to every socket
/// read and write performed on behalf of the operation; cancellation is
/// observed before each one.
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn with_deadline(deadline: Instant) -> Context {
        Context {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Context {
        Context::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`Error::Cancelled`] once the context has been cancelled.
    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
