//! Cancellation primitives shared between request owners and providers.
//!
//! A [`CancellationSource`] is held by whoever started a request and is the
//! only handle able to cancel it. Providers receive a [`CancellationToken`],
//! which can be polled, awaited or subscribed to but never cancelled.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken as Signal;

type Callback = Box<dyn FnOnce() + Send>;

struct Shared {
    signal: Signal,
    callbacks: Mutex<Vec<Callback>>,
}

/// Owner side of a cancellable operation.
///
/// Cancellation is monotonic: once [`cancel`](Self::cancel) has been called
/// every token stays cancelled for good.
///
/// # Examples
///
/// ```
/// use langhub_core::cancellation::CancellationSource;
///
/// let source = CancellationSource::new();
/// let token = source.token();
/// assert!(!token.is_cancelled());
///
/// source.cancel();
/// assert!(token.is_cancelled());
/// ```
pub struct CancellationSource {
    shared: Arc<Shared>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                signal: Signal::new(),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns a read-only token observing this source.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            shared: Some(Arc::clone(&self.shared)),
        }
    }

    /// Cancels the operation.
    ///
    /// Subscribed callbacks run once, synchronously, in subscription order.
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.shared.signal.cancel();
        let callbacks = {
            let mut guard = self
                .shared
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.signal.is_cancelled()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSource")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Read-only view of a [`CancellationSource`].
#[derive(Clone)]
pub struct CancellationToken {
    shared: Option<Arc<Shared>>,
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        Self { shared: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|shared| shared.signal.is_cancelled())
    }

    /// Completes once the owning source is cancelled.
    ///
    /// Never completes for [`CancellationToken::none`].
    pub async fn cancelled(&self) {
        match &self.shared {
            Some(shared) => shared.signal.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    }

    /// Registers a callback to run on cancellation.
    ///
    /// If the token is already cancelled the callback runs immediately.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(shared) = &self.shared else {
            return;
        };

        {
            let mut guard = shared
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !shared.signal.is_cancelled() {
                guard.push(Box::new(callback));
                return;
            }
        }

        callback();
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
