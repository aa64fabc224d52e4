//! Single-flight request coordination with cancellation and timeouts.
//!
//! Every request runs under a context key. Starting a request cancels the
//! one already in flight for the same key, and a request whose token was
//! cancelled never surfaces its result, even if the provider answered.

use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::provider::Capability;

/// Default context key: one capability within one editor scope (buffer or window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub capability: Capability,
    pub scope: u64,
}

impl RequestKey {
    pub fn new(capability: Capability, scope: u64) -> Self {
        Self { capability, scope }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.capability, self.scope)
    }
}

/// How a coordinated request ended.
///
/// Neither a timeout nor a cancellation is an error: both mean "no answer".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome<T> {
    Completed(T),
    TimedOut,
    Cancelled,
}

impl<T> RequestOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut | Self::Cancelled => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        match self {
            Self::Completed(value) => RequestOutcome::Completed(f(value)),
            Self::TimedOut => RequestOutcome::TimedOut,
            Self::Cancelled => RequestOutcome::Cancelled,
        }
    }
}

struct InFlight {
    generation: u64,
    source: Arc<CancellationSource>,
}

/// Clears the entry of one `run` call when it finishes or is dropped.
struct InFlightGuard<'a, K: Eq + Hash> {
    in_flight: &'a DashMap<K, InFlight>,
    key: &'a K,
    generation: u64,
    source: &'a CancellationSource,
    finished: bool,
}

impl<K: Eq + Hash> Drop for InFlightGuard<'_, K> {
    fn drop(&mut self) {
        if !self.finished {
            self.source.cancel();
        }
        self.in_flight
            .remove_if(self.key, |_, entry| entry.generation == self.generation);
    }
}

/// Tracks at most one in-flight request per context key.
///
/// # Examples
///
/// ```
/// use langhub_core::coordinator::{RequestCoordinator, RequestKey, RequestOutcome};
/// use langhub_core::provider::Capability;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let coordinator = RequestCoordinator::new();
/// let key = RequestKey::new(Capability::DocumentHighlight, 1);
///
/// let outcome = coordinator
///     .run(key, Duration::from_millis(300), |_token| async { 42 })
///     .await;
/// assert_eq!(outcome, RequestOutcome::Completed(42));
/// # }
/// ```
pub struct RequestCoordinator<K = RequestKey> {
    in_flight: DashMap<K, InFlight>,
    generation: AtomicU64,
}

impl<K> RequestCoordinator<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Runs `operation` as the only in-flight request for `key`.
    ///
    /// Any previous request under the same key is cancelled first. The
    /// operation receives a fresh token; if `timeout` elapses first the token
    /// is cancelled and the call yields [`RequestOutcome::TimedOut`]. The
    /// losing future is dropped in every case.
    pub async fn run<T, F, Fut>(&self, key: K, timeout: Duration, operation: F) -> RequestOutcome<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let source = Arc::new(CancellationSource::new());
        let token = source.token();

        let previous = self.in_flight.insert(
            key.clone(),
            InFlight {
                generation,
                source: Arc::clone(&source),
            },
        );
        if let Some(previous) = previous {
            tracing::trace!("superseding in-flight request {:?}", key);
            previous.source.cancel();
        }
        let mut guard = InFlightGuard {
            in_flight: &self.in_flight,
            key: &key,
            generation,
            source: &source,
            finished: false,
        };

        let outcome = tokio::select! {
            biased;

            () = token.cancelled() => RequestOutcome::Cancelled,
            result = operation(token.clone()) => {
                if token.is_cancelled() {
                    RequestOutcome::Cancelled
                } else {
                    RequestOutcome::Completed(result)
                }
            }
            () = tokio::time::sleep(timeout) => {
                source.cancel();
                RequestOutcome::TimedOut
            }
        };
        guard.finished = true;
        drop(guard);

        match &outcome {
            RequestOutcome::TimedOut => {
                tracing::warn!("request {:?} timed out after {:?}", key, timeout);
            }
            RequestOutcome::Cancelled => {
                tracing::trace!("request {:?} cancelled", key);
            }
            RequestOutcome::Completed(_) => {}
        }

        outcome
    }

    /// Cancels the request in flight for `key`, if any.
    pub fn cancel(&self, key: &K) -> bool {
        match self.in_flight.remove(key) {
            Some((_, entry)) => {
                entry.source.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let keys: Vec<K> = self.in_flight.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl<K> Default for RequestCoordinator<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Races `future` against a single-shot timer.
///
/// First completion wins. When the timer wins, `source` is cancelled and the
/// future is dropped.
pub async fn race_deadline<F>(
    future: F,
    timeout: Duration,
    source: &CancellationSource,
) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;

        output = future => Some(output),
        () = tokio::time::sleep(timeout) => {
            source.cancel();
            None
        }
    }
}
