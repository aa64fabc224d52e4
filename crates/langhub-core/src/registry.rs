use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tower_lsp_server::ls_types::CodeActionKind;

use crate::selector::{DocumentIdentity, DocumentSelector};

/// Stable identity of a single registration.
///
/// Identities are allocated in increasing order, so comparing two ids
/// compares their registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability-specific data attached to a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Display name used in logs (usually the contributing extension)
    pub name: Option<String>,
    /// Characters that trigger signature help
    pub trigger_characters: Vec<String>,
    /// Characters that re-trigger signature help while it is shown
    pub retrigger_characters: Vec<String>,
    /// Code action kinds the provider can return; empty means "any"
    pub provided_kinds: Vec<CodeActionKind>,
}

impl ProviderMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn trigger_characters<I, S>(mut self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_characters = characters.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn retrigger_characters<I, S>(mut self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retrigger_characters = characters.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn provided_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = CodeActionKind>,
    {
        self.provided_kinds = kinds.into_iter().collect();
        self
    }
}

/// A provider together with its selector, priority and metadata.
pub struct RegisteredProvider<P: ?Sized> {
    pub id: RegistrationId,
    pub selector: DocumentSelector,
    pub provider: Arc<P>,
    pub priority: i32,
    pub metadata: ProviderMetadata,
}

impl<P: ?Sized> RegisteredProvider<P> {
    /// Name for log output, falling back to the registration id.
    pub fn display_name(&self) -> String {
        self.metadata
            .name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

impl<P: ?Sized> fmt::Debug for RegisteredProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("id", &self.id)
            .field("selector", &self.selector)
            .field("priority", &self.priority)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

trait Deregister: Send + Sync {
    fn deregister(&self, id: RegistrationId);
}

struct Inner<P: ?Sized> {
    entries: DashMap<RegistrationId, Arc<RegisteredProvider<P>>>,
    next_id: AtomicU64,
}

impl<P> Deregister for Inner<P>
where
    P: ?Sized + Send + Sync,
{
    fn deregister(&self, id: RegistrationId) {
        if self.entries.remove(&id).is_some() {
            tracing::debug!("provider {} deregistered", id);
        }
    }
}

/// Handle returned by [`ProviderRegistry::register`].
///
/// Dropping the handle keeps the registration alive; call
/// [`dispose`](Self::dispose) to remove it.
#[must_use = "dropping a Disposable leaves the provider registered"]
pub struct Disposable {
    id: RegistrationId,
    registry: Weak<dyn Deregister>,
    disposed: AtomicBool,
}

impl Disposable {
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Removes the registration. Idempotent.
    ///
    /// Calls already dispatched to the provider are not aborted here; that is
    /// driven by the cancellation token handed to the provider.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Registry of providers for one capability.
///
/// Each capability gets its own explicitly constructed registry; there is no
/// process-wide table. Lookups are thread-safe and never block on provider
/// calls, since providers are handed out as `Arc` clones.
///
/// # Examples
///
/// ```
/// use langhub_core::registry::ProviderRegistry;
/// use langhub_core::selector::{DocumentIdentity, DocumentSelector};
/// use std::str::FromStr;
/// use std::sync::Arc;
/// use tower_lsp_server::ls_types::Uri;
///
/// let registry: ProviderRegistry<str> = ProviderRegistry::new();
/// let _low = registry.register(DocumentSelector::language("rust"), Arc::from("low"), 1);
/// let _high = registry.register(DocumentSelector::language("rust"), Arc::from("high"), 5);
///
/// let doc = DocumentIdentity::new(Uri::from_str("file:///main.rs").unwrap(), "rust");
/// assert_eq!(&*registry.resolve_one(&doc).unwrap().provider, "high");
/// ```
pub struct ProviderRegistry<P: ?Sized> {
    inner: Arc<Inner<P>>,
}

impl<P> ProviderRegistry<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a provider with default metadata.
    pub fn register(&self, selector: DocumentSelector, provider: Arc<P>, priority: i32) -> Disposable {
        self.register_with(selector, provider, priority, ProviderMetadata::default())
    }

    /// Registers a provider.
    ///
    /// Safe to call at any time, including before any matching document exists.
    pub fn register_with(
        &self,
        selector: DocumentSelector,
        provider: Arc<P>,
        priority: i32,
        metadata: ProviderMetadata,
    ) -> Disposable {
        let id = RegistrationId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));

        tracing::debug!(
            "provider {} registered: priority={}, name={:?}",
            id,
            priority,
            metadata.name
        );

        self.inner.entries.insert(
            id,
            Arc::new(RegisteredProvider {
                id,
                selector,
                provider,
                priority,
                metadata,
            }),
        );

        let inner: Arc<dyn Deregister> = self.inner.clone();
        let registry = Arc::downgrade(&inner);
        Disposable {
            id,
            registry,
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns every matching registration, best first.
    ///
    /// Order: priority (desc), then selector score (desc), then registration
    /// order (earliest first).
    pub fn resolve(&self, identity: &DocumentIdentity) -> Vec<Arc<RegisteredProvider<P>>> {
        let mut matches: Vec<(u32, Arc<RegisteredProvider<P>>)> = self
            .inner
            .entries
            .iter()
            .filter_map(|entry| {
                let score = entry.selector.score(identity)?;
                Some((score, Arc::clone(entry.value())))
            })
            .collect();

        matches.sort_by(|(score_a, a), (score_b, b)| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| score_b.cmp(score_a))
                .then_with(|| a.id.cmp(&b.id))
        });

        matches.into_iter().map(|(_, provider)| provider).collect()
    }

    /// Best single registration for the document.
    pub fn resolve_one(&self, identity: &DocumentIdentity) -> Option<Arc<RegisteredProvider<P>>> {
        self.resolve(identity).into_iter().next()
    }

    pub fn has_provider(&self, identity: &DocumentIdentity) -> bool {
        self.inner
            .entries
            .iter()
            .any(|entry| entry.selector.matches(identity))
    }

    pub fn get(&self, id: RegistrationId) -> Option<Arc<RegisteredProvider<P>>> {
        self.inner.entries.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl<P> Default for ProviderRegistry<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
