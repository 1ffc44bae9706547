//! Registry - scheme to constructor lookup
//!
//! Decouples which delivery targets exist from how the dispatcher fans out
//! to them. Targets register a constructor under a URI scheme; the
//! dispatcher resolves URIs without knowing any concrete target type.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, instrument};
use url::Url;

use contracts::{BroadcastError, Broadcaster};

/// Future returned by a [`Constructor`]
pub type ConstructorFuture = BoxFuture<'static, Result<Arc<dyn Broadcaster>, BroadcastError>>;

/// Builds a broadcaster from its full URI
pub type Constructor = Arc<dyn Fn(Url) -> ConstructorFuture + Send + Sync>;

/// Scheme to constructor table
///
/// Append-only: a scheme is registered at most once and never removed.
/// Lookups and registration may run concurrently from any thread. An empty
/// registry holds no allocation until the first registration.
#[derive(Default)]
pub struct Registry {
    constructors: RwLock<BTreeMap<String, Constructor>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in targets
    pub fn with_defaults() -> Result<Self, BroadcastError> {
        let registry = Self::new();
        crate::targets::register_defaults(&registry)?;
        Ok(registry)
    }

    /// Register `constructor` under `scheme`
    ///
    /// The scheme is matched case-insensitively and may carry a trailing `://`.
    ///
    /// # Errors
    /// - `DuplicateScheme` if the scheme is already registered
    /// - `InvalidUri` if the scheme is empty
    pub fn register<F, Fut>(&self, scheme: &str, constructor: F) -> Result<(), BroadcastError>
    where
        F: Fn(Url) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn Broadcaster>, BroadcastError>> + Send + 'static,
    {
        let key = normalize_scheme(scheme);
        if key.is_empty() {
            return Err(BroadcastError::invalid_uri(scheme, "empty scheme"));
        }
        if !is_valid_scheme(&key) {
            return Err(BroadcastError::invalid_uri(scheme, "malformed scheme"));
        }

        let mut constructors = self.constructors.write();
        if constructors.contains_key(&key) {
            return Err(BroadcastError::DuplicateScheme { scheme: key });
        }

        let constructor: Constructor = Arc::new(move |uri| constructor(uri).boxed());
        debug!(scheme = %key, "Broadcaster scheme registered");
        constructors.insert(key, constructor);
        Ok(())
    }

    /// Whether a constructor is registered for `scheme`
    pub fn contains(&self, scheme: &str) -> bool {
        self.constructors
            .read()
            .contains_key(&normalize_scheme(scheme))
    }

    /// Build the broadcaster addressed by `uri`
    ///
    /// Construction errors are returned unchanged.
    ///
    /// # Errors
    /// - `InvalidUri` if `uri` does not parse
    /// - `UnknownScheme` if no constructor is registered; no constructor runs
    #[instrument(name = "registry_resolve", skip(self))]
    pub async fn resolve(&self, uri: &str) -> Result<Arc<dyn Broadcaster>, BroadcastError> {
        let parsed = Url::parse(uri).map_err(|e| BroadcastError::invalid_uri(uri, e.to_string()))?;

        let constructor = self
            .constructors
            .read()
            .get(parsed.scheme())
            .cloned()
            .ok_or_else(|| BroadcastError::UnknownScheme {
                scheme: parsed.scheme().to_string(),
            })?;

        constructor(parsed).await
    }

    /// Every registered scheme as `<scheme>://`, sorted
    pub fn schemes(&self) -> Vec<String> {
        self.constructors
            .read()
            .keys()
            .map(|scheme| format!("{scheme}://"))
            .collect()
    }
}

fn normalize_scheme(scheme: &str) -> String {
    scheme.trim().trim_end_matches("://").to_ascii_lowercase()
}

/// RFC 3986 scheme syntax; a scheme `Url::parse` cannot produce would never resolve
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::NullBroadcaster;
    use contracts::{CancelToken, DeliveryId, Logger, Message};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Broadcaster that reports the scheme it was built for
    struct TaggedBroadcaster {
        tag: String,
    }

    #[async_trait::async_trait]
    impl Broadcaster for TaggedBroadcaster {
        fn name(&self) -> &str {
            &self.tag
        }

        async fn broadcast_message(
            &self,
            _cancel: &CancelToken,
            _message: &Message,
        ) -> Result<DeliveryId, BroadcastError> {
            Ok(DeliveryId::text(&self.tag))
        }

        async fn set_logger(&self, _cancel: &CancelToken, _logger: Logger) -> Result<(), BroadcastError> {
            Ok(())
        }
    }

    fn tagged(tag: &'static str) -> impl Fn(Url) -> futures::future::Ready<Result<Arc<dyn Broadcaster>, BroadcastError>> {
        move |_uri| {
            let broadcaster: Arc<dyn Broadcaster> = Arc::new(TaggedBroadcaster { tag: tag.to_string() });
            futures::future::ready(Ok(broadcaster))
        }
    }

    #[test]
    fn test_empty_registry_lists_nothing() {
        let registry = Registry::new();
        assert!(registry.schemes().is_empty());
    }

    #[test]
    fn test_duplicate_scheme_is_rejected_case_insensitively() {
        let registry = Registry::new();
        registry.register("alpha", tagged("first")).unwrap();

        let err = registry.register("ALPHA://", tagged("second")).unwrap_err();
        assert!(matches!(err, BroadcastError::DuplicateScheme { ref scheme } if scheme == "alpha"));
    }

    #[test]
    fn test_empty_scheme_is_rejected() {
        let registry = Registry::new();
        let err = registry.register("://", tagged("x")).unwrap_err();
        assert!(matches!(err, BroadcastError::InvalidUri { .. }));
    }

    #[test]
    fn test_malformed_scheme_is_rejected() {
        let registry = Registry::new();
        for scheme in ["my_scheme", "1udp", "ud p", "-x"] {
            let err = registry.register(scheme, tagged("x")).unwrap_err();
            assert!(matches!(err, BroadcastError::InvalidUri { .. }), "{scheme}");
        }
        assert!(registry.schemes().is_empty());

        registry.register("git+ssh", tagged("x")).unwrap();
        registry.register("x-v1.2", tagged("y")).unwrap();
        assert!(registry.contains("GIT+SSH"));
    }

    #[tokio::test]
    async fn test_resolve_picks_matching_constructor() {
        let registry = Registry::new();
        registry.register("alpha", tagged("alpha-target")).unwrap();
        registry.register("beta", tagged("beta-target")).unwrap();

        let alpha = registry.resolve("alpha://").await.unwrap();
        let beta = registry.resolve("BETA://?x=1").await.unwrap();

        assert_eq!(alpha.name(), "alpha-target");
        assert_eq!(beta.name(), "beta-target");
    }

    #[tokio::test]
    async fn test_unknown_scheme_never_invokes_a_constructor() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry
            .register("known", move |_uri| {
                counter.fetch_add(1, Ordering::SeqCst);
                let broadcaster: Arc<dyn Broadcaster> = Arc::new(NullBroadcaster::new());
                futures::future::ready(Ok(broadcaster))
            })
            .unwrap();

        let err = registry.resolve("unknown://").await.err().unwrap();
        assert!(matches!(err, BroadcastError::UnknownScheme { ref scheme } if scheme == "unknown"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_construction_error_surfaces_unchanged() {
        let registry = Registry::new();
        registry
            .register("broken", |uri: Url| async move {
                Err::<Arc<dyn Broadcaster>, _>(BroadcastError::construction(
                    uri.as_str(),
                    "missing ?credentials= parameter",
                ))
            })
            .unwrap();

        let err = registry.resolve("broken://").await.err().unwrap();
        assert!(err.to_string().contains("missing ?credentials= parameter"));
    }

    #[tokio::test]
    async fn test_invalid_uri_is_reported() {
        let registry = Registry::new();
        let err = registry.resolve("not a uri").await.err().unwrap();
        assert!(matches!(err, BroadcastError::InvalidUri { .. }));
    }

    #[test]
    fn test_schemes_are_sorted_with_suffix() {
        let registry = Registry::new();
        registry.register("zeta", tagged("z")).unwrap();
        registry.register("Alpha", tagged("a")).unwrap();

        assert_eq!(registry.schemes(), vec!["alpha://", "zeta://"]);
        assert!(registry.contains("ZETA"));
    }
}
