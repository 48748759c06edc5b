//! Lazily initialized, key-aware API sessions shared by all callers.

use crate::config::{API_KEY, ConfigStore};
use crate::scraper::{Result, ScraperError, TransportError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Builds an authenticated API client for a key.
///
/// `connect` performs whatever bootstrap the API needs (login, fetching
/// the image configuration, ...). A failure leaves no session behind.
#[async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    type Client: Send + Sync + 'static;

    async fn connect(&self, api_key: &str) -> Result<Self::Client>;
}

/// Observable lifecycle of a provider session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    /// Built for an API key that is no longer configured
    Stale,
}

/// A bootstrapped client together with the key it was built for
#[derive(Debug)]
pub struct ProviderSession<C> {
    api_key: String,
    client: C,
    created_at: DateTime<Utc>,
}

impl<C> ProviderSession<C> {
    pub const fn client(&self) -> &C {
        &self.client
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

enum Slot<C> {
    Uninitialized,
    Ready(Arc<ProviderSession<C>>),
    Stale,
}

impl<C> Slot<C> {
    const fn state(&self) -> SessionState {
        match self {
            Self::Uninitialized => SessionState::Uninitialized,
            Self::Ready(_) => SessionState::Ready,
            Self::Stale => SessionState::Stale,
        }
    }

    /// Ready -> Stale when the session was built for another key
    fn invalidate_if_changed(&mut self, configured_key: &str) -> bool {
        let Self::Ready(session) = self else {
            return false;
        };
        if session.api_key == configured_key {
            return false;
        }
        *self = Self::Stale;
        true
    }
}

/// Owns the single session of one provider.
///
/// The configured API key is re-read on every call; a change makes the
/// current session stale and the next call rebuilds it. Initialization
/// runs under the slot lock, so concurrent first callers share one build
/// and nobody observes a client for the old key after a change.
pub struct SessionManager<F: ClientFactory> {
    provider_id: &'static str,
    factory: F,
    config: Arc<dyn ConfigStore>,
    default_api_key: String,
    slot: Mutex<Slot<F::Client>>,
}

impl<F: ClientFactory> SessionManager<F> {
    pub fn new(
        provider_id: &'static str,
        factory: F,
        config: Arc<dyn ConfigStore>,
        default_api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider_id,
            factory,
            config,
            default_api_key: default_api_key.into(),
            slot: Mutex::new(Slot::Uninitialized),
        }
    }

    pub const fn provider_id(&self) -> &'static str {
        self.provider_id
    }

    /// Configured API key, or the built-in default when unset or blank
    pub fn configured_api_key(&self) -> String {
        self.config
            .get_value(self.provider_id, API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| self.default_api_key.clone())
    }

    /// Current session, building it first if needed
    pub async fn session(&self) -> Result<Arc<ProviderSession<F::Client>>> {
        let api_key = self.configured_api_key();
        let mut slot = self.slot.lock().await;

        if slot.invalidate_if_changed(&api_key) {
            info!("{} API key changed, rebuilding session", self.provider_id);
        }

        match &*slot {
            Slot::Ready(session) => return Ok(Arc::clone(session)),
            Slot::Stale => debug!("replacing stale {} session", self.provider_id),
            Slot::Uninitialized => debug!("initializing {} session", self.provider_id),
        }

        match self.factory.connect(&api_key).await {
            Ok(client) => {
                let session = Arc::new(ProviderSession {
                    api_key,
                    client,
                    created_at: Utc::now(),
                });
                *slot = Slot::Ready(Arc::clone(&session));
                info!("{} session ready", self.provider_id);
                Ok(session)
            }
            Err(e) => {
                error!("could not initialize the {} API: {}", self.provider_id, e);
                *slot = Slot::Uninitialized;
                Err(match e {
                    ScraperError::ScrapeFailure(_) => e,
                    other => TransportError::Bootstrap(other.to_string()).into(),
                })
            }
        }
    }

    /// Re-check the configured key, marking the session stale if it changed
    pub async fn refresh(&self) -> SessionState {
        let api_key = self.configured_api_key();
        let mut slot = self.slot.lock().await;
        if slot.invalidate_if_changed(&api_key) {
            info!("{} API key changed, session marked stale", self.provider_id);
        }
        slot.state()
    }

    /// Drop the session; the next call builds a new one
    pub async fn reset(&self) {
        *self.slot.lock().await = Slot::Uninitialized;
    }
}

/// Process-wide sessions keyed by provider id.
///
/// Providers constructed repeatedly for the same id share one session.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session manager for `provider_id`, created by `create` on first use
    pub fn get_or_create<F, C>(
        &self,
        provider_id: &str,
        create: C,
    ) -> Result<Arc<SessionManager<F>>>
    where
        F: ClientFactory,
        C: FnOnce() -> SessionManager<F>,
    {
        let entry = Arc::clone(
            self.sessions
                .entry(provider_id.to_string())
                .or_insert_with(|| Arc::new(create()) as Arc<dyn Any + Send + Sync>)
                .value(),
        );

        entry.downcast::<SessionManager<F>>().map_err(|_| {
            ScraperError::Config(format!(
                "session for {provider_id} was registered with a different client type"
            ))
        })
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.sessions.contains_key(provider_id)
    }

    pub fn remove(&self, provider_id: &str) -> bool {
        self.sessions.remove(provider_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockConfigStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Factory whose clients are just the key they were built with
    #[derive(Default)]
    struct CountingFactory {
        connects: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ClientFactory for CountingFactory {
        type Client = String;

        async fn connect(&self, api_key: &str) -> Result<String> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Api {
                    status: 401,
                    message: "invalid api key".to_string(),
                }
                .into());
            }
            Ok(format!("client-for-{api_key}"))
        }
    }

    /// Config store whose API key can be swapped from the test
    fn config_with_key(key: Arc<parking_lot::Mutex<Option<String>>>) -> Arc<dyn ConfigStore> {
        let mut mock = MockConfigStore::new();
        mock.expect_get_value()
            .returning(move |_, _| key.lock().clone());
        Arc::new(mock)
    }

    fn manager(
        key: Option<&str>,
    ) -> (
        SessionManager<CountingFactory>,
        Arc<AtomicUsize>,
        Arc<AtomicBool>,
        Arc<parking_lot::Mutex<Option<String>>>,
    ) {
        let factory = CountingFactory::default();
        let connects = Arc::clone(&factory.connects);
        let fail = Arc::clone(&factory.fail);
        let key = Arc::new(parking_lot::Mutex::new(key.map(str::to_string)));
        let config = config_with_key(Arc::clone(&key));
        (
            SessionManager::new("tvdb", factory, config, "builtin"),
            connects,
            fail,
            key,
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_builds_once() {
        let (manager, connects, _, _) = manager(Some("k1"));
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.session().await })
            })
            .collect();

        for handle in handles {
            let session = handle.await.unwrap().unwrap();
            assert_eq!(session.client(), "client-for-k1");
        }
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_change_rebuilds_session() {
        let (manager, connects, _, key) = manager(Some("k1"));

        let first = manager.session().await.unwrap();
        assert_eq!(manager.refresh().await, SessionState::Ready);

        *key.lock() = Some("k2".to_string());
        assert_eq!(manager.refresh().await, SessionState::Stale);

        let second = manager.session().await.unwrap();
        assert_eq!(second.client(), "client-for-k2");
        assert_eq!(second.api_key(), "k2");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_key_uses_default() {
        let (manager, _, _, _) = manager(Some("   "));
        let session = manager.session().await.unwrap();
        assert_eq!(session.api_key(), "builtin");
    }

    #[tokio::test]
    async fn test_failed_init_is_retried() {
        let (manager, connects, fail, _) = manager(None);
        fail.store(true, Ordering::SeqCst);

        let err = manager.session().await.unwrap_err();
        assert!(matches!(err, ScraperError::ScrapeFailure(_)));
        assert_eq!(manager.refresh().await, SessionState::Uninitialized);

        fail.store(false, Ordering::SeqCst);
        assert!(manager.session().await.is_ok());
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registry_shares_sessions() {
        let registry = SessionRegistry::new();
        let created = AtomicUsize::new(0);
        let build = || {
            created.fetch_add(1, Ordering::SeqCst);
            manager(Some("k1")).0
        };

        let a = registry.get_or_create("tvdb", build).unwrap();
        let b = registry
            .get_or_create("tvdb", || manager(Some("k1")).0)
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_rejects_other_client_type() {
        struct OtherFactory;

        #[async_trait]
        impl ClientFactory for OtherFactory {
            type Client = u32;

            async fn connect(&self, _api_key: &str) -> Result<u32> {
                Ok(1)
            }
        }

        let registry = SessionRegistry::new();
        registry
            .get_or_create("tvdb", || manager(None).0)
            .unwrap();

        let err = registry
            .get_or_create("tvdb", || {
                SessionManager::new(
                    "tvdb",
                    OtherFactory,
                    Arc::new(MockConfigStore::new()),
                    "",
                )
            })
            .err()
            .unwrap();
        assert!(matches!(err, ScraperError::Config(_)));
    }
}
