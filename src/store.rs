//! Lazily loaded dictionary store.
//!
//! The store moves through `Unloaded -> Loading -> Ready | Failed` once per
//! session. Lookups made before it is ready, or after it failed, simply miss.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::data::{DictionaryTables, Hit, TablesBuilder, decode_resource};
use crate::error::DictionaryLoadError;
use crate::profile::DEFAULT_FETCH_TIMEOUT;

/// Where dictionary resources come from.
#[async_trait]
pub trait DictionarySource: Send + Sync {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, DictionaryLoadError>;
}

/// Reads resources relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    base: PathBuf,
}

impl FileSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl DictionarySource for FileSource {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, DictionaryLoadError> {
        let path = self.base.join(resource);
        debug!(path = %path.display(), "reading dictionary resource");
        tokio::fs::read(&path)
            .await
            .map_err(|source| DictionaryLoadError::Io {
                resource: resource.to_string(),
                source,
            })
    }
}

/// Fetches resources relative to a base URL.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: url::Url,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new(base: &str) -> Result<Self, DictionaryLoadError> {
        let base = url::Url::parse(base).map_err(|err| DictionaryLoadError::Location {
            resource: base.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            base,
            client: reqwest::Client::new(),
        })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl DictionarySource for HttpSource {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, DictionaryLoadError> {
        let url = self
            .base
            .join(resource)
            .map_err(|err| DictionaryLoadError::Location {
                resource: resource.to_string(),
                message: err.to_string(),
            })?;
        let network = |err: reqwest::Error| DictionaryLoadError::Network {
            resource: resource.to_string(),
            message: err.to_string(),
        };
        debug!(%url, "fetching dictionary resource");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(network)?
            .error_for_status()
            .map_err(network)?;
        let bytes = response.bytes().await.map_err(network)?;
        Ok(bytes.to_vec())
    }
}

/// Externally observable store state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

enum StoreState {
    Unloaded,
    Loading,
    Ready(Arc<DictionaryTables>),
    Failed(Arc<DictionaryLoadError>),
}

impl StoreState {
    fn observe(&self) -> LoadState {
        match self {
            StoreState::Unloaded => LoadState::Unloaded,
            StoreState::Loading => LoadState::Loading,
            StoreState::Ready(_) => LoadState::Ready,
            StoreState::Failed(_) => LoadState::Failed,
        }
    }
}

struct StoreShared {
    state: RwLock<StoreState>,
    source: Option<Arc<dyn DictionarySource>>,
    resources: Vec<String>,
    timeout: Duration,
}

/// Cloneable handle to one dictionary store.
#[derive(Clone)]
pub struct DictionaryStore {
    shared: Arc<StoreShared>,
}

impl std::fmt::Debug for DictionaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryStore")
            .field("state", &self.state())
            .field("resources", &self.shared.resources)
            .finish()
    }
}

impl DictionaryStore {
    pub fn new(
        source: Arc<dyn DictionarySource>,
        resources: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self::with_state(StoreState::Unloaded, Some(source), resources, timeout)
    }

    /// A store that is already `Ready`; `ensure_loaded` never fetches.
    pub fn preloaded(tables: DictionaryTables) -> Self {
        Self::with_state(
            StoreState::Ready(Arc::new(tables)),
            None,
            Vec::new(),
            DEFAULT_FETCH_TIMEOUT,
        )
    }

    fn with_state(
        state: StoreState,
        source: Option<Arc<dyn DictionarySource>>,
        resources: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(StoreShared {
                state: RwLock::new(state),
                source,
                resources,
                timeout,
            }),
        }
    }

    pub fn state(&self) -> LoadState {
        self.shared.state.read().observe()
    }

    pub fn last_error(&self) -> Option<Arc<DictionaryLoadError>> {
        match &*self.shared.state.read() {
            StoreState::Failed(err) => Some(Arc::clone(err)),
            _ => None,
        }
    }

    /// Current tables, if loaded. Always re-read at call time.
    pub fn tables(&self) -> Option<Arc<DictionaryTables>> {
        match &*self.shared.state.read() {
            StoreState::Ready(tables) => Some(Arc::clone(tables)),
            _ => None,
        }
    }

    /// Primary table first, fallback for single characters; `None` until ready.
    pub fn lookup(&self, sequence: &str) -> Option<Hit> {
        self.tables().and_then(|tables| tables.lookup(sequence))
    }

    /// Loads the tables the first time it is called.
    ///
    /// A call while loading, or after the load settled, returns the current
    /// state without doing any work.
    pub async fn ensure_loaded(&self) -> LoadState {
        {
            let mut guard = self.shared.state.write();
            if !matches!(*guard, StoreState::Unloaded) {
                return guard.observe();
            }
            *guard = StoreState::Loading;
        }

        let outcome = match tokio::time::timeout(self.shared.timeout, self.fetch_all()).await {
            Ok(result) => result,
            Err(_) => Err(DictionaryLoadError::Timeout {
                after: self.shared.timeout,
            }),
        };
        self.settle(outcome)
    }

    /// Records a failure that happened before any fetch could start.
    pub(crate) fn fail(&self, err: DictionaryLoadError) -> LoadState {
        {
            let mut guard = self.shared.state.write();
            if !matches!(*guard, StoreState::Unloaded) {
                return guard.observe();
            }
            *guard = StoreState::Loading;
        }
        self.settle(Err(err))
    }

    fn settle(&self, outcome: Result<DictionaryTables, DictionaryLoadError>) -> LoadState {
        let mut guard = self.shared.state.write();
        *guard = match outcome {
            Ok(tables) => {
                info!(
                    primary = tables.primary_len(),
                    fallback = tables.fallback_len(),
                    "dictionary ready"
                );
                StoreState::Ready(Arc::new(tables))
            }
            Err(err) => {
                warn!(error = %err, "dictionary load failed");
                StoreState::Failed(Arc::new(err))
            }
        };
        guard.observe()
    }

    async fn fetch_all(&self) -> Result<DictionaryTables, DictionaryLoadError> {
        let mut builder = TablesBuilder::new();
        if let Some(source) = &self.shared.source {
            for resource in &self.shared.resources {
                let bytes = source.fetch(resource).await?;
                let (primary, fallback) = decode_resource(resource, &bytes)?;
                debug!(
                    resource = %resource,
                    primary = primary.len(),
                    fallback = fallback.len(),
                    "decoded dictionary resource"
                );
                builder.merge(primary, fallback);
            }
        }
        builder.finish()
    }
}
