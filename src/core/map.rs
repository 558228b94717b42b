use std::{future::Future, time::Duration};

/// How long the planner waits for the map provider before giving up.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map provider did not initialise within {0:?}")]
    Timeout(Duration),
    #[error("map provider failed to load: {0}")]
    Failed(String),
}

/// External map widget backend. `load` resolves once it is usable.
pub trait MapProvider: Send + Sync {
    fn load(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// A provider that is always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMapProvider;

impl MapProvider for StaticMapProvider {
    async fn load(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Probes a tile or script URL; ready once it answers with a success status.
#[derive(Debug, Clone)]
pub struct HttpMapProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpMapProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl MapProvider for HttpMapProvider {
    async fn load(&self) -> anyhow::Result<()> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapStatus {
    Loading,
    Ready,
    /// Blocking: nothing else works until a reload succeeds.
    Failed(MapError),
}

/// Tracks whether the map is usable.
#[derive(Debug, Clone)]
pub struct MapGate {
    timeout: Duration,
    status: MapStatus,
}

impl MapGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            status: MapStatus::Loading,
        }
    }

    pub fn status(&self) -> &MapStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == MapStatus::Ready
    }

    pub async fn wait<P: MapProvider>(&mut self, provider: &P) -> &MapStatus {
        self.status = match tokio::time::timeout(self.timeout, provider.load()).await {
            Ok(Ok(())) => {
                tracing::info!("Map provider ready");
                MapStatus::Ready
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Map provider failed");
                MapStatus::Failed(MapError::Failed(e.to_string()))
            }
            Err(_) => {
                tracing::error!(timeout = ?self.timeout, "Map provider timed out");
                MapStatus::Failed(MapError::Timeout(self.timeout))
            }
        };
        &self.status
    }

    /// Manual retry after a failure.
    pub async fn reload<P: MapProvider>(&mut self, provider: &P) -> &MapStatus {
        self.wait(provider).await
    }

    pub fn into_result(self) -> Result<(), MapError> {
        match self.status {
            MapStatus::Ready => Ok(()),
            MapStatus::Failed(e) => Err(e),
            MapStatus::Loading => Err(MapError::Timeout(self.timeout)),
        }
    }
}

impl Default for MapGate {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_TIMEOUT)
    }
}
