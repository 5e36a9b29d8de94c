//! Test server harness for E2E testing
//!
//! Provides `TestAppServer` for spawning real service instances in tests.

use devops_app::config::Settings;
use devops_app::observability::MetricsRegistry;
use devops_app::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the service in E2E tests.
///
/// Each instance owns its own `MetricsRegistry`, so tests never observe
/// each other's requests.
pub struct TestAppServer {
    addr: SocketAddr,
    settings: Settings,
    metrics: Arc<MetricsRegistry>,
    _handle: JoinHandle<()>,
}

impl TestAppServer {
    /// Spawn a server with default test settings.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn a server with extra `APP_*` variables layered over the test
    /// defaults.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("APP_APP_NAME".to_string(), "devops-app-test".to_string()),
            ("APP_ENV".to_string(), "test".to_string()),
        ]);
        vars.extend(overrides);

        let settings = Settings::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create settings: {}", e))?;

        let metrics = Arc::new(MetricsRegistry::new());
        let state = Arc::new(AppState {
            settings: settings.clone(),
            metrics: metrics.clone(),
        });

        // Build routes using the service's real route builder
        let app = routes::build_routes(state);

        // Bind to random port; settings.port is not used in tests
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            settings,
            metrics,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the server's metrics registry.
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }
}

impl Drop for TestAppServer {
    fn drop(&mut self) {
        // Abort the server task so the port is released when the test ends.
        self._handle.abort();
    }
}
