//! Server lifecycle
//!
//! Binds the listener, runs the auto-capture loop next to the HTTP server and
//! tears both down on shutdown: live streams are ended, the loop is signalled
//! and awaited, and the camera is released last.

use crate::routes::router;
use crate::state::AppState;
use moonbot_core::{MoonbotError, MoonbotResult};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{error, info};

/// HTTP camera control server
#[derive(Debug, Clone)]
pub struct MoonbotServer {
    state: AppState,
}

impl MoonbotServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> MoonbotResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.state.config.bind_addr;
        let listener =
            TcpListener::bind(address)
                .await
                .map_err(|e| MoonbotError::ServerStartFailed {
                    address,
                    source: e.into(),
                })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> MoonbotResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        info!("MoonBot listening on http://{}", local);
        info!("Live stream: http://{}/video", local);

        let auto_capture = self.state.auto_capture.clone();
        let auto_shutdown = self.state.shutdown_receiver();
        let auto_task = tokio::spawn(async move { auto_capture.run(auto_shutdown).await });

        let state = self.state.clone();
        let result = axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutdown requested");
                // Ends open streams so graceful shutdown is not held up by them
                state.begin_shutdown();
            })
            .await;

        self.state.begin_shutdown();
        if let Err(e) = auto_task.await {
            error!(error = %e, "Auto-capture task ended abnormally");
        }
        self.state.gateway.close().await;
        info!("MoonBot server stopped");

        result.map_err(MoonbotError::from)
    }
}
