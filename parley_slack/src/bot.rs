use std::sync::Arc;

use parley_conversation::ChatService;
use tracing::info;

use crate::{Result, SlackClient, verify};

/// Shared state of the Slack endpoints
#[derive(Clone)]
pub struct SlackBot {
    /// Web API client for replies and thread history
    pub client: SlackClient,
    /// Conversations, turn taking and storage
    pub chat: Arc<ChatService>,
    signing_secret: Arc<str>,
    chunk_limit: usize,
}

impl SlackBot {
    #[must_use]
    pub fn new(
        client: SlackClient,
        chat: Arc<ChatService>,
        signing_secret: &str,
        chunk_limit: usize,
    ) -> Self {
        Self {
            client,
            chat,
            signing_secret: Arc::from(signing_secret),
            chunk_limit: chunk_limit.max(1),
        }
    }

    #[must_use]
    pub const fn chunk_limit(&self) -> usize {
        self.chunk_limit
    }

    /// Verify a request against the signing secret at the current time.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature: &str) -> Result<()> {
        verify::verify_request(
            self.signing_secret.as_bytes(),
            timestamp,
            body,
            signature,
            chrono::Utc::now().timestamp(),
        )
    }

    /// Serve the endpoints on `listen` until Ctrl-C or SIGTERM.
    pub async fn run(self, listen: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(listen).await?;
        info!("Slack endpoints listening on {}", listener.local_addr()?);

        axum::serve(listener, crate::router(self))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Slack server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
