//! Service wiring and lifecycle.

use crate::authority::TokenAuthority;
use crate::config::{Config, LedgerBackend, NotifierKind};
use crate::directory::{MemoryDirectory, PostgresDirectory, UserDirectory, seed_demo_users};
use crate::error::SessionError;
use crate::http::{self, AppState};
use crate::notify::{AnomalyNotifier, LogNotifier, WebhookNotifier};
use crate::storage::{MemoryLedger, PostgresLedger, RedisLedger, RefreshLedger};
use rust_common::{RetryConfig, RetryPolicy};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

async fn open_stores(config: &Config) -> Result<(Arc<dyn RefreshLedger>, Arc<dyn UserDirectory>), SessionError> {
    match &config.ledger {
        LedgerBackend::Memory => Ok((Arc::new(MemoryLedger::new()), Arc::new(MemoryDirectory::new()))),
        LedgerBackend::Postgres { url } => {
            let ledger = PostgresLedger::connect(url).await?;
            ledger.migrate().await?;
            let directory = PostgresDirectory::new(ledger.pool().clone());
            directory.migrate().await?;
            info!("Using PostgreSQL ledger and user directory");
            Ok((Arc::new(ledger), Arc::new(directory)))
        }
        LedgerBackend::Redis { url } => {
            let ledger = RedisLedger::new(url).await?;
            info!("Using Redis ledger with in-memory user directory");
            Ok((Arc::new(ledger), Arc::new(MemoryDirectory::new())))
        }
    }
}

fn build_notifier(config: &Config) -> Result<Arc<dyn AnomalyNotifier>, SessionError> {
    match &config.notifier {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Webhook { url } => {
            let notifier = WebhookNotifier::new(
                url.clone(),
                config.notify_from.clone(),
                RetryPolicy::new(RetryConfig::default()),
            )
            .map_err(|e| SessionError::config(format!("Cannot build webhook client: {e}")))?;
            Ok(Arc::new(notifier))
        }
    }
}

/// Connect stores, seed users and assemble handler state.
///
/// # Errors
///
/// Returns an error if a store is unreachable or configuration is unusable.
pub async fn build_state(config: &Config) -> Result<AppState, SessionError> {
    let (ledger, directory) = open_stores(config).await?;
    if config.seed_demo_users {
        seed_demo_users(directory.as_ref()).await?;
    }

    let authority = TokenAuthority::new(config, ledger, Arc::clone(&directory), build_notifier(config)?)?;

    Ok(AppState {
        sessions: Arc::new(authority),
        directory,
        access_ttl: config.access_token_ttl,
        trust_forwarded_for: config.trust_forwarded_for,
    })
}

/// Serve until SIGINT/SIGTERM, then drain in-flight requests for at most
/// `shutdown_timeout`.
///
/// # Errors
///
/// Returns an error if startup fails or the listener dies.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let listener = TcpListener::bind(config.listen_address()).await?;
    info!(
        address = %listener.local_addr()?,
        algorithm = config.jwt_algorithm.as_str(),
        "Session service listening"
    );

    let stop = Arc::new(Notify::new());
    let stopped = Arc::clone(&stop);
    let app = http::router(state).into_make_service_with_connect_info::<SocketAddr>();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stopped.notified().await })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            result??;
            info!("Server stopped normally");
            return Ok(());
        }
        () = wait_for_signal() => {}
    }

    stop.notify_one();
    match tokio::time::timeout(config.shutdown_timeout, server).await {
        Ok(result) => {
            result??;
            info!("Shutdown complete");
        }
        Err(_) => warn!("Shutdown timeout reached, dropping in-flight requests"),
    }
    Ok(())
}

/// Waits for SIGTERM or SIGINT.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HashCost, SigningSecret};
    use crate::directory::DEMO_USER_ID;

    #[tokio::test]
    async fn test_memory_state_is_seeded() {
        let config = Config::new(SigningSecret::new(b"server-test".to_vec())).with_hash_cost(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        });

        let state = build_state(&config).await.unwrap();
        assert!(state.directory.find_by_id(DEMO_USER_ID).await.unwrap().is_some());
        assert_eq!(state.access_ttl, config.access_token_ttl);
    }

    #[test]
    fn test_webhook_notifier_builds() {
        let mut config = Config::new(SigningSecret::new(b"server-test".to_vec()));
        config.notifier = NotifierKind::Webhook {
            url: "http://127.0.0.1:9/hook".parse().unwrap(),
        };
        assert!(build_notifier(&config).is_ok());
    }
}
