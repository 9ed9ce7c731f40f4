use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{services, state::AppState};
use crate::config::Config;
use crate::conversion::HttpConversionClient;
use crate::processor::PdfProcessor;
use crate::repository::FjallRepository;
use crate::storage::StorageClient;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(services::health))
        .route(
            "/lessons/{lesson_id}/pdf",
            get(services::get_lesson_pdf),
        )
        .route(
            "/lessons/{lesson_id}/pdf/pages",
            get(services::get_lesson_pages),
        )
        .route(
            "/lessons/{lesson_id}/pdf/process",
            post(services::process_lesson),
        )
        .route(
            "/lessons/{lesson_id}/pdf/regenerate",
            post(services::regenerate_pdf),
        )
        .route("/pdf/pending", post(services::process_pending))
        .route("/pdf/retry", post(services::retry_failed))
        .route("/pdf/cleanup", post(services::cleanup_pages))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    info!(path = %config.server.data_path.display(), "Opening fjall store");
    let store = Arc::new(
        FjallRepository::open(&config.server.data_path)
            .map_err(|e| format!("Failed to open fjall store: {}", e))?,
    );

    let storage = StorageClient::from_config(&config.storage)
        .map_err(|e| format!("Failed to initialize storage: {}", e))?;
    info!(provider = ?config.storage.provider, bucket = %storage.bucket, "Storage ready");

    let converter = HttpConversionClient::new(&config.conversion)
        .map_err(|e| format!("Failed to build conversion client: {}", e))?;

    let cancel = CancellationToken::new();
    let processor = Arc::new(PdfProcessor::new(
        store.clone(),
        Arc::new(storage),
        Arc::new(converter),
        config.pipeline.clone(),
        cancel.clone(),
    ));

    let app = router(AppState::new(processor).with_store(store.clone()));

    let listener = TcpListener::bind(config.server.bind_addr).await?;
    info!(address = %config.server.bind_addr, "lessonpdf API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            cancel.cancel();
        })
        .await?;

    store
        .persist()
        .map_err(|e| format!("Failed to flush fjall store: {}", e))?;
    info!("Server stopped");

    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
