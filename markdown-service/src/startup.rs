use crate::config::MarkdownConfig;
use crate::handlers;
use crate::services::{Converter, DocumentConverter};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: MarkdownConfig,
    pub converter: Arc<dyn Converter>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: MarkdownConfig) -> Result<Self, AppError> {
        Self::build_with_converter(config, Arc::new(DocumentConverter::new())).await
    }

    /// Like [`build`](Self::build), with the conversion engine supplied by
    /// the caller.
    pub async fn build_with_converter(
        config: MarkdownConfig,
        converter: Arc<dyn Converter>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            converter,
        };

        let app = Router::new()
            .route("/", get(handlers::root))
            .route("/convert", post(handlers::convert_document))
            // The handler enforces the real limit so the client gets a 400
            // naming it; the body limit only caps multipart framing overhead.
            .layer(DefaultBodyLimit::max(
                config.upload.max_size_bytes * 2 + 64 * 1024,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.security.allowed_origins))
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Skipping invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
