use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::presentation::http::{
    handlers::{ChatHandler, DocumentHandler, ReportHandler},
    routes::{chat_routes, document_routes, health_routes, report_routes},
};

/// Multipart framing and the text fields of an upload form.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub struct HttpServer {
    document_handler: Arc<DocumentHandler>,
    chat_handler: Arc<ChatHandler>,
    report_handler: Arc<ReportHandler>,
    max_upload_bytes: usize,
    port: u16,
}

impl HttpServer {
    pub fn new(
        document_handler: Arc<DocumentHandler>,
        chat_handler: Arc<ChatHandler>,
        report_handler: Arc<ReportHandler>,
        max_upload_bytes: usize,
        port: Option<u16>,
    ) -> Self {
        Self {
            document_handler,
            chat_handler,
            report_handler,
            max_upload_bytes,
            port: port.unwrap_or(3000),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(health_routes())
            .merge(document_routes(self.document_handler.clone()))
            .merge(chat_routes(self.chat_handler.clone()))
            .merge(report_routes(self.report_handler.clone()))
            .layer(cors)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(
                self.max_upload_bytes + FORM_OVERHEAD_BYTES,
            ))
            .layer(
                TraceLayer::new_for_http()
                    .on_request(
                        |request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                            tracing::info!(
                                "Received request: {} {}",
                                request.method(),
                                request.uri().path()
                            );
                        },
                    )
                    .on_response(
                        |response: &axum::http::Response<axum::body::Body>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::info!(
                                "Response: {} (took {} ms)",
                                response.status(),
                                latency.as_millis()
                            );
                        },
                    )
                    .on_failure(
                        |error: ServerErrorsFailureClass,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::error!(
                                "Request failed: {:?} (took {} ms)",
                                error,
                                latency.as_millis()
                            );
                        },
                    ),
            )
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
