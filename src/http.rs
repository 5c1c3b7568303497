mod handler;

use crate::repositories::AuthorRepository;
use crate::services::AuthorService;
use anyhow::Context;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState<AR: AuthorRepository> {
    author_service: Arc<AuthorService<AR>>,
}

impl<AR: AuthorRepository> AppState<AR> {
    pub fn new(author_service: AuthorService<AR>) -> Self {
        Self {
            author_service: Arc::new(author_service),
        }
    }
}

impl<AR: AuthorRepository> Clone for AppState<AR> {
    fn clone(&self) -> Self {
        Self {
            author_service: Arc::clone(&self.author_service),
        }
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<AR: AuthorRepository>(
        state: AppState<AR>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("listening on http://{addr}");
        }

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Received error from running server")?;

        info!("server stopped");
        Ok(())
    }
}

/// The full application: author routes plus request tracing.
pub fn router<AR: AuthorRepository>(state: AppState<AR>) -> Router {
    api_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes<AR: AuthorRepository>() -> Router<AppState<AR>> {
    Router::new()
        .route(
            "/authors/",
            get(handler::list_authors::<AR>).post(handler::create_author::<AR>),
        )
        .route(
            "/authors",
            get(handler::list_authors::<AR>).post(handler::create_author::<AR>),
        )
        .route(
            "/authors/{id}",
            get(handler::find_author::<AR>)
                .put(handler::update_author::<AR>)
                .delete(handler::delete_author::<AR>),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
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

    info!("shutdown signal received");
}
