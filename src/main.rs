use authors_api::cache::{CacheStore, MemoryCache, RedisCache};
use authors_api::config::Config;
use authors_api::database::{DefaultAuthorRepository, establish_pool};
use authors_api::http::{AppState, HttpServer, HttpServerConfig};
use authors_api::services::AuthorService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authors_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = establish_pool(config.database_url(), config.database_max_connections()).await?;
    let author_repo = DefaultAuthorRepository::new(pool);

    let cache: Arc<dyn CacheStore> = match config.redis_url() {
        Some(url) => {
            info!("caching authors in redis");
            Arc::new(RedisCache::connect(url).await?)
        }
        None => {
            info!("caching authors in process memory");
            Arc::new(MemoryCache::new(config.cache_max_capacity()))
        }
    };

    let author_service = AuthorService::new(author_repo, cache, config.cache_ttl());
    let state = AppState::new(author_service);
    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
