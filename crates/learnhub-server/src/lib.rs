pub mod cache;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod problem;
pub mod server;
pub mod tasks;

pub use cache::{CacheStore, CourseCache};
pub use config::{AppConfig, CacheConfig, LoggingConfig, RedisConfig, ServerConfig, TaskConfig};
pub use observability::{apply_logging_level, init_tracing, init_tracing_with};
pub use problem::{PROBLEM_CONTENT_TYPE, problem_response, to_problem};
pub use server::{AppState, LearnhubServer, ServerBuilder, build_app};
pub use tasks::{DeliveryOutcome, TaskDispatcher};

/// Create the shared key-value store from configuration.
///
/// ## Store Modes
///
/// - **Redis disabled**: in-process memory store (single-instance)
/// - **Redis enabled**: connects to Redis; falls back to the memory store if
///   the connection cannot be established at startup
///
/// ## Graceful Degradation
///
/// The server starts and serves traffic even when Redis is unavailable;
/// per-call failures after startup are absorbed inside [`cache::CacheStore`].
pub async fn create_cache_store(cfg: &AppConfig) -> CacheStore {
    use std::time::Duration;

    let cache_enabled = cfg.cache.enabled;

    if !cfg.redis.enabled {
        tracing::info!("Redis disabled, using in-process store");
        return CacheStore::memory(cache_enabled);
    }

    tracing::info!(url = %cfg.redis.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&cfg.redis.url);
    if let Some(ref mut pool_config) = redis_config.pool {
        pool_config.max_size = cfg.redis.pool_size;
        pool_config.timeouts.wait = Some(Duration::from_millis(cfg.redis.timeout_ms));
        pool_config.timeouts.create = Some(Duration::from_millis(cfg.redis.timeout_ms));
        pool_config.timeouts.recycle = Some(Duration::from_millis(cfg.redis.timeout_ms));
    }

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to in-process store."
            );
            return CacheStore::memory(cache_enabled);
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            CacheStore::redis(pool, cfg.cache.op_timeout(), cache_enabled)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to in-process store."
            );
            CacheStore::memory(cache_enabled)
        }
    }
}
