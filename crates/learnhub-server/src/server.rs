use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use learnhub_storage::{CourseRepository, EnrollmentRepository, MemoryRepository};

use crate::cache::{CacheStore, CourseCache};
use crate::config::AppConfig;
use crate::tasks::{
    TASK_SEND_ENROLLMENT_EMAIL, TaskDispatcher, send_enrollment_email_handler,
    start_daily_report,
};
use crate::{create_cache_store, handlers, middleware as app_middleware};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub cache: CourseCache,
    pub dispatcher: Arc<TaskDispatcher>,
    pub store: CacheStore,
}

impl AppState {
    /// Wire up state from configuration: memory repository, cache store per
    /// the redis/cache config, dispatcher with the enrollment email handler
    /// registered.
    pub async fn from_config(cfg: &AppConfig) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let store = create_cache_store(cfg).await;
        Self::new(repo.clone(), repo, store, cfg)
    }

    pub fn new(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        store: CacheStore,
        cfg: &AppConfig,
    ) -> Self {
        let cache = CourseCache::new(
            store.clone(),
            cfg.cache.detail_ttl(),
            cfg.cache.list_ttl(),
        );

        let dispatcher = Arc::new(TaskDispatcher::new(
            store.clone(),
            cfg.tasks.idempotency_ttl(),
        ));
        dispatcher.register(
            TASK_SEND_ENROLLMENT_EMAIL,
            send_enrollment_email_handler(Arc::clone(&enrollments)),
        );

        Self {
            courses,
            enrollments,
            cache,
            dispatcher,
            store,
        }
    }
}

pub struct LearnhubServer {
    addr: SocketAddr,
    app: Router,
    state: AppState,
    report_interval: std::time::Duration,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Courses
        .route(
            "/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/courses/{id}",
            get(handlers::read_course)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        // Enrollments
        .route(
            "/enrollments",
            get(handlers::list_enrollments).post(handlers::create_enrollment),
        )
        .route("/enrollments/{id}", delete(handlers::delete_enrollment))
        // The last-added layer is outermost: request context wraps TraceLayer
        // and CORS, so every response carries the correlation headers,
        // preflights included.
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(app_middleware::request_context))
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> LearnhubServer {
        let state = AppState::from_config(&self.config).await;
        let app = build_app(state.clone());

        LearnhubServer {
            addr: self.addr,
            app,
            state,
            report_interval: self.config.tasks.report_interval(),
        }
    }
}

impl LearnhubServer {
    pub async fn run(self) -> anyhow::Result<()> {
        // Periodic report runs on the worker pool, decoupled from requests
        let _report = start_daily_report(
            Arc::clone(&self.state.courses),
            Arc::clone(&self.state.enrollments),
            self.report_interval,
        );

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
