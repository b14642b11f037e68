use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use slotwatch_db_memory::MemoryStore;
use slotwatch_engine::{
    AvailabilityProber, HttpProber, PollOrchestrator, ServiceDirectory, SubscriptionReconciler,
    SubscriptionStore, TopicRegistry,
};
use slotwatch_push::{FcmGateway, NotificationDispatcher, PushLinks};
use slotwatch_storage::DocumentStore;

use crate::{config::AppConfig, middleware as app_middleware, routes};

/// Shared handler state: every collaborator is constructed once here and
/// injected, with lifecycle owned by the process entry point.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<StateInner>,
}

struct StateInner {
    orchestrator: PollOrchestrator,
    subscriptions: SubscriptionStore,
    directory: Arc<ServiceDirectory>,
    prober: Arc<HttpProber>,
    trigger_secret: String,
}

impl AppState {
    pub fn orchestrator(&self) -> &PollOrchestrator {
        &self.inner.orchestrator
    }

    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.inner.subscriptions
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.inner.directory
    }

    pub fn prober(&self) -> &HttpProber {
        &self.inner.prober
    }

    pub fn trigger_secret(&self) -> &str {
        &self.inner.trigger_secret
    }
}

/// Builds the application router against the configured storage backend.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let store: Arc<dyn DocumentStore> = match cfg.storage.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        other => anyhow::bail!("unsupported storage backend: {other}"),
    };
    Ok(build_app_with_store(cfg, store))
}

/// Builds the application router over an existing storage backend (tests
/// inject their own).
pub fn build_app_with_store(cfg: &AppConfig, store: Arc<dyn DocumentStore>) -> Router {
    let subscriptions = SubscriptionStore::new(store.clone());
    let registry = TopicRegistry::new(store.clone());

    let prober = Arc::new(HttpProber::new(
        cfg.upstream.calendar_url_template.clone(),
        cfg.probe_timeout(),
    ));
    let directory = Arc::new(ServiceDirectory::new(
        cfg.upstream.services_url.clone(),
        cfg.upstream.locations_url_template.clone(),
        cfg.probe_timeout(),
    ));

    let gateway = Arc::new(FcmGateway::new(
        cfg.push.endpoint.clone(),
        cfg.push.server_key.clone(),
        cfg.push_send_timeout(),
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        gateway,
        PushLinks {
            icon_url: cfg.push.icon_url.clone(),
            portal_url: cfg.push.portal_url.clone(),
        },
    ));
    let reconciler = Arc::new(SubscriptionReconciler::new(
        store,
        cfg.max_subscription_age(),
    ));

    let orchestrator = PollOrchestrator::new(
        registry,
        prober.clone() as Arc<dyn AvailabilityProber>,
        directory.clone(),
        subscriptions.clone(),
        dispatcher,
        reconciler,
        cfg.upstream.probe_concurrency,
    );

    let state = AppState {
        inner: Arc::new(StateInner {
            orchestrator,
            subscriptions,
            directory,
            prober,
            trigger_secret: cfg.poll.trigger_secret.clone(),
        }),
    };

    // The trigger route carries its own credential check; everything else
    // under /api is device-facing and unauthenticated, like the source site.
    let trigger = Router::new()
        .route("/api/poll", post(routes::run_poll))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::trigger_auth,
        ));

    Router::new()
        // Health and info endpoints
        .route("/", get(routes::root))
        .route("/healthz", get(routes::healthz))
        .route("/readyz", get(routes::readyz))
        // Device subscription API
        .route(
            "/api/subscriptions",
            post(routes::create_subscription).get(routes::list_subscriptions),
        )
        .route("/api/subscriptions/{id}", delete(routes::delete_subscription))
        // Service browsing API
        .route("/api/services", get(routes::list_services))
        .route(
            "/api/services/{service_id}/locations",
            get(routes::service_locations),
        )
        .merge(trigger)
        // Middleware stack (order: request id -> cors -> trace)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct SlotwatchServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
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

    pub async fn build(self) -> anyhow::Result<SlotwatchServer> {
        let app = build_app(&self.config).await?;

        Ok(SlotwatchServer {
            addr: self.addr,
            app,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotwatchServer {
    pub async fn run(self) -> anyhow::Result<()> {
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
