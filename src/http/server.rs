//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the host pipeline: gateway first, application second
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Apply configuration updates by swapping the route table
//! - Stop accepting and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig};
use crate::gateway::DispatchGate;
use crate::http::pipeline::{Pipeline, RouterHandler};
use crate::http::request::UuidRequestId;
use crate::http::tls::BackendTls;
use crate::lifecycle::shutdown;
use crate::routing::{RouteTable, SharedRouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// HTTP host running the gateway in front of an application.
pub struct HttpServer {
    router: Router,
    routes: Arc<SharedRouteTable>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Host with an empty application: unmatched requests get 404.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::with_application(config, Router::new())
    }

    /// Host with `application` handling whatever the gateway passes on.
    pub fn with_application(config: GatewayConfig, application: Router) -> Result<Self, ConfigError> {
        validate_config(&config)?;
        let routes = Arc::new(SharedRouteTable::new(RouteTable::from_config(&config.gateway)?));
        let tls = BackendTls::from_config(&config.gateway.tls)?;

        let pipeline = Pipeline::new()
            .with_handler(Arc::new(DispatchGate::new(routes.clone(), tls)))
            .with_handler(Arc::new(RouterHandler::new(application)));
        let state = AppState {
            pipeline: Arc::new(pipeline),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            routes,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(host_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The live route table, for reloads from outside the server.
    pub fn routes(&self) -> Arc<SharedRouteTable> {
        self.routes.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configs arriving on `config_updates` replace the route table; an
    /// invalid one is logged and ignored. `[gateway.tls]` is only read at
    /// construction. Returns once `shutdown_rx` fires and
    /// in-flight requests are done.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rules = self.routes.load().len(),
            "HTTP server starting"
        );

        let routes = self.routes.clone();
        let tls = self.config.gateway.tls.clone();
        let updates = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if config.gateway.tls != tls {
                    tracing::warn!("gateway.tls changed; restart to apply it");
                }
                if let Err(errors) = routes.reload(&config.gateway) {
                    for error in &errors {
                        tracing::error!(error = %error, "Rejected configuration update");
                    }
                    tracing::warn!("Keeping previous route table");
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await;

        updates.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Every request enters the host pipeline here.
async fn host_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    state.pipeline.handle(request).await
}
