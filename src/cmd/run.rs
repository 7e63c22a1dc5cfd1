//! `sqlrouter run`: start the proxy server.
//!
//! Loads configuration, provisions the lookup store, serves until
//! SIGTERM / Ctrl+C, then tears the store down once in-flight requests
//! have drained.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::error::SqlRouterError;
use crate::logging;
use crate::proxy::ProxyStage;
use crate::router::HostRouter;
use crate::server::{self, AppState};
use crate::store::Resolver;

pub async fn execute(args: RunArgs) -> Result<(), SqlRouterError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_ref()
        .map(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    let config = super::resolve_config(&args.store).await?;
    let settings = config.store.to_settings();

    let resolver = Arc::new(Resolver::provision(&settings).await?);
    let next = Arc::new(ProxyStage::new(server::build_http_client(), config.proxy));
    let state = Arc::new(AppState::new(HostRouter::new(Arc::clone(&resolver), next)));

    let router = server::build_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            shutdown_store(resolver).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        addr = %addr,
        store = %settings.path.display(),
        max_connections = settings.max_connections,
        "sqlrouter started"
    );

    let served = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await;

    shutdown_store(resolver).await;
    served?;

    tracing::info!("sqlrouter stopped");
    Ok(())
}

/// Tear the store down. Teardown failures are logged, never fatal.
async fn shutdown_store(resolver: Arc<Resolver>) {
    match Arc::try_unwrap(resolver) {
        Ok(resolver) => {
            if let Err(e) = resolver.teardown().await {
                tracing::error!(error = %e, "lookup store teardown failed");
            }
        }
        Err(shared) => {
            tracing::warn!("lookup store still shared at shutdown, closing pool in place");
            shared.close_store().await;
        }
    }
}
