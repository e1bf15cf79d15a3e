//! Ranksync JSON API Server

use std::process;

use salvo::{
    affix_state::inject,
    catch_panic::CatchPanic,
    oapi::{
        OpenApi,
        security::{Http, HttpAuthScheme, SecurityScheme},
        swagger_ui::SwaggerUi,
    },
    prelude::*,
    trailing_slash::remove_slash,
};
use tokio::sync::watch;
use tracing::{error, info};

use ranksync_app::context::AppContext;

use crate::{
    config::ServerConfig,
    observability::{Observability, metrics_handler, request_logging},
    state::{RequestPolicy, State},
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod config;
mod envelope;
mod extensions;
mod gateway;
mod healthcheck;
mod observability;
mod router;
mod shutdown;
mod state;
mod submissions;
mod sync;
mod templates;
#[cfg(test)]
mod test_helpers;
mod validate;

/// Ranksync JSON API Server entry point
#[tokio::main]
pub async fn main() {
    let config = ServerConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    let observability = Observability::init(&config).unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Observability error: {e}");
        }

        process::exit(1);
    });

    let addr = config.socket_addr();

    let app =
        match AppContext::from_database_url(&config.database.database_url, config.app_settings())
            .await
        {
            Ok(app) => app,
            Err(init_error) => {
                error!("failed to initialize app context: {init_error}");

                observability.shutdown();
                process::exit(1);
            }
        };

    let (worker_stop, worker_stop_rx) = watch::channel(false);

    let worker = config.worker.sync_worker_enabled.then(|| {
        let worker = app.worker.clone();

        tokio::spawn(async move { worker.run(worker_stop_rx).await })
    });

    let policy = RequestPolicy {
        require_signed_mutations: config.gateway.require_signed_mutations,
        submit_limit: config.submit_limit(),
    };

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(request_logging)
        .hoop(remove_slash())
        .hoop(inject(State::from_app_context(app, policy)))
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(router::app_router());

    let doc = OpenApi::new("Ranksync API", env!("CARGO_PKG_VERSION"))
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
        .merge_router(&router);

    let router = router
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"));

    info!("Starting server on {addr}");

    let listener = TcpListener::new(addr).bind().await;
    let server = Server::new(listener);
    let handle = server.handle();

    tokio::spawn(async move {
        if let Err(error) = shutdown::listen(handle, worker_stop).await {
            error!("failed to listen for shutdown signal: {error}");
        }
    });

    server.serve(router).await;

    if let Some(worker) = worker
        && let Err(error) = worker.await
    {
        error!("sync worker task failed: {error}");
    }

    observability.shutdown();
}
