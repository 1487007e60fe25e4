//! Core server-related functionality.

use crate::config::ServerConfig;
use crate::router::dispatch_router;
use axum::Router;
use hyper::server::conn::AddrIncoming;
use hyper::server::Builder;
use hyper::Error as HyperError;
use sprig::application::Application;
use sprig::config::CONFIG_FILE;
use sprig::error::ConfigurationError;
use std::future::Future;
use std::net::AddrParseError;
use thiserror::Error;
use tracing::info;

/// Errors related to bootstrapping and running servers.
#[derive(Error, Debug)]
pub enum ServerBootstrapError {
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),
    #[error("Error parsing listen address: {0}")]
    ListenAddressParseError(AddrParseError),
    #[error("Error binding server: {0}")]
    BindError(#[source] HyperError),
    #[error("Error serving requests: {0}")]
    ServeError(#[source] HyperError),
}

/// A bound HTTP server. The listening socket is open as soon as the server is created, so
/// connections are accepted (and queued) even before it starts running.
pub struct Server {
    builder: Builder<AddrIncoming>,
    router: Router,
    listen_address: String,
}

impl Server {
    /// Binds a server serving given router.
    pub fn bind(config: &ServerConfig, router: Router) -> Result<Self, ServerBootstrapError> {
        let builder = axum::Server::try_bind(
            &config
                .listen_address
                .parse()
                .map_err(ServerBootstrapError::ListenAddressParseError)?,
        )
        .map_err(ServerBootstrapError::BindError)?;

        Ok(Self {
            builder,
            router,
            listen_address: config.listen_address.clone(),
        })
    }

    /// Binds a server dispatching requests to the application.
    pub fn for_application(
        application: &Application,
        config: &ServerConfig,
    ) -> Result<Self, ServerBootstrapError> {
        Self::bind(
            config,
            dispatch_router(
                application.dispatcher().clone(),
                &application.config().context_path,
            ),
        )
    }

    /// Serves requests until the process ends.
    pub async fn run(self) -> Result<(), ServerBootstrapError> {
        info!("Listening on {}.", self.listen_address);
        self.builder
            .serve(self.router.into_make_service())
            .await
            .map_err(ServerBootstrapError::ServeError)
    }

    /// Serves requests until the given signal completes, then finishes in-flight requests.
    pub async fn run_with_shutdown<F: Future<Output = ()>>(
        self,
        signal: F,
    ) -> Result<(), ServerBootstrapError> {
        info!("Listening on {}.", self.listen_address);
        self.builder
            .serve(self.router.into_make_service())
            .with_graceful_shutdown(signal)
            .await
            .map_err(ServerBootstrapError::ServeError)?;

        info!("Server on {} stopped.", self.listen_address);
        Ok(())
    }
}

/// Starts the application and serves it, both configured from the settings source at given
/// location, or [CONFIG_FILE] if none is given.
pub async fn run(location: Option<&str>) -> Result<(), ServerBootstrapError> {
    let location = location.unwrap_or(CONFIG_FILE);
    let application = Application::from_location(location)?;
    let config = ServerConfig::from_location(location)?;

    Server::for_application(&application, &config)?.run().await
}
