//! Core application bootstrap. Startup runs once, sequentially: configuration, scanning, bean
//! instantiation, injection and route building. The result is a ready [Dispatcher] together with
//! everything which went wrong on the way, as [Diagnostic]s.

use crate::config::ApplicationConfig;
use crate::container::Container;
use crate::descriptor::TypeCatalog;
use crate::dispatcher::{Dispatcher, DispatcherState};
use crate::error::{ConfigurationError, Diagnostic};
use crate::injector::inject;
use crate::route::RouteTable;
use crate::scanner::scan;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// A started application.
#[derive(Debug)]
pub struct Application {
    config: ApplicationConfig,
    dispatcher: Dispatcher,
    diagnostics: Vec<Diagnostic>,
}

impl Application {
    /// Reads the configuration at given location and starts the application.
    pub fn from_location(location: &str) -> Result<Self, ConfigurationError> {
        Self::start(ApplicationConfig::from_location(location)?)
    }

    /// Starts the application using all types registered in the current binary.
    pub fn start(config: ApplicationConfig) -> Result<Self, ConfigurationError> {
        if config.install_tracing_logger {
            install_tracing_logger();
        }

        Self::with_catalog(config, &TypeCatalog::from_registrations())
    }

    /// Starts the application using given type catalog.
    pub fn with_catalog(
        config: ApplicationConfig,
        catalog: &TypeCatalog,
    ) -> Result<Self, ConfigurationError> {
        info!("Scanning {}...", config.scan_package);
        let type_names = scan(catalog, &config.scan_package)?;

        info!("Creating beans...");
        let (container, mut diagnostics) = Container::build(catalog, &type_names);

        info!("Injecting dependencies...");
        diagnostics.extend(inject(&container));

        info!("Building routes...");
        let (routes, route_diagnostics) = RouteTable::build(&container);
        diagnostics.extend(route_diagnostics);

        let dispatcher = Dispatcher::new(Arc::new(container), Arc::new(routes));
        if dispatcher.state() == DispatcherState::Uninitialized {
            warn!("No routes found - all requests will be dropped.");
        }

        info!(
            "Application started with {} routes and {} diagnostics.",
            dispatcher.routes().len(),
            diagnostics.len()
        );

        Ok(Self {
            config,
            dispatcher,
            diagnostics,
        })
    }

    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// The dispatcher, cheap to clone and share between request handlers.
    #[inline]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[inline]
    pub fn container(&self) -> &Container {
        self.dispatcher.container()
    }

    /// Everything reported during startup.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn install_tracing_logger() {
    if tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {
        debug!("Global tracing subscriber already installed.");
    }
}
