//! Mapping from normalized request paths to handler methods of controllers.

use crate::container::{report, Container};
use crate::descriptor::{lower_first, MethodDescriptor, Role};
use crate::error::{Diagnostic, RouteCollisionWarning};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::iter;
use tracing::info;

/// Collapses runs of `/` into a single one. The result always starts with a single `/`.
pub fn normalize(path: &str) -> String {
    iter::once('/')
        .chain(path.chars())
        .dedup_by(|previous, current| *previous == '/' && *current == '/')
        .collect()
}

/// Builds a route key from a controller base path and a method path.
pub fn route_path(base: &str, path: &str) -> String {
    normalize(&format!("/{base}/{path}"))
}

/// A single handler method.
#[derive(Clone, Debug)]
pub struct Route {
    /// Key of the bean owning the method, derived from the declaring type.
    pub bean_key: String,
    pub method: MethodDescriptor,
}

impl Route {
    pub fn new(method: MethodDescriptor) -> Self {
        Self {
            bean_key: lower_first(method.declaring_type),
            method,
        }
    }

    /// Human-readable handler name, e.g. `DemoController::query`.
    pub fn handler_name(&self) -> String {
        format!("{}::{}", self.method.declaring_type, self.method.name)
    }
}

/// Immutable route table, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: FxHashMap<String, Route>,
}

impl RouteTable {
    /// Collects routes from all controller beans. Controllers are visited in sorted key order, so
    /// the outcome of path collisions is reproducible.
    pub fn build(container: &Container) -> (Self, Vec<Diagnostic>) {
        let mut table = Self::default();
        let mut diagnostics = vec![];

        let controllers = container
            .beans()
            .iter()
            .filter(|bean| bean.descriptor().has_role(Role::Controller))
            .sorted_by_key(|bean| container.keys_of(bean).first().copied().unwrap_or_default());

        for bean in controllers {
            let descriptor = bean.descriptor();
            let base = descriptor.request_mapping.unwrap_or_default();

            for method in &descriptor.methods {
                let path = route_path(base, method.path);
                info!(
                    "Mapped {path} to {}::{}.",
                    method.declaring_type, method.name
                );

                if let Some(previous) = table.insert(path.clone(), Route::new(method.clone())) {
                    report(
                        &mut diagnostics,
                        RouteCollisionWarning {
                            path,
                            previous: previous.handler_name(),
                            replacement: format!("{}::{}", method.declaring_type, method.name),
                        }
                        .into(),
                    );
                }
            }
        }

        (table, diagnostics)
    }

    /// Adds a route, returning the one it replaced.
    pub fn insert(&mut self, path: String, route: Route) -> Option<Route> {
        self.routes.insert(path, route)
    }

    #[inline]
    pub fn route(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }

    /// All mapped paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).sorted().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
