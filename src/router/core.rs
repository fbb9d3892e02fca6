use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info, warn};

use super::route::{Callback, Route};
use crate::service::{MethodEntry, Service};

/// Ordered route table of one service.
///
/// Built once from [`Service::methods`]; immutable afterwards and shared by
/// every request.
#[derive(Debug)]
pub struct Router {
    type_name: &'static str,
    routes: Vec<Route>,
}

impl Router {
    /// Builds one route per dispatchable method, in declaration order.
    ///
    /// # Arguments
    ///
    /// * `service` - The instance every route will call into
    ///
    /// # Errors
    ///
    /// Fails if a route's path matcher cannot be compiled.
    pub fn build<S: Service>(service: Arc<S>) -> anyhow::Result<Self> {
        let type_name = service.type_name();
        let entries = S::methods();
        let mut routes = Vec::with_capacity(entries.len());

        for MethodEntry { descriptor, invoke } in entries {
            let method = descriptor.name;
            let target = Arc::clone(&service);
            let callback: Callback = Arc::new(move |args| invoke(&target, args));
            let route = Route::new(type_name, descriptor, callback)
                .with_context(|| format!("cannot build route for {type_name}.{method}"))?;
            if routes.iter().any(|r: &Route| r.is_match(route.path())) {
                warn!(
                    service = type_name,
                    path = %route.path(),
                    "Route shadowed by an earlier route with the same path"
                );
            }
            routes.push(route);
        }

        let routes_summary: Vec<&str> = routes.iter().map(Route::path).collect();
        info!(
            service = type_name,
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Self { type_name, routes })
    }

    /// Name of the service type the routes call into.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route, in build order, whose matcher accepts `path`.
    ///
    /// `path` must already be normalised: mount prefix stripped, leading
    /// slash present, duplicate slashes collapsed.
    #[must_use]
    pub fn route(&self, path: &str) -> Option<&Route> {
        let start = Instant::now();
        let found = self.routes.iter().find(|route| route.is_match(path));
        match found {
            Some(route) => debug!(
                path = %path,
                method = %route.name(),
                duration_us = start.elapsed().as_micros(),
                "Route matched"
            ),
            None => warn!(
                path = %path,
                duration_us = start.elapsed().as_micros(),
                "No route matched"
            ),
        }
        found
    }

    /// One line per route: path, display name, signature and markers.
    #[must_use]
    pub fn describe_routes(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|route| {
                let descriptor = route.descriptor();
                let params: Vec<String> = descriptor
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.shape))
                    .collect();
                format!(
                    "{} -> {}({}) -> {}{}{}",
                    route.path(),
                    route.name(),
                    params.join(", "),
                    descriptor.return_type,
                    if descriptor.requires_auth { " [auth]" } else { "" },
                    if descriptor.log_io { " [log_io]" } else { "" },
                )
            })
            .collect()
    }

    /// Prints the route table to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] service={} count={}", self.type_name, self.routes.len());
        for line in self.describe_routes() {
            println!("[route] {line}");
        }
    }
}
