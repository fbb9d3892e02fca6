//! Named service factories.
//!
//! A host is configured with a service *name*; the registry maps that name to
//! the code that builds the service. Factories receive the dispatcher's
//! [`SessionStore`] so services can open and close sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::config::HandlerConfig;
use crate::dispatcher::Dispatcher;
use crate::router::Router;
use crate::service::Service;
use crate::session::SessionStore;

type Factory = Arc<dyn Fn(Arc<SessionStore>) -> anyhow::Result<Router> + Send + Sync>;

/// Services known to a host, by name.
#[derive(Default)]
pub struct ServiceRegistry {
    factories: BTreeMap<String, Factory>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`, replacing any previous one.
    ///
    /// The factory runs when the first request reaches the dispatcher.
    pub fn register<S, F>(&mut self, name: &str, factory: F)
    where
        S: Service,
        F: Fn(Arc<SessionStore>) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        debug!(service = name, "Service registered");
        let factory: Factory = Arc::new(move |store| Router::build(Arc::new(factory(store)?)));
        self.factories.insert(name.to_string(), factory);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Dispatcher for the configured service with a fresh session store built
    /// from `config.session`.
    ///
    /// # Errors
    ///
    /// Fails with `Type {service} not found` if no service is registered under
    /// `config.service`.
    pub fn dispatcher_for(&self, config: &HandlerConfig) -> anyhow::Result<Dispatcher> {
        let store = Arc::new(config.session.build_store());
        self.dispatcher_with_store(config, store)
    }

    /// Dispatcher for the configured service sharing `store` with the caller.
    ///
    /// The store is both the dispatcher's auth gate and the session table
    /// handed to the service factory.
    ///
    /// # Errors
    ///
    /// Fails with `Type {service} not found` if no service is registered under
    /// `config.service`.
    pub fn dispatcher_with_store(
        &self,
        config: &HandlerConfig,
        store: Arc<SessionStore>,
    ) -> anyhow::Result<Dispatcher> {
        let factory = self
            .factories
            .get(&config.service)
            .map(Arc::clone)
            .ok_or_else(|| anyhow!("Type {} not found", config.service))?;

        info!(
            name = config.display_name(),
            service = %config.service,
            endpoint = %config.endpoint,
            cross_domain = config.cross_domain,
            "Dispatcher configured"
        );

        let service_store = Arc::clone(&store);
        Ok(
            Dispatcher::with_builder(Box::new(move || factory(Arc::clone(&service_store))))
                .with_sessions(store)
                .with_binder_options(config.binder)
                .with_endpoint(config.endpoint.clone())
                .with_cross_domain(config.cross_domain),
        )
    }
}
