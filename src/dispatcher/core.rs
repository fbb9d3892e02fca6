use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use once_cell::sync::OnceCell;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::path::normalize_path;
use super::request::IncomingRequest;
use super::response::HandlerResponse;
use crate::binder::BinderOptions;
use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::router::{Invocation, Router};
use crate::service::Service;
use crate::session::{NoSessions, SessionSource};
use crate::trace::{TraceSink, TracingSink};

/// Body of the 401 response
pub const NOT_CONNECTED: &str = "You're not connected.";

/// Body of the 404 response
pub const UNKNOWN_PATH: &str = "Unknown path";

/// Builds the route table on first use.
pub type RouterBuilder = Box<dyn Fn() -> anyhow::Result<Router> + Send + Sync>;

/// Entry point of the HTTP host: match, authenticate, invoke, render.
///
/// The router is built lazily on the first request, exactly once even when
/// several requests arrive together. A failed build is not cached; the next
/// request tries again.
pub struct Dispatcher {
    router: OnceCell<Router>,
    builder: RouterBuilder,
    sessions: Arc<dyn SessionSource>,
    sink: Arc<dyn TraceSink>,
    options: BinderOptions,
    endpoint: String,
    cross_domain: bool,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router.get())
            .field("options", &self.options)
            .field("endpoint", &self.endpoint)
            .field("cross_domain", &self.cross_domain)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher over an existing service instance.
    #[must_use]
    pub fn new<S: Service>(service: Arc<S>) -> Self {
        Self::with_builder(Box::new(move || Router::build(Arc::clone(&service))))
    }

    /// Dispatcher whose service is only constructed when the router is built.
    #[must_use]
    pub fn from_factory<S, F>(factory: F) -> Self
    where
        S: Service,
        F: Fn() -> anyhow::Result<S> + Send + Sync + 'static,
    {
        Self::with_builder(Box::new(move || Router::build(Arc::new(factory()?))))
    }

    #[must_use]
    pub fn with_builder(builder: RouterBuilder) -> Self {
        Self {
            router: OnceCell::new(),
            builder,
            sessions: Arc::new(NoSessions),
            sink: Arc::new(TracingSink),
            options: BinderOptions::default(),
            endpoint: String::new(),
            cross_domain: false,
        }
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionSource>) -> Self {
        self.sessions = sessions;
        self
    }

    #[must_use]
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_binder_options(mut self, options: BinderOptions) -> Self {
        self.options = options;
        self
    }

    /// Mount prefix stripped from incoming URLs.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Adds `Access-Control-Allow-Origin: *` to every response.
    #[must_use]
    pub fn with_cross_domain(mut self, cross_domain: bool) -> Self {
        self.cross_domain = cross_domain;
        self
    }

    /// The route table, built on first call.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ServiceInit`] if the service or its routes
    /// cannot be built.
    pub fn router(&self) -> Result<&Router, DispatchError> {
        self.router.get_or_try_init(|| (self.builder)()).map_err(|e| {
            error!(error = %format!("{e:#}"), "Service initialisation failed");
            DispatchError::ServiceInit {
                message: format!("{e:#}"),
            }
        })
    }

    /// Runs one request against an already normalised path.
    ///
    /// # Arguments
    ///
    /// * `path` - Normalised path (see [`normalize_path`])
    /// * `ctx` - Context of the current request
    /// * `body` - Raw request body
    ///
    /// # Returns
    ///
    /// The serialized return value of the invoked method.
    ///
    /// # Errors
    ///
    /// `UnknownPath` if no route matches, `Unauthorized` if the auth gate
    /// rejects the caller (the method is not invoked), otherwise whatever
    /// [`Route::invoke`](crate::router::Route::invoke) reports.
    pub fn dispatch(
        &self,
        path: &str,
        ctx: &RequestContext,
        body: &[u8],
    ) -> Result<Value, DispatchError> {
        let router = self.router()?;
        let route = router.route(path).ok_or_else(|| DispatchError::UnknownPath {
            path: path.to_string(),
        })?;

        if !route.check_auth(self.sessions.as_ref(), ctx) {
            warn!(
                request_id = %ctx.request_id,
                method = %route.name(),
                "Authentication required"
            );
            return Err(DispatchError::Unauthorized {
                method: route.name().to_string(),
            });
        }

        route.invoke(
            body,
            &Invocation {
                context: ctx,
                options: &self.options,
                sink: self.sink.as_ref(),
            },
        )
    }

    /// Serves one request from the HTTP host.
    #[must_use]
    pub fn handle(&self, request: &IncomingRequest) -> HandlerResponse {
        let start = Instant::now();
        let path = normalize_path(&request.raw_url, &self.endpoint);
        let ctx = self.context_for(request, &path);

        info!(
            request_id = %ctx.request_id,
            path = %path,
            remote_addr = ?ctx.remote_addr,
            body_len = request.body.len(),
            "Request start"
        );

        let outcome = self.dispatch(&path, &ctx, &request.body);
        let response = self.render(&ctx, outcome);

        info!(
            request_id = %ctx.request_id,
            path = %path,
            remote_addr = ?ctx.remote_addr,
            status = response.status,
            duration_ms = start.elapsed().as_millis(),
            "Request end"
        );
        response
    }

    fn context_for(&self, request: &IncomingRequest, path: &str) -> RequestContext {
        let request_id = RequestId::from_header_or_new(request.get_header("x-request-id"));
        let mut ctx = RequestContext::new(path).with_request_id(request_id);
        for (name, value) in &request.headers {
            ctx = ctx.with_header(name, value.clone());
        }
        if let Some(addr) = &request.remote_addr {
            ctx = ctx.with_remote_addr(addr.clone());
        }
        ctx
    }

    fn render(&self, ctx: &RequestContext, outcome: Result<Value, DispatchError>) -> HandlerResponse {
        let mut response = match outcome {
            Ok(Value::String(s)) => HandlerResponse::json(StatusCode::OK, json!({ "response": s })),
            Ok(value) => HandlerResponse::json(StatusCode::OK, value),
            Err(err) => Self::render_error(ctx, &err),
        };
        if self.cross_domain {
            response.set_header("access-control-allow-origin", "*".to_string());
        }
        response
    }

    fn render_error(ctx: &RequestContext, err: &DispatchError) -> HandlerResponse {
        let status = err.status();
        match err {
            DispatchError::Unauthorized { .. } => HandlerResponse::error(status, NOT_CONNECTED),
            DispatchError::UnknownPath { .. } => HandlerResponse::error(status, UNKNOWN_PATH),
            _ => {
                if let Some(fault) = err.fault() {
                    warn!(request_id = %ctx.request_id, error = %fault, code = ?fault.code, "Service fault");
                    return HandlerResponse::json(
                        status,
                        json!({ "error": fault.reason, "code": fault.code }),
                    );
                }
                if err.is_binding_failure() {
                    warn!(request_id = %ctx.request_id, error = %err, "Bad request");
                } else {
                    error!(
                        request_id = %ctx.request_id,
                        error = %err,
                        cause = ?err.target_error(),
                        "Request failed"
                    );
                }
                let message = err
                    .target_error()
                    .map_or_else(|| err.to_string(), ToString::to_string);
                HandlerResponse::error(status, &message)
            }
        }
    }
}
