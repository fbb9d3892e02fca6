use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, error};

use crate::binder::{BinderOptions, BoundArguments};
use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::resolver::resolve;
use crate::service::{InvokeResult, MethodDescriptor};
use crate::session::SessionSource;
use crate::trace::TraceSink;

/// Reported to the trace sink when logging a call's input fails.
pub const INPUT_FORMAT_ERROR: &str = "Error formatting method's name to invoke.";

/// Reported to the trace sink when logging a call's result fails.
pub const OUTPUT_FORMAT_ERROR: &str = "Error formatting invoked method's name + return object.";

/// Type-erased method call bound to its service instance.
pub type Callback = Arc<dyn Fn(BoundArguments) -> InvokeResult + Send + Sync>;

/// Per-request collaborators handed to [`Route::invoke`].
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    pub context: &'a RequestContext,
    pub options: &'a BinderOptions,
    pub sink: &'a dyn TraceSink,
}

thread_local! {
    /// Backtrace of the last panic raised on this thread, taken at the panic site.
    static PANIC_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chains a panic hook that records the panicking thread's backtrace before
/// the previously installed hook runs.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::force_capture().to_string();
            let _recorded = PANIC_BACKTRACE.try_with(|slot| slot.replace(Some(backtrace)));
            previous(info);
        }));
    });
}

/// A panic raised by a service method or a trace sink.
#[derive(Debug)]
pub struct PanicError {
    pub message: String,
    pub backtrace: String,
}

impl PanicError {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        let backtrace = PANIC_BACKTRACE
            .try_with(RefCell::take)
            .ok()
            .flatten()
            .unwrap_or_else(|| Backtrace::force_capture().to_string());
        Self { message, backtrace }
    }
}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked: {}", self.message)
    }
}

impl std::error::Error for PanicError {}

/// One invokable endpoint: a method, its path matcher and its markers.
pub struct Route {
    path: String,
    name: String,
    pattern: Regex,
    descriptor: MethodDescriptor,
    callback: Callback,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl Route {
    /// Builds the route for `descriptor` on the service type `type_name`.
    ///
    /// # Errors
    ///
    /// Fails if the path matcher cannot be compiled.
    pub fn new(
        type_name: &str,
        descriptor: MethodDescriptor,
        callback: Callback,
    ) -> Result<Self, regex::Error> {
        let path = format!("/{}", descriptor.name);
        let pattern = Self::path_to_regex(&path)?;
        Ok(Self {
            name: format!("{type_name}.{}", descriptor.name),
            path,
            pattern,
            descriptor,
            callback,
        })
    }

    /// Case-insensitive matcher for `path` with an optional trailing slash and query.
    ///
    /// # Errors
    ///
    /// Fails if the resulting expression cannot be compiled.
    pub fn path_to_regex(path: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!(r"(?i)^{}/?(\?[^/]*)?$", regex::escape(path)))
    }

    /// Canonical path, `"/" + method name`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Display name, `Type.method`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// `true` if the route is public or the caller is authenticated.
    pub fn check_auth(&self, sessions: &dyn SessionSource, ctx: &RequestContext) -> bool {
        !self.descriptor.requires_auth || sessions.is_authenticated(ctx)
    }

    /// Binds `raw_body` to the method's parameters and calls it.
    ///
    /// # Errors
    ///
    /// Binding failures come back as `MalformedInput`, `MissingParameter` or
    /// `TypeConversion`; an error or panic in the method as `TargetFailure`.
    ///
    /// The first call installs a process-wide panic hook, chained in front of
    /// the existing one, so a panic's backtrace is taken where it was raised.
    pub fn invoke(&self, raw_body: &[u8], invocation: &Invocation<'_>) -> Result<Value, DispatchError> {
        install_panic_hook();
        let args = resolve(
            raw_body,
            &self.descriptor,
            invocation.context,
            invocation.options,
        )?;

        let logged_args = self.descriptor.log_io.then(|| args.clone());
        if let Some(args) = &logged_args {
            self.trace(invocation.sink, INPUT_FORMAT_ERROR, |sink| {
                sink.log_call_input(&self.name, args)
            });
        }

        let callback = Arc::clone(&self.callback);
        let result = panic::catch_unwind(AssertUnwindSafe(move || callback(args)))
            .map_err(|payload| {
                let panic = PanicError::from_payload(payload.as_ref());
                error!(
                    method = %self.name,
                    panic = %panic.message,
                    backtrace = %panic.backtrace,
                    "Service method panicked"
                );
                DispatchError::TargetFailure {
                    method: self.name.clone(),
                    error: anyhow::Error::new(panic),
                }
            })?
            .map_err(|e| e.into_dispatch(&self.name))?;

        if let Some(args) = &logged_args {
            self.trace(invocation.sink, OUTPUT_FORMAT_ERROR, |sink| {
                sink.log_call_output(&self.name, &result, args)
            });
        }

        debug!(method = %self.name, "Method invoked");
        Ok(result)
    }

    /// Runs one sink call; failures and panics go to `log_error`.
    fn trace<F>(&self, sink: &dyn TraceSink, message: &str, call: F)
    where
        F: FnOnce(&dyn TraceSink) -> fmt::Result,
    {
        let failure: Box<dyn std::error::Error> =
            match panic::catch_unwind(AssertUnwindSafe(|| call(sink))) {
                Ok(Ok(())) => return,
                Ok(Err(e)) => Box::new(e),
                Err(payload) => Box::new(PanicError::from_payload(payload.as_ref())),
            };
        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            sink.log_error(message, failure.as_ref());
        }));
        if reported.is_err() {
            error!(method = %self.name, "{message}");
        }
    }
}
