//! # Sessions
//!
//! Routes marked `#[requires_auth]` are only invoked when the dispatcher's
//! [`SessionSource`] reports an authenticated caller. The check runs on every
//! request because sessions open and close between requests.
//!
//! [`SessionStore`] is an in-memory source: services open a session on login and
//! hand the id back to the client, which then sends it in the `x-session-id`
//! header or the `session_id` cookie. Sessions idle for longer than the store's
//! idle timeout are closed on next use and swept whenever a new session opens.
//!
//! ```rust
//! use jsonrest::session::{SessionSource, SessionStore};
//! use jsonrest::RequestContext;
//!
//! let store = SessionStore::new();
//! let login = store.open("ann");
//!
//! let ctx = RequestContext::new("/whoami")
//!     .with_header("x-session-id", login.session_id.to_string());
//! assert!(store.is_authenticated(&ctx));
//! assert_eq!(store.user_for(&ctx).as_deref(), Some("ann"));
//! ```

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::RequestContext;
use crate::ids::SessionId;

/// Default header carrying the session id
pub const DEFAULT_SESSION_HEADER: &str = "x-session-id";

/// Default cookie carrying the session id
pub const DEFAULT_SESSION_COOKIE: &str = "session_id";

/// Default idle timeout of a session
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Answers whether the caller of a request is authenticated.
pub trait SessionSource: Send + Sync {
    /// # Arguments
    ///
    /// * `ctx` - The request being dispatched
    ///
    /// # Returns
    ///
    /// `true` if the caller holds a valid session
    fn is_authenticated(&self, ctx: &RequestContext) -> bool;
}

impl<F> SessionSource for F
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    fn is_authenticated(&self, ctx: &RequestContext) -> bool {
        self(ctx)
    }
}

/// Source that never authenticates anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessions;

impl SessionSource for NoSessions {
    fn is_authenticated(&self, _ctx: &RequestContext) -> bool {
        false
    }
}

/// Returned to the client when a session is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: SessionId,
    pub started_at_ms: u64,
}

#[derive(Debug, Clone)]
struct Session {
    user: String,
    last_seen: Instant,
}

/// Concurrent in-memory session table.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
    header: String,
    cookie: String,
    idle_timeout: Option<Duration>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(DEFAULT_SESSION_HEADER, DEFAULT_SESSION_COOKIE)
    }

    /// Store reading the session id from custom header and cookie names.
    #[must_use]
    pub fn with_names(header: impl Into<String>, cookie: impl Into<String>) -> Self {
        Self {
            sessions: DashMap::new(),
            header: header.into(),
            cookie: cookie.into(),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }

    /// Closes sessions unused for `timeout`; `None` keeps them until logout.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Opens a session for `user`, sweeping idle sessions first.
    pub fn open(&self, user: impl Into<String>) -> LoginResponse {
        self.sweep_expired();
        let session_id = SessionId::new();
        let user = user.into();
        debug!(session_id = %session_id, user = %user, "session opened");
        self.sessions.insert(
            session_id,
            Session {
                user,
                last_seen: Instant::now(),
            },
        );
        LoginResponse {
            session_id,
            started_at_ms: session_id.timestamp_ms(),
        }
    }

    /// Closes a session. Returns `false` if it was not open.
    pub fn close(&self, session_id: &SessionId) -> bool {
        let closed = self.sessions.remove(session_id).is_some();
        if closed {
            debug!(session_id = %session_id, "session closed");
        }
        closed
    }

    /// User owning an open session. Counts as activity on the session.
    #[must_use]
    pub fn user(&self, session_id: &SessionId) -> Option<String> {
        let now = Instant::now();
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            if !is_idle(&session, self.idle_timeout, now) {
                session.last_seen = now;
                return Some(session.user.clone());
            }
        }
        if self.sessions.remove(session_id).is_some() {
            debug!(session_id = %session_id, "session expired");
        }
        None
    }

    /// Removes every idle session. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !is_idle(session, Some(timeout), now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "idle sessions swept");
        }
        removed
    }

    /// User behind the session id carried by a request.
    #[must_use]
    pub fn user_for(&self, ctx: &RequestContext) -> Option<String> {
        self.session_id_of(ctx).and_then(|id| self.user(&id))
    }

    /// Session id carried by a request: header first, then cookie.
    #[must_use]
    pub fn session_id_of(&self, ctx: &RequestContext) -> Option<SessionId> {
        ctx.get_header(&self.header)
            .or_else(|| ctx.get_cookie(&self.cookie))
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// Sessions held, including idle ones not swept yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionSource for SessionStore {
    fn is_authenticated(&self, ctx: &RequestContext) -> bool {
        self.user_for(ctx).is_some()
    }
}

fn is_idle(session: &Session, timeout: Option<Duration>, now: Instant) -> bool {
    timeout.is_some_and(|timeout| now.saturating_duration_since(session.last_seen) >= timeout)
}
