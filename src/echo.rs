//! Built-in demo service, registered as `echo` by the command line tool.

use std::sync::Arc;

use anyhow::anyhow;

use crate::context::RequestContext;
use crate::session::{LoginResponse, SessionStore};

/// Echoes input and demonstrates sessions.
#[derive(Debug, Clone)]
pub struct EchoService {
    sessions: Arc<SessionStore>,
}

impl EchoService {
    #[must_use]
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}

#[jsonrest::service]
impl EchoService {
    /// Returns `message` unchanged.
    #[log_io]
    pub fn echo(&self, message: String) -> String {
        message
    }

    pub fn ping(&self) -> &'static str {
        "pong"
    }

    /// Opens a session for `user`.
    pub fn login(&self, user: String) -> anyhow::Result<LoginResponse> {
        if user.trim().is_empty() {
            return Err(crate::Fault::new("user must not be empty")
                .with_code("EMPTY_USER")
                .into());
        }
        Ok(self.sessions.open(user))
    }

    /// Closes the caller's session. Returns `false` if there was none.
    pub fn logout(&self, ctx: RequestContext) -> bool {
        self.sessions
            .session_id_of(&ctx)
            .is_some_and(|id| self.sessions.close(&id))
    }

    /// User behind the caller's session.
    #[requires_auth]
    pub fn whoami(&self, ctx: RequestContext) -> anyhow::Result<String> {
        self.sessions
            .user_for(&ctx)
            .ok_or_else(|| anyhow!("session of request {} vanished", ctx.request_id))
    }
}
