use std::sync::Arc;

use crew_core::CapabilityStore;
use tracing::{debug, info};

use crate::options::SessionOptions;
use crate::session::authority::{Session, SessionAuthority};

#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    Checking,
    Authenticated(Session),
    Redirecting { location: String },
}

/// Client-side check that a session exists before showing protected pages.
///
/// Advisory only: the server still authorizes every request.
pub struct SessionGuard {
    authority: Arc<dyn SessionAuthority>,
    login_path: String,
    state: GuardState,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("login_path", &self.login_path)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    pub fn new(authority: Arc<dyn SessionAuthority>, options: &SessionOptions) -> Self {
        Self {
            authority,
            login_path: options.login_path.clone(),
            state: GuardState::Checking,
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            GuardState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Query the authority once. Later calls return the settled state.
    pub async fn mount(&mut self) -> &GuardState {
        if self.state != GuardState::Checking {
            return &self.state;
        }

        self.state = match self.authority.current_session().await {
            Ok(Some(session)) => {
                debug!(subject = %session.subject, "session present");
                GuardState::Authenticated(session)
            }
            Ok(None) => {
                info!(location = %self.login_path, "no session, redirecting to login");
                self.redirect()
            }
            Err(err) => {
                info!(error = %err, location = %self.login_path, "session check failed, redirecting to login");
                self.redirect()
            }
        };
        &self.state
    }

    /// Drop the capability snapshot and send the user to the login page.
    pub fn logout(&mut self, store: &CapabilityStore) {
        store.reset();
        info!(location = %self.login_path, "logged out");
        self.state = self.redirect();
    }

    fn redirect(&self) -> GuardState {
        GuardState::Redirecting {
            location: self.login_path.clone(),
        }
    }
}
