//! # Session Provider
//!
//! Holds the signed-in user and answers route-guard questions.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   new() ──► Loading ──restore()──┬──► Anonymous ──login()────┐          │
//! │                                  │        ▲     register()   │          │
//! │                                  │        │                  ▼          │
//! │                                  └────────┼─────────► Authenticated     │
//! │                                           │                  │          │
//! │                                           └──── logout() ◄───┘          │
//! │                                                                         │
//! │   complete_onboarding() flips onboarding_complete on the session.       │
//! │   restore() never leaves the provider stuck in Loading.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use estoque_core::guard::{evaluate, GuardDecision, GuardInput};
use estoque_core::validation::{validate_credentials, validate_registration};
use estoque_core::{Company, Credentials, RegisterRequest, Session};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// Authentication operations against the backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> ClientResult<Session>;
    async fn register(&self, request: &RegisterRequest) -> ClientResult<Session>;
    async fn logout(&self) -> ClientResult<()>;
    /// `Ok(None)` when nobody is signed in.
    async fn current_session(&self) -> ClientResult<Option<Session>>;
    async fn complete_onboarding(&self, company: &Company) -> ClientResult<Session>;
}

/// Point-in-time view of the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn guard_input(&self) -> GuardInput<'_> {
        if self.is_loading {
            return GuardInput::loading();
        }
        GuardInput::from_session(self.session.as_ref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

pub struct SessionProvider {
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionProvider {
    /// Creates a provider in the loading state. Call [`restore`] next.
    ///
    /// [`restore`]: SessionProvider::restore
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot {
            session: None,
            is_loading: true,
        });
        SessionProvider { backend, state }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    fn set_session(&self, session: Option<Session>) {
        self.state.send_replace(SessionSnapshot {
            session,
            is_loading: false,
        });
    }

    /// Resolves the persisted session with the backend.
    pub async fn restore(&self) -> Option<Session> {
        let session = match self.backend.current_session().await {
            Ok(session) => session,
            Err(ClientError::Unauthorized) => None,
            Err(e) => {
                warn!(error = %e, "Could not restore session, continuing signed out");
                None
            }
        };
        debug!(authenticated = session.is_some(), "Session restored");
        self.set_session(session.clone());
        session
    }

    pub async fn login(&self, credentials: &Credentials) -> ClientResult<Session> {
        validate_credentials(credentials)?;
        let session = self.backend.login(credentials).await?;
        info!(user_id = %session.user_id, "Signed in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<Session> {
        validate_registration(request)?;
        let session = self.backend.register(request).await?;
        info!(user_id = %session.user_id, "Account created");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Signs out locally even when the backend call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            warn!(error = %e, "Backend logout failed");
        }
        self.set_session(None);
        info!("Signed out");
    }

    pub async fn complete_onboarding(&self, company: &Company) -> ClientResult<Session> {
        if self.state.borrow().session.is_none() {
            return Err(ClientError::Unauthorized);
        }
        let session = self.backend.complete_onboarding(company).await?;
        info!(company = %company.name, "Onboarding complete");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Decision for a navigation to `path` given the current state.
    pub fn guard(&self, path: &str) -> GuardDecision {
        let snapshot = self.snapshot();
        evaluate(&snapshot.guard_input(), path)
    }
}
