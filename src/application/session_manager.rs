//! Browser session lifecycle for one orchestration run
//!
//! `acquire` opens the run's only session; the returned lease lends it out
//! by reference and must be released once. A lease dropped without release
//! (panic, cancelled future) still ends the session in the background.

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::infrastructure::browser::{BrowserSession, SessionError, SessionFactory};

pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self { factory }
    }

    /// Open a new session. No pooling: every call starts a fresh browser.
    pub async fn acquire(&self) -> Result<SessionLease, SessionError> {
        let lease_id = Uuid::new_v4();
        info!(%lease_id, "Opening browser session ({})", self.factory.describe());

        let session = self.factory.open().await.map_err(|err| {
            error!(%lease_id, "Browser session failed to start: {}", err);
            match err {
                SessionError::StartupFailed { .. } => err,
                other => SessionError::startup_failed(other.to_string()),
            }
        })?;

        Ok(SessionLease {
            id: lease_id,
            session: Some(session),
            opened_at: Instant::now(),
        })
    }
}

/// Exclusive ownership of the run's browser session.
pub struct SessionLease {
    id: Uuid,
    session: Option<Box<dyn BrowserSession>>,
    opened_at: Instant,
}

impl SessionLease {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Borrow the live session.
    ///
    /// # Panics
    /// Never in practice: the session is only taken by `release`, which consumes the lease.
    pub fn session(&self) -> &dyn BrowserSession {
        match self.session.as_deref() {
            Some(session) => session,
            None => unreachable!("session lease used after release"),
        }
    }

    /// Quit the browser. Failures are logged, never returned.
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            match session.quit().await {
                Ok(()) => info!(
                    lease_id = %self.id,
                    "Browser session closed after {:.1}s",
                    self.opened_at.elapsed().as_secs_f64()
                ),
                Err(err) => warn!(lease_id = %self.id, "Browser session did not close cleanly: {}", err),
            }
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        warn!(lease_id = %self.id, "Session lease dropped without release; closing in background");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let id = self.id;
            handle.spawn(async move {
                if let Err(err) = session.quit().await {
                    warn!(lease_id = %id, "Background session close failed: {}", err);
                }
            });
        }
    }
}
