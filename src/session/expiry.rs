use std::sync::Arc;

use super::navigation::{Navigator, SessionEvent};
use super::storage::{TokenStore, TOKEN_KEY};
use crate::api::{Outcome, ResponseInterceptor};

/// Ends the local session whenever the server reports `401 Unauthorized`.
///
/// On a 401, the stored token is removed and the navigator is told to send the
/// user back to `/`. The original failure is still handed back, so whoever
/// issued the request observes it as usual. Every other outcome passes
/// through untouched.
#[derive(Clone)]
pub struct SessionExpiry {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionExpiry {
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }
}

impl ResponseInterceptor for SessionExpiry {
    fn intercept(&self, outcome: Outcome) -> Outcome {
        if !matches!(&outcome, Err(error) if error.is_unauthorized()) {
            return outcome;
        }

        tracing::info!("session rejected by server, clearing stored token");
        if let Err(err) = self.store.delete(TOKEN_KEY) {
            // Still redirect below.
            tracing::error!(error = %err, "unable to remove stored session token");
        }
        self.navigator.navigate(SessionEvent::expired());

        outcome
    }
}
