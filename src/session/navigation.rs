use std::sync::Mutex;
use tokio::sync::broadcast;

/// Where the application should be sent once a session has expired.
pub const EXPIRED_REDIRECT: &str = "/";

/// How the application should reach a new location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// A full page load, discarding all in-flight UI state.
    Full,
    /// A transition within the running application. Never emitted on expiry;
    /// available to applications that re-publish the event with their own routing.
    InApp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The server rejected our credentials. The stored token is already gone.
    Expired {
        location: String,
        navigation: Navigation,
    },
}

impl SessionEvent {
    /// The event emitted whenever a request comes back `401 Unauthorized`.
    pub fn expired() -> Self {
        SessionEvent::Expired {
            location: EXPIRED_REDIRECT.to_string(),
            navigation: Navigation::Full,
        }
    }
}

/// Receives session events on behalf of the application.
///
/// The HTTP layer never navigates by itself. Whatever owns the UI
/// implements this and decides how to get the user back to `/`.
pub trait Navigator: Send + Sync {
    fn navigate(&self, event: SessionEvent);
}

impl<F> Navigator for F
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn navigate(&self, event: SessionEvent) {
        self(event)
    }
}

/// Publishes session events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Navigator for SessionEvents {
    fn navigate(&self, event: SessionEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::debug!(?event, "no subscribers for session event");
        }
    }
}

/// Keeps every event it's given, in order.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The location of the most recent navigation, if any.
    pub fn location(&self) -> Option<String> {
        self.events().into_iter().last().map(|event| match event {
            SessionEvent::Expired { location, .. } => location,
        })
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, event: SessionEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
