mod expiry;
mod navigation;
mod storage;

pub use expiry::SessionExpiry;
pub use navigation::{
    Navigation, Navigator, RecordingNavigator, SessionEvent, SessionEvents, EXPIRED_REDIRECT,
};
pub use storage::{KeyringStore, MemoryStore, StorageError, TokenStore, TOKEN_KEY};
