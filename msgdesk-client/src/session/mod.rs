//! Session state and its persistence

pub mod manager;
pub mod storage;

pub use manager::{SessionManager, SessionStatus, StatusReceiver};
pub use storage::{FileTokenStorage, MemoryTokenStorage};
