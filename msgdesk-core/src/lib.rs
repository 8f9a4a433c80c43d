//! Msgdesk Core - Shared data structures and collaborator traits
//!
//! Everything the message desk client and its front ends agree on lives here:
//! the error type, logging bootstrap, configuration and domain types.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
