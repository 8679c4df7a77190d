//! HTTP presentation API for the session
//!
//! Read access through a snapshot and an SSE stream, write access through
//! one endpoint per user action.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::SessionHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
}

impl AppState {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}
