//! Event dispatch: routing lookup and handler task supervision.
//!
//! ```text
//! ┌──────────┐     ┌──────────────┐     ┌─────────────┐
//! │ receiver │ ──► │  dispatcher  │ ──► │ plugin task │  (one per routed plugin)
//! │ (axum)   │     │ org ∪ repo   │ ──► │ plugin task │
//! └──────────┘     └──────────────┘     └─────────────┘
//!      │
//!      │ returns 200 OK before any handler runs
//!      ▼
//! ```
//!
//! Each plugin task waits for a concurrency permit, runs under a deadline,
//! and contains its own panics. Failures are logged and dropped.

mod dispatcher;
mod supervise;


pub use dispatcher::Dispatcher;
pub use supervise::HandlerOutcome;
