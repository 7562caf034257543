//! Resource pool for expensive automation sessions
//!
//! This module provides:
//! - `SessionPool`: a fixed set of sessions created at startup, checked out
//!   through leases, with single-use overflow sessions on exhaustion
//! - `RateLimiter`: per-consumer pacing shared by every adapter
//! - `BrowserSessionFactory`: the headless Chrome implementation
//!
//! The `Session`/`SessionFactory` traits keep the pool independent of the
//! browser, so it can be driven by in-memory sessions in tests.

mod browser;
mod manager;
mod rate;
mod session;

pub use browser::{BrowserSession, BrowserSessionFactory};
pub use manager::{LeaseKind, PoolError, SessionLease, SessionPool};
pub use rate::RateLimiter;
pub use session::{Session, SessionError, SessionFactory};
