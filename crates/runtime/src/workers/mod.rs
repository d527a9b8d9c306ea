//! Worker tasks that back the runtime orchestration.
//!
//! The session worker owns the reduced state and talks to the store, while
//! the subscription client keeps the realtime feed connected.

mod session;
mod subscription;

pub use session::{Command, Inbound, SessionWorker};
pub use subscription::SubscriptionClient;
