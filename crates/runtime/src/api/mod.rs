//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on workers and backend plumbing.

pub mod errors;
pub mod handle;
pub mod store;

pub use errors::{RejectReason, Result, RuntimeError, StoreError};
pub use handle::SessionHandle;
pub use store::{
    FeedMessage, JoinTicket, RealtimeFeed, SessionStore, Subscription, SubscriptionId,
};
