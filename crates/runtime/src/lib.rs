//! Runtime orchestration for live bingo sessions.
//!
//! This crate wires the pure reducer from `bingo-core` to an authoritative
//! backend: a session worker owns the local state, a subscription client keeps
//! the realtime feed connected, and [`SessionHandle`] gives front-ends an async
//! API over both.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`store`] provides the in-memory backend used by tests and the demo
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod runtime;
pub mod store;

mod workers;

pub use api::{
    FeedMessage, JoinTicket, RealtimeFeed, RejectReason, Result, RuntimeError, SessionHandle,
    SessionStore, StoreError, Subscription, SubscriptionId,
};
pub use events::{ConnectionEvent, EventBus, RuntimeEvent, SessionEvent, Topic};
pub use runtime::{ReconnectPolicy, RuntimeConfig, SessionRuntime, SessionRuntimeBuilder};
pub use store::{MemoryStore, MemoryStoreConfig};
