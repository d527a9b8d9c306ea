//! Terminal demo client for Arcadia bingo sessions.
//!
//! # Architecture
//!
//! ```text
//! main
//!   ├─→ config  (environment → ClientConfig)
//!   ├─→ logging (tracing subscriber on stderr)
//!   ├─→ demo    (one SessionRuntime per participant over a shared MemoryStore)
//!   └─→ render  (SessionView → text grid on stdout)
//! ```
//!
//! Front-end code only reads [`bingo_core::SessionView`] and issues calls on a
//! [`bingo_runtime::SessionHandle`]; it holds no session logic of its own.

pub mod config;
pub mod demo;
pub mod logging;
pub mod render;

pub use config::ClientConfig;
pub use demo::{DemoReport, run as run_demo};
