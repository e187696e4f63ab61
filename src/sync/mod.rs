//! Client side of live todos.
//!
//! A [`SyncSession`] owns the local copy of every todo the user can see and
//! is fed from two directions: periodic full refreshes and incremental
//! server-sent events. Both go through the same idempotent reconciliation,
//! so receiving an event twice, or after a refresh already covered it, is
//! harmless.

mod client;
mod session;
mod sse;
mod watcher;

pub use client::ApiClient;
pub use session::{RemoteEvent, SyncSession};
pub use sse::SseDecoder;
pub use watcher::Watcher;
