//! Process-wide fan-out of todo mutations.
//!
//! Delivery is at-most-once: a subscriber that is not connected, or that
//! falls more than the channel capacity behind, misses events and has to
//! catch up through a full refresh.

mod broadcaster;
mod event;

pub use broadcaster::Broadcaster;
pub use event::{DeletedTodo, TodoEvent};
