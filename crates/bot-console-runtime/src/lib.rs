#![deny(missing_docs)]
//! Bot console runtime.
//!
//! Tokio tasks driving the console: avatar download with retry, the status
//! refresh loop, lifecycle alerts and the [`ConsoleAdapter`] composition root.

/// Console adapter.
pub mod adapter;
/// Avatar download with retry.
pub mod avatar;
/// Offline and relogin notifications.
pub mod lifecycle;
/// Status notification refresh loop.
pub mod refresh;

pub use adapter::{Collaborators, ConsoleAdapter, SessionTasks};
pub use avatar::{AvatarError, AvatarFetcher, HttpAvatarFetcher};
pub use lifecycle::LifecycleNotifier;
pub use refresh::{spawn_refresh_loop, RefreshLoop, RefreshLoopConfig};
