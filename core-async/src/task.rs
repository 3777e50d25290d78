//! Task spawning.
//!
//! All work in the workspace runs as tokio tasks. The player coordinator
//! spawns exactly one task per player; nothing here spawns OS threads.

pub use tokio::runtime::Handle;
pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawns a future onto the current runtime.
///
/// # Panics
///
/// Panics when called outside a tokio runtime, like `tokio::spawn`.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future)
}

/// Returns the handle of the runtime the caller is running on, if any.
pub fn current_handle() -> Option<Handle> {
    Handle::try_current().ok()
}
