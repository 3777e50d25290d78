//! Channels and cancellation.
//!
//! The coordinator talks to its actor task over [`mpsc`] and answers queries
//! over [`oneshot`]; outbound events fan out over [`broadcast`]. Shutdown is
//! signalled with a [`CancellationToken`].

pub use tokio::sync::{broadcast, mpsc, oneshot};
pub use tokio_util::sync::CancellationToken;
