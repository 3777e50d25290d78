//! Async runtime seam for the media-control workspace.
//!
//! Every other crate reaches timers, task spawning and channels through this
//! crate instead of naming tokio directly, so the runtime choice lives in one
//! place.
//!
//! # Modules
//!
//! - `task`: Task spawning and the runtime handle
//! - `time`: Timers and the monotonic clock
//! - `sync`: Channels and cancellation
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let handle = core_async::spawn(async {
//!     sleep(Duration::from_millis(5)).await;
//!     42
//! });
//! assert_eq!(handle.await.unwrap(), 42);
//! # }
//! ```

pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, sleep_until, Duration, Instant};
