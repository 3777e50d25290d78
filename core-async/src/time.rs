//! Timers and the monotonic clock.
//!
//! [`Instant`] is tokio's instant rather than `std::time::Instant`. Deadlines
//! computed from it follow the runtime clock, which means a test runtime
//! started with a paused clock advances every timer in this workspace
//! deterministically.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep_until, Duration, Instant};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let deadline = Instant::now() + Duration::from_millis(10);
//! sleep_until(deadline).await;
//! assert!(Instant::now() >= deadline);
//! # }
//! ```

pub use std::time::Duration;
pub use tokio::time::{sleep, sleep_until, timeout, Instant, Sleep};

/// Sleeps until `deadline`, or forever when there is no deadline.
///
/// Used in `select!` loops where a timer arm is only armed some of the time.
pub async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => futures::future::pending::<()>().await,
    }
}
