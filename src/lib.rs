//! Workspace facade crate.
//!
//! Re-exports the workspace crates so hosts can depend on a single package:
//! - [`playback`]: the declarative player (`Player`, backends, registry)
//! - [`runtime`]: logging and the outbound event bus
//! - [`rt`]: the async runtime seam

pub use core_async as rt;
pub use core_playback as playback;
pub use core_runtime as runtime;

pub use core_playback::{
    BackendEvents, BackendFactory, BackendKind, BackendRegistry, MediaBackend, PlaybackState,
    Player, PlayerConfig,
};
pub use core_runtime::events::{PlayerEvent, ProgressUpdate};
