//! Streams — concurrent plumbing for chunks of audio.
//!
//! Each combinator runs its data-movement loop on its own thread and talks
//! to its neighbours only through rendezvous channels. Closing a source
//! closes everything derived from it; dropping a consumer makes the
//! producers behind it stop at their next send.

pub mod channel;
pub mod combinators;
pub mod merge;
pub mod slice;

pub use channel::{Stream, StreamSender};
pub use combinators::{apply, split};
pub use merge::{Buffer, MergeOptions, ResiduePolicy, merge, merge_with, transistor, transistor_with};
pub use slice::Slice;

use log::error;
use std::thread;

/// Run `task` on a named background thread.
pub(crate) fn spawn_task<F>(name: &str, task: F)
where
    F: FnOnce() + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name(format!("chantstream-{name}"))
        .spawn(task);
    if let Err(err) = spawned {
        // The task (and the sender it owns) is dropped, so the stream reads as closed.
        error!("failed to spawn stream task `{name}`: {err}");
    }
}
