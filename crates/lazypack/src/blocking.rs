//! Blocking work behind a suspension point
//!
//! Process spawning and file I/O run on a dedicated thread and hand their
//! result back through a oneshot channel, so the executor driving the
//! pipeline keeps polling sibling tasks meanwhile.

use std::thread;

use futures::channel::oneshot;

/// Run `work` on its own thread and await its result
///
/// Fails with [`oneshot::Canceled`] when `work` panics.
pub async fn run_blocking<T, F>(work: F) -> Result<T, oneshot::Canceled>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    thread::spawn(move || {
        // The receiver is gone only when the awaiting future was dropped
        let _ = tx.send(work());
    });
    rx.await
}
