//! The background sweep task.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::ReconnectArchive;

/// Spawns the periodic sweep over a shared archive.
///
/// One task per process, running for the lifetime of the server,
/// independent of any single session. Each pass takes the archive lock
/// for the duration of the scan — entry counts are bounded by
/// concurrent games × players, so a coarse lock is fine.
///
/// The task runs until the returned handle is aborted (the server does
/// this on drop).
pub fn spawn_sweeper(
    archive: Arc<Mutex<ReconnectArchive>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = archive.lock().await.config().sweep_interval;
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh server
        // doesn't sweep before anything can be archived.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = archive.lock().await.sweep();
            if evicted > 0 {
                tracing::debug!(evicted, "reconnect sweep pass");
            }
        }
    })
}
