// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Signals
//!
//! Ties OS shutdown signals to a dispatch run's own
//! [`canonada_runtime::dispatch::CancelToken`] — the same atomic flag a
//! dispatch engine already polls between items when a node itself asks to
//! stop (see `canonada-runtime`'s `dispatch` module). `commands::run`
//! spawns [`watch_for_shutdown`] alongside the blocking dispatch call so a
//! SIGTERM, Ctrl+C, or SIGHUP during a `run pipelines`/`run systems` pass
//! finishes whatever item is in flight and reports a normal `Stopped` run
//! instead of the process being killed mid-write.

use std::sync::atomic::Ordering;

use canonada_runtime::dispatch::CancelToken;

/// Spawns a task that waits for the first shutdown signal, then sets
/// `token`. Meant to be called once per `run pipelines`/`run systems`
/// invocation, racing against the blocking dispatch call on the same tokio
/// runtime; if the run finishes first, this task is simply dropped with
/// the runtime.
pub fn watch_for_shutdown(token: CancelToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("received a shutdown signal, stopping the current run after its in-flight items");
        token.store(true, Ordering::Release);
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut sigterm) = signal(SignalKind::terminate()) else { return };
    let Ok(mut sigint) = signal(SignalKind::interrupt()) else { return };
    let Ok(mut sighup) = signal(SignalKind::hangup()) else { return };

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
        _ = sighup.recv() => {}
    }
}

/// There is no SIGTERM/SIGHUP equivalent tokio exposes on Windows; Ctrl+C
/// is the only shutdown signal available.
#[cfg(windows)]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[tokio::test]
    async fn watch_for_shutdown_does_not_fire_the_token_without_a_signal() {
        let token: CancelToken = Arc::new(AtomicBool::new(false));
        watch_for_shutdown(Arc::clone(&token));
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert!(!token.load(Ordering::Acquire));
    }
}
