// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress Reporter
//!
//! An optional textual progress indicator on the controlling terminal.
//! [`Progress`] is the port the dispatch engines are written against;
//! [`BarProgress`] is the `indicatif` adapter, and [`NullProgress`] is the
//! silent implementation used when `logging.show_progress` is false or
//! stdout isn't a terminal.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Observes one dispatch pass's lifecycle. Implementations must be safe to
/// call from multiple worker threads concurrently — `tick` in particular is
/// called once per completed item by whichever worker finished it.
pub trait Progress: Send + Sync {
    /// Called once before the first item, with the total if known.
    fn start(&self, total: Option<usize>);
    /// Called once per completed item (including skipped items).
    fn tick(&self);
    /// Called once after the last item completes normally.
    fn finish(&self);
    /// Called if the pass ends early (a fatal error or `StopPipeline`).
    fn abandon(&self);
}

/// Discards every event; used when progress reporting is disabled.
pub struct NullProgress;

impl Progress for NullProgress {
    fn start(&self, _total: Option<usize>) {}
    fn tick(&self) {}
    fn finish(&self) {}
    fn abandon(&self) {}
}

/// Renders `prefix |bar| pct | i/N | elapsed | remaining` when the total is
/// known, or an oscillating spinner with an items/second estimate when it
/// isn't. Falls back to ASCII bar characters and replaces non-encodable
/// output rather than panicking, matching indicatif's own terminal
/// detection.
pub struct BarProgress {
    prefix: String,
    bar: ProgressBar,
    items: AtomicU64,
}

const KNOWN_TOTAL_TEMPLATE: &str = "{prefix} [{bar:40}] {percent}% | {pos}/{len} | {elapsed_precise} | eta {eta_precise}";
const UNKNOWN_TOTAL_TEMPLATE: &str = "{prefix} {spinner} {pos} items | {per_sec}";
const ASCII_BAR_CHARS: &str = "#>-";

impl BarProgress {
    pub fn new(prefix: impl Into<String>) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_draw_target(ProgressDrawTarget::stderr());
        Self { prefix: prefix.into(), bar, items: AtomicU64::new(0) }
    }
}

impl Progress for BarProgress {
    fn start(&self, total: Option<usize>) {
        match total {
            Some(n) => {
                self.bar.set_length(n as u64);
                if let Ok(style) = ProgressStyle::with_template(KNOWN_TOTAL_TEMPLATE) {
                    self.bar.set_style(style.progress_chars(ASCII_BAR_CHARS));
                }
            }
            None => {
                if let Ok(style) = ProgressStyle::with_template(UNKNOWN_TOTAL_TEMPLATE) {
                    self.bar.set_style(style);
                }
            }
        }
        self.bar.set_prefix(self.prefix.clone());
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.reset();
    }

    fn tick(&self) {
        self.items.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn abandon(&self) {
        self.bar.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_progress_never_panics() {
        let p = NullProgress;
        p.start(Some(10));
        p.tick();
        p.finish();
        p.abandon();
    }

    #[test]
    fn bar_progress_tracks_tick_count() {
        let p = BarProgress::new("test");
        p.start(Some(3));
        p.tick();
        p.tick();
        assert_eq!(p.items.load(Ordering::Relaxed), 2);
        p.finish();
    }
}
