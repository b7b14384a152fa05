//! Filesystem watching for `dev` mode.
//!
//! The coordinator owns a recursive notify watcher over every configured
//! source root, debounces raw events into batches, matches each batch
//! against the rule table, and runs the matched step sequences serially on
//! its own thread. A step failure is reported on the status line and the
//! watcher keeps running; the browser reload only fires after a rule's
//! steps all succeed.
//!
//! The watcher is constructed BEFORE the initial build in `dev` mode, so
//! edits made while the first build runs are not lost.

mod debouncer;
mod rules;

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::Context;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use self::debouncer::Debouncer;
use self::rules::{WatchRule, build_rules, watch_roots};
use crate::serve::ReloadHandle;
use crate::step::Pipeline;
use crate::{core, log, logger};

pub struct WatchCoordinator {
    pipeline: Arc<Pipeline>,
    reload: ReloadHandle,
    rules: Vec<WatchRule>,
    // Dropping the watcher unregisters the OS watches, so it lives here
    // for the coordinator's whole lifetime.
    _watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Result<notify::Event>>,
}

impl WatchCoordinator {
    /// Register watches on every source root and build the rule table.
    pub fn start(pipeline: Arc<Pipeline>, reload: ReloadHandle) -> anyhow::Result<Self> {
        let config = &pipeline.config;
        let rules = build_rules(config).context("invalid watch pattern")?;

        let (tx, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            // Receiver gone means the coordinator is shutting down
            let _ = tx.send(res);
        })
        .context("failed to create filesystem watcher")?;

        let roots = watch_roots(config);
        for root in &roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .with_context(|| format!("failed to watch {}", root.display()))?;
        }
        log!("watch"; "watching {} source roots", roots.len());

        Ok(Self {
            pipeline,
            reload,
            rules,
            _watcher: watcher,
            events,
        })
    }

    /// Block this thread processing events until shutdown.
    pub fn run(self) {
        let mut debouncer = Debouncer::new();

        while !core::is_shutdown() {
            match self.events.recv_timeout(debouncer.sleep_duration()) {
                Ok(Ok(event)) => debouncer.add_event(&event),
                Ok(Err(e)) => logger::status_warning(&format!("watch error: {e}")),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            if let Some(changes) = debouncer.take_if_ready() {
                self.dispatch(&changes);
            }
        }
    }

    /// Run every rule the batch matches, in table order. A rule fires once
    /// per batch no matter how many of its paths changed.
    fn dispatch(&self, changes: &rustc_hash::FxHashSet<std::path::PathBuf>) {
        let mut fired = false;

        for rule in &self.rules {
            if !changes.iter().any(|p| rule.matches(p)) {
                continue;
            }
            fired = true;
            self.run_rule(rule);
        }

        if !fired {
            logger::status_unchanged("no matching rule");
        }
    }

    fn run_rule(&self, rule: &WatchRule) {
        let started = Instant::now();

        for step in &rule.steps {
            if let Err(e) = self.pipeline.run_step(*step) {
                logger::status_error(&format!("{step} failed"), &e.to_string());
                return;
            }
        }

        logger::status_success(&format!(
            "{} rebuilt in {:.0?}",
            rule.name,
            started.elapsed()
        ));

        if rule.reload {
            self.reload.notify();
        }
    }
}
