//! Engine wiring: install once on an application root, then tick.
//!
//! Locale change -> full pass on the next tick -> incremental passes from
//! the mutation queue on every tick after that. Dialog prompts are patched
//! at install time and translate independently of the tree.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dialog::Dialogs;
use crate::locale::{Locale, LocaleState};
use crate::translate::Catalog;
use crate::translator::Translator;
use crate::tree::{NodeId, TreeError, UiTree};
use crate::watcher::{MutationWatcher, TickReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
    /// The host tree cannot report mutations; the engine stays inert.
    Unsupported,
}

pub struct Engine {
    translator: Translator,
    catalog: Arc<Catalog>,
    locale: Arc<LocaleState>,
    locale_rx: watch::Receiver<Locale>,
    config: Arc<EngineConfig>,
    watcher: Option<MutationWatcher>,
}

impl Engine {
    pub fn new(catalog: Arc<Catalog>, locale: Arc<LocaleState>, config: Arc<EngineConfig>) -> Self {
        let locale_rx = locale.subscribe();
        Self {
            translator: Translator::new(Arc::clone(&catalog), Arc::clone(&config)),
            catalog,
            locale,
            locale_rx,
            config,
            watcher: None,
        }
    }

    /// Attach to `root`: subscribe to mutations, run the initial pass and
    /// patch the dialogs. Calling it again is a no-op.
    pub fn install(
        &mut self,
        tree: &mut UiTree,
        root: NodeId,
        dialogs: &mut Dialogs,
    ) -> Result<InstallOutcome, TreeError> {
        if self.watcher.is_some() {
            debug!("engine already installed");
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        if !tree.is_alive(root) {
            return Err(TreeError::StaleNode);
        }
        if !tree.is_element(root) {
            return Err(TreeError::NotAnElement);
        }
        let Some(watcher) = MutationWatcher::attach(tree, root, &self.config) else {
            warn!("host tree has no mutation observation, engine disabled");
            return Ok(InstallOutcome::Unsupported);
        };

        self.locale_rx.borrow_and_update();
        let locale = self.locale.current();
        let stats = self.translator.full_pass(tree, root, locale);
        self.watcher = Some(watcher);
        dialogs.patch(Arc::clone(&self.catalog), Arc::clone(&self.locale));

        info!(
            locale = %locale,
            captured = stats.captured,
            writes = stats.writes,
            "engine installed"
        );
        Ok(InstallOutcome::Installed)
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn locale(&self) -> &Arc<LocaleState> {
        &self.locale
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    /// Schedule a full pass for the next tick. Returns false when one is
    /// already pending or the engine is inactive.
    pub fn request_full_pass(&mut self) -> bool {
        self.watcher
            .as_mut()
            .is_some_and(MutationWatcher::request_full_pass)
    }

    /// One scheduling tick: pick up a locale change, then drain the
    /// mutation queue. The locale is read here, at execution time.
    pub fn tick(&mut self, tree: &mut UiTree) -> TickReport {
        let Some(watcher) = self.watcher.as_mut() else {
            return TickReport::default();
        };
        if self.locale_rx.has_changed().unwrap_or(false) {
            let changed_to = *self.locale_rx.borrow_and_update();
            if watcher.request_full_pass() {
                debug!(locale = %changed_to, "full pass scheduled");
            }
        }
        let locale = self.locale.current();
        watcher.tick(tree, &self.translator, locale)
    }
}

/// Drive `engine.tick` every `frame_interval_ms` until `cancel` fires.
/// Locks are held only for the duration of a tick.
pub fn spawn_frame_loop(
    engine: Arc<Mutex<Engine>>,
    tree: Arc<Mutex<UiTree>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let period = engine.lock().config().frame_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis() as u64, "frame loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    engine.lock().tick(&mut tree.lock());
                }
            }
        }
        info!("frame loop stopped");
    })
}
