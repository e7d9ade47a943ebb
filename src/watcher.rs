//! Mutation watcher: drains the tree's mutation queue once per tick and
//! turns each burst into one coalesced incremental pass.
//!
//! Full passes (locale changes) go through a single-slot guard: any number
//! of requests before the next tick collapse into one pass, and that pass
//! reads the locale when it runs, not when it was requested.

use std::collections::HashSet;

use crossbeam_channel as cb;
use tracing::debug;

use crate::config::EngineConfig;
use crate::locale::Locale;
use crate::translator::{PassStats, Translator};
use crate::tree::{MutationRecord, NodeId, UiTree};

/// One unit of incremental work, derived from mutation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Work {
    /// Text content changed.
    Text(NodeId),
    /// An observed attribute changed.
    Element(NodeId),
    /// Node inserted; walk everything under it.
    Subtree(NodeId),
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Mutation records drained from the queue.
    pub records: usize,
    pub full_pass: bool,
    pub stats: PassStats,
}

pub struct MutationWatcher {
    root: NodeId,
    rx: cb::Receiver<MutationRecord>,
    full_pass_pending: bool,
}

impl MutationWatcher {
    /// Subscribe to `tree`. None when the host cannot report mutations.
    pub fn attach(tree: &mut UiTree, root: NodeId, config: &EngineConfig) -> Option<Self> {
        let rx = tree.observe(&config.observed_attributes())?;
        Some(Self {
            root,
            rx,
            full_pass_pending: false,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Ask for a full pass on the next tick. Returns false when one is
    /// already pending (the request collapses into it).
    pub fn request_full_pass(&mut self) -> bool {
        if self.full_pass_pending {
            return false;
        }
        self.full_pass_pending = true;
        true
    }

    pub fn is_full_pass_pending(&self) -> bool {
        self.full_pass_pending
    }

    /// Records waiting in the queue.
    pub fn pending_records(&self) -> usize {
        self.rx.len()
    }

    /// Drain the queue into deduplicated work, in arrival order. Records
    /// for nodes that are gone or outside the root are dropped.
    fn drain(&self, tree: &UiTree) -> (usize, Vec<Work>) {
        let mut seen = HashSet::new();
        let mut work = Vec::new();
        let mut records = 0;
        for record in self.rx.try_iter() {
            records += 1;
            let items = match record {
                MutationRecord::CharacterData { target } => vec![Work::Text(target)],
                MutationRecord::Attribute { target, .. } => vec![Work::Element(target)],
                MutationRecord::ChildList { added, .. } => {
                    added.into_iter().map(Work::Subtree).collect()
                }
            };
            for item in items {
                let node = match item {
                    Work::Text(n) | Work::Element(n) | Work::Subtree(n) => n,
                };
                if tree.contains(self.root, node) && seen.insert(item) {
                    work.push(item);
                }
            }
        }
        (records, work)
    }

    /// Process everything queued since the last tick under `locale`.
    pub fn tick(
        &mut self,
        tree: &mut UiTree,
        translator: &Translator,
        locale: Locale,
    ) -> TickReport {
        let (records, work) = self.drain(tree);
        let mut report = TickReport {
            records,
            ..TickReport::default()
        };

        if self.full_pass_pending {
            self.full_pass_pending = false;
            report.full_pass = true;
            report.stats = translator.full_pass(tree, self.root, locale);
            debug!(
                locale = %locale,
                superseded = work.len(),
                writes = report.stats.writes,
                "full pass"
            );
            return report;
        }

        for item in work {
            let stats = match item {
                Work::Text(node) => translator.apply_to_text_position(tree, node, locale),
                Work::Element(node) => {
                    let mut stats = translator.apply_to_attributes(tree, node, locale);
                    stats.merge(translator.apply_to_display_value(tree, node, locale));
                    stats
                }
                Work::Subtree(node) => translator.walk_subtree(tree, node, locale),
            };
            report.stats.merge(stats);
        }
        if report.records > 0 {
            debug!(
                records = report.records,
                writes = report.stats.writes,
                adopted = report.stats.adopted,
                "incremental pass"
            );
        }
        report
    }
}
