//! Applies the catalog to tree positions: text nodes, allow-listed
//! attributes and the display value of label-bearing inputs.
//! Writes happen only when the value actually changes.

use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::locale::Locale;
use crate::store::{resolve_original, Outcome, Pass, Slot};
use crate::translate::Catalog;
use crate::tree::{NodeId, UiTree, VALUE_ATTRIBUTE};

/// Counters for one pass over the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub visited: usize,
    pub writes: usize,
    pub captured: usize,
    pub adopted: usize,
}

impl PassStats {
    pub fn merge(&mut self, other: PassStats) {
        self.visited += other.visited;
        self.writes += other.writes;
        self.captured += other.captured;
        self.adopted += other.adopted;
    }

    fn record(&mut self, outcome: Outcome, wrote: bool) {
        self.visited += 1;
        match outcome {
            Outcome::Captured => self.captured += 1,
            Outcome::Adopted => self.adopted += 1,
            Outcome::Refreshed | Outcome::Cached => {}
        }
        if wrote {
            self.writes += 1;
        }
    }
}

#[derive(Clone)]
pub struct Translator {
    catalog: Arc<Catalog>,
    config: Arc<EngineConfig>,
}

impl Translator {
    pub fn new(catalog: Arc<Catalog>, config: Arc<EngineConfig>) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Element opted out by `translate="no"`, the marker attribute or class.
    fn is_marked(&self, tree: &UiTree, element: NodeId) -> bool {
        if tree
            .attribute(element, "translate")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("no"))
        {
            return true;
        }
        if tree.attribute(element, &self.config.no_translate_attribute).is_some() {
            return true;
        }
        tree.attribute(element, "class").is_some_and(|classes| {
            classes
                .split_ascii_whitespace()
                .any(|c| c == self.config.no_translate_class)
        })
    }

    /// Whether a walk should not descend into `element`.
    fn is_excluded_element(&self, tree: &UiTree, element: NodeId) -> bool {
        tree.tag(element)
            .is_some_and(|tag| self.config.is_excluded_tag(tag))
            || self.is_marked(tree, element)
    }

    /// Whether `node` sits inside an excluded container: some ancestor is an
    /// excluded kind or carries the no-translate marker. Matches what
    /// `walk_subtree` prunes.
    fn is_excluded_position(&self, tree: &UiTree, node: NodeId) -> bool {
        let mut cursor = tree.parent(node);
        while let Some(current) = cursor {
            if self.is_excluded_element(tree, current) {
                return true;
            }
            cursor = tree.parent(current);
        }
        false
    }

    /// Bring one text node in line with `locale`.
    pub fn apply_to_text_position(
        &self,
        tree: &mut UiTree,
        node: NodeId,
        locale: Locale,
    ) -> PassStats {
        if self.is_excluded_position(tree, node) {
            return PassStats::default();
        }
        self.translate_text(tree, node, locale, Pass::Incremental)
    }

    fn translate_text(
        &self,
        tree: &mut UiTree,
        node: NodeId,
        locale: Locale,
        pass: Pass,
    ) -> PassStats {
        let mut stats = PassStats::default();
        let Some(current) = tree.text(node).map(str::to_string) else {
            return stats;
        };
        if current.trim().is_empty() {
            return stats;
        }
        let Some(records) = tree.originals_mut(node) else {
            return stats;
        };
        let resolution =
            resolve_original(records, Slot::Text, &current, locale, pass, &self.catalog);
        let next = self.catalog.translate(&resolution.original, locale);
        let wrote = next != current && tree.set_text(node, &next).is_ok();
        stats.record(resolution.outcome, wrote);
        stats
    }

    /// Allow-listed attributes of one element.
    pub fn apply_to_attributes(
        &self,
        tree: &mut UiTree,
        element: NodeId,
        locale: Locale,
    ) -> PassStats {
        let mut stats = PassStats::default();
        if self.is_excluded_element(tree, element) || self.is_excluded_position(tree, element) {
            return stats;
        }
        let pass = Pass::Incremental;
        for name in &self.config.translatable_attributes {
            let slot = Slot::Attribute(name);
            stats.merge(self.translate_attribute(tree, element, name, slot, locale, pass));
        }
        stats
    }

    /// Display value of a label-bearing input (`button`, `submit`, `reset`).
    /// Free-text fields are user data and are never touched.
    pub fn apply_to_display_value(
        &self,
        tree: &mut UiTree,
        element: NodeId,
        locale: Locale,
    ) -> PassStats {
        if !self.is_label_control(tree, element)
            || self.is_marked(tree, element)
            || self.is_excluded_position(tree, element)
        {
            return PassStats::default();
        }
        let slot = Slot::DisplayValue;
        self.translate_attribute(tree, element, VALUE_ATTRIBUTE, slot, locale, Pass::Incremental)
    }

    fn is_label_control(&self, tree: &UiTree, element: NodeId) -> bool {
        tree.tag(element) == Some("input")
            && tree
                .attribute(element, "type")
                .is_some_and(|t| self.config.is_label_input_type(t))
    }

    fn translate_attribute(
        &self,
        tree: &mut UiTree,
        element: NodeId,
        name: &str,
        slot: Slot<'_>,
        locale: Locale,
        pass: Pass,
    ) -> PassStats {
        let mut stats = PassStats::default();
        let Some(current) = tree.attribute(element, name).map(str::to_string) else {
            return stats;
        };
        if current.trim().is_empty() {
            return stats;
        }
        let Some(records) = tree.originals_mut(element) else {
            return stats;
        };
        let resolution = resolve_original(records, slot, &current, locale, pass, &self.catalog);
        let next = self.catalog.translate(&resolution.original, locale);
        let wrote = next != current && tree.set_attribute(element, name, &next).is_ok();
        stats.record(resolution.outcome, wrote);
        stats
    }

    /// Walk a freshly inserted subtree. Values that differ from their
    /// records are treated as the app's own edits.
    pub fn walk_subtree(&self, tree: &mut UiTree, root: NodeId, locale: Locale) -> PassStats {
        self.walk(tree, root, locale, Pass::Incremental)
    }

    /// Walk after a locale change. Under the source locale, values that are
    /// the engine's own translations are restored from their records.
    pub fn full_pass(&self, tree: &mut UiTree, root: NodeId, locale: Locale) -> PassStats {
        self.walk(tree, root, locale, Pass::Full)
    }

    /// Depth-first walk over `root` with an explicit stack. Excluded
    /// subtrees are pruned.
    fn walk(&self, tree: &mut UiTree, root: NodeId, locale: Locale, pass: Pass) -> PassStats {
        let mut stats = PassStats::default();
        if !tree.is_alive(root) || self.is_excluded_position(tree, root) {
            return stats;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if tree.text(node).is_some() {
                stats.merge(self.translate_text(tree, node, locale, pass));
                continue;
            }
            if self.is_excluded_element(tree, node) {
                continue;
            }
            for name in &self.config.translatable_attributes {
                let slot = Slot::Attribute(name);
                stats.merge(self.translate_attribute(tree, node, name, slot, locale, pass));
            }
            if self.is_label_control(tree, node) {
                stats.merge(self.translate_attribute(
                    tree,
                    node,
                    VALUE_ATTRIBUTE,
                    Slot::DisplayValue,
                    locale,
                    pass,
                ));
            }
            stack.extend(tree.children(node).iter().rev());
        }
        debug!(
            locale = %locale,
            ?pass,
            visited = stats.visited,
            writes = stats.writes,
            captured = stats.captured,
            adopted = stats.adopted,
            "subtree walk"
        );
        stats
    }
}
