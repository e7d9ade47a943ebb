//! Host UI tree: a generational arena of element and text nodes.
//!
//! Every node owns its `OriginalRecords`; removing a node frees its slot and
//! drops the records with it, and the bumped generation makes stale handles
//! resolve to nothing. Mutations to observed nodes are reported as
//! `MutationRecord`s over a crossbeam channel, the way a DOM mutation
//! observer would see them, including writes made by the translator itself.

use std::collections::HashSet;

use crossbeam_channel as cb;
use tracing::debug;

use crate::store::OriginalRecords;

/// Attribute holding an input's display value.
pub const VALUE_ATTRIBUTE: &str = "value";

/// Stable handle to a node. Goes stale when the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    CharacterData { target: NodeId },
    Attribute { target: NodeId, name: String },
    ChildList { target: NodeId, added: Vec<NodeId> },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::CharacterData { target }
            | MutationRecord::Attribute { target, .. }
            | MutationRecord::ChildList { target, .. } => *target,
        }
    }
}

#[derive(Debug)]
pub enum TreeError {
    StaleNode,
    NotAnElement,
    NotAText,
    WouldCycle,
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::StaleNode => write!(f, "node no longer exists"),
            TreeError::NotAnElement => write!(f, "node is not an element"),
            TreeError::NotAText => write!(f, "node is not a text node"),
            TreeError::WouldCycle => write!(f, "insertion would create a cycle"),
        }
    }
}

impl std::error::Error for TreeError {}

#[derive(Debug)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
}

#[derive(Debug)]
enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    originals: OriginalRecords,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug)]
struct Observer {
    tx: cb::Sender<MutationRecord>,
    attribute_filter: HashSet<String>,
}

/// Arena-backed element/text tree.
#[derive(Debug)]
pub struct UiTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    observer: Option<Observer>,
    observation_supported: bool,
}

impl Default for UiTree {
    fn default() -> Self {
        Self::new()
    }
}

impl UiTree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            observer: None,
            observation_supported: true,
        }
    }

    /// A host that cannot report mutations. `observe` always returns None.
    pub fn without_observation() -> Self {
        Self {
            observation_supported: false,
            ..Self::new()
        }
    }

    /// Start reporting mutations. Attribute changes are reported only for
    /// names in `attribute_filter`. Replaces any previous observer.
    pub fn observe(
        &mut self,
        attribute_filter: &[String],
    ) -> Option<cb::Receiver<MutationRecord>> {
        if !self.observation_supported {
            return None;
        }
        let (tx, rx) = cb::unbounded();
        self.observer = Some(Observer {
            tx,
            attribute_filter: attribute_filter
                .iter()
                .map(|a| a.to_ascii_lowercase())
                .collect(),
        });
        Some(rx)
    }

    pub fn disconnect(&mut self) {
        self.observer = None;
    }

    fn notify(&mut self, record: MutationRecord) {
        let Some(observer) = &self.observer else {
            return;
        };
        if let MutationRecord::Attribute { name, .. } = &record {
            if !observer.attribute_filter.contains(name.as_str()) {
                return;
            }
        }
        if observer.tx.send(record).is_err() {
            debug!("mutation observer dropped, disconnecting");
            self.observer = None;
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
            originals: OriginalRecords::default(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element(el) => Some(el.tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element(el) => el
                .attributes
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Concatenated text of the subtree, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(text) = self.text(current) {
                out.push_str(text);
            }
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if !self.is_element(parent) {
            return Err(if self.is_alive(parent) {
                TreeError::NotAnElement
            } else {
                TreeError::StaleNode
            });
        }
        if !self.is_alive(child) {
            return Err(TreeError::StaleNode);
        }
        if self.contains(child, parent) {
            return Err(TreeError::WouldCycle);
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        self.notify(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
        });
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(old_parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.node_mut(old_parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    /// Remove `id` and its whole subtree. Records owned by those nodes are
    /// dropped and their handles go stale.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if !self.is_alive(id) {
            return Err(TreeError::StaleNode);
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), TreeError> {
        let node = self.node_mut(id).ok_or(TreeError::StaleNode)?;
        match &mut node.kind {
            NodeKind::Text(current) => {
                if current == text {
                    return Ok(());
                }
                *current = text.to_string();
            }
            NodeKind::Element(_) => return Err(TreeError::NotAText),
        }
        self.notify(MutationRecord::CharacterData { target: id });
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let node = self.node_mut(id).ok_or(TreeError::StaleNode)?;
        let NodeKind::Element(el) = &mut node.kind else {
            return Err(TreeError::NotAnElement);
        };
        let name = name.to_ascii_lowercase();
        match el.attributes.iter().position(|(n, _)| *n == name) {
            Some(i) if el.attributes[i].1 == value => return Ok(()),
            Some(i) => el.attributes[i].1 = value.to_string(),
            None => el.attributes.push((name.clone(), value.to_string())),
        }
        self.notify(MutationRecord::Attribute { target: id, name });
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), TreeError> {
        let node = self.node_mut(id).ok_or(TreeError::StaleNode)?;
        let NodeKind::Element(el) = &mut node.kind else {
            return Err(TreeError::NotAnElement);
        };
        let before = el.attributes.len();
        el.attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        if el.attributes.len() != before {
            self.notify(MutationRecord::Attribute {
                target: id,
                name: name.to_ascii_lowercase(),
            });
        }
        Ok(())
    }

    /// Display value of a control (its `value` attribute).
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, VALUE_ATTRIBUTE)
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), TreeError> {
        self.set_attribute(id, VALUE_ATTRIBUTE, value)
    }

    #[cfg(test)]
    pub(crate) fn originals(&self, id: NodeId) -> Option<&OriginalRecords> {
        self.node(id).map(|n| &n.originals)
    }

    pub(crate) fn originals_mut(&mut self, id: NodeId) -> Option<&mut OriginalRecords> {
        self.node_mut(id).map(|n| &mut n.originals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Slot;

    #[test]
    fn builds_and_reads_back() {
        let mut tree = UiTree::new();
        let root = tree.create_element("DIV");
        let text = tree.create_text("Лента");
        tree.append_child(root, text).unwrap();
        assert_eq!(tree.tag(root), Some("div"));
        assert_eq!(tree.children(root), &[text]);
        assert_eq!(tree.parent(text), Some(root));
        assert_eq!(tree.text_content(root), "Лента");
    }

    #[test]
    fn removal_frees_subtree_and_invalidates_handles() {
        let mut tree = UiTree::new();
        let root = tree.create_element("div");
        let child = tree.create_element("span");
        let text = tree.create_text("Чат");
        tree.append_child(root, child).unwrap();
        tree.append_child(child, text).unwrap();
        assert_eq!(tree.len(), 3);

        tree.remove(child).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_alive(text));
        assert!(tree.children(root).is_empty());

        let reused = tree.create_text("Радио");
        assert_ne!(reused, text);
        assert_eq!(tree.text(text), None);
        assert!(matches!(tree.set_text(text, "x"), Err(TreeError::StaleNode)));
    }

    #[test]
    fn records_are_dropped_with_their_node() {
        let mut tree = UiTree::new();
        let text = tree.create_text("Чат");
        crate::store::resolve_original(
            tree.originals_mut(text).unwrap(),
            Slot::Text,
            "Чат",
            crate::locale::Locale::Source,
            crate::store::Pass::Full,
            &crate::translate::Catalog::empty(),
        );
        assert!(!tree.originals(text).unwrap().is_empty());
        tree.remove(text).unwrap();
        let reused = tree.create_text("Чат");
        assert!(tree.originals(reused).unwrap().is_empty());
    }

    #[test]
    fn rejects_cycles() {
        let mut tree = UiTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("div");
        tree.append_child(a, b).unwrap();
        assert!(matches!(tree.append_child(b, a), Err(TreeError::WouldCycle)));
        assert!(matches!(tree.append_child(a, a), Err(TreeError::WouldCycle)));
    }

    #[test]
    fn reports_filtered_mutations() {
        let mut tree = UiTree::new();
        let root = tree.create_element("div");
        let rx = tree.observe(&["title".to_string()]).unwrap();

        let text = tree.create_text("Привет");
        tree.append_child(root, text).unwrap();
        tree.set_text(text, "Пока").unwrap();
        tree.set_text(text, "Пока").unwrap();
        tree.set_attribute(root, "title", "Профиль").unwrap();
        tree.set_attribute(root, "class", "card").unwrap();

        let records: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            records,
            vec![
                MutationRecord::ChildList {
                    target: root,
                    added: vec![text]
                },
                MutationRecord::CharacterData { target: text },
                MutationRecord::Attribute {
                    target: root,
                    name: "title".to_string()
                },
            ]
        );
    }

    #[test]
    fn unobservable_host_never_reports() {
        let mut tree = UiTree::without_observation();
        assert!(tree.observe(&[]).is_none());
    }

    #[test]
    fn reparenting_moves_the_node() {
        let mut tree = UiTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("div");
        let t = tree.create_text("Чат");
        tree.append_child(a, t).unwrap();
        tree.append_child(b, t).unwrap();
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.parent(t), Some(b));
    }
}
