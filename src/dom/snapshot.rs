use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dom::dom_model::{Dom, ElementInfo, NodeId, Viewport};
use crate::dom::selector::Selector;
use crate::error::SnapshotError;
use crate::location::location_model::Rect;

// ============================================================================
// Serialized form
// ============================================================================

/// One element as captured in a page snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub parent: Option<NodeId>,
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub rect: Rect,
    /// Text directly owned by this element (children contribute their own).
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub scroll_container: bool,
    #[serde(default)]
    pub media_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

// ============================================================================
// In-memory document
// ============================================================================

#[derive(Debug, Default)]
struct DocumentState {
    nodes: HashMap<NodeId, NodeRecord>,
    children: HashMap<NodeId, Vec<NodeId>>,
    roots: Vec<NodeId>,
    viewport: Viewport,
    next_id: u64,
    scroll_requests: Vec<NodeId>,
}

impl DocumentState {
    fn insert(&mut self, record: NodeRecord) {
        self.next_id = self.next_id.max(record.id.0 + 1);
        match record.parent {
            Some(parent) => self.children.entry(parent).or_default().push(record.id),
            None => self.roots.push(record.id),
        }
        self.nodes.insert(record.id, record);
    }

    fn descendants_in_order(&self, from: &[NodeId], out: &mut Vec<NodeId>) {
        for node in from {
            out.push(*node);
            if let Some(children) = self.children.get(node) {
                self.descendants_in_order(children, out);
            }
        }
    }
}

/// Every parent must exist and every chain must end at a root.
fn check_parent_chains(parents: &HashMap<NodeId, Option<NodeId>>) -> Result<(), SnapshotError> {
    let mut rooted = HashSet::new();
    for &start in parents.keys() {
        let mut chain = HashSet::new();
        let mut current = start;
        while !rooted.contains(&current) {
            if !chain.insert(current) {
                return Err(SnapshotError::ParentCycle(current.0));
            }
            match parents.get(&current) {
                Some(Some(parent)) if !parents.contains_key(parent) => {
                    return Err(SnapshotError::UnknownParent {
                        node: current.0,
                        parent: parent.0,
                    });
                }
                Some(Some(parent)) => current = *parent,
                _ => break,
            }
        }
        rooted.extend(chain);
    }
    Ok(())
}

/// A mutable document held entirely in memory.
///
/// Backs the CLI (loaded from a page snapshot) and stands in for a live page
/// in tests: host-page mutations are modelled with the `set_*`/`remove`
/// helpers, all of which work through `&self` so the document can be shared
/// behind an `Rc<dyn Dom>`.
#[derive(Debug, Default)]
pub struct SnapshotDom {
    state: RefCell<DocumentState>,
}

impl SnapshotDom {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: RefCell::new(DocumentState {
                viewport,
                ..DocumentState::default()
            }),
        }
    }

    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Result<Self, SnapshotError> {
        let dom = Self::new(snapshot.viewport);
        {
            let mut state = dom.state.borrow_mut();
            let mut parents = HashMap::new();
            for record in &snapshot.nodes {
                if parents.insert(record.id, record.parent).is_some() {
                    return Err(SnapshotError::DuplicateNode(record.id.0));
                }
            }
            check_parent_chains(&parents)?;
            for record in snapshot.nodes {
                state.insert(NodeRecord {
                    tag: record.tag.to_lowercase(),
                    ..record
                });
            }
        }
        Ok(dom)
    }

    /// Append a new element as the last child of `parent` (or as a root).
    pub fn append(&self, parent: Option<NodeId>, info: ElementInfo, rect: Rect) -> NodeId {
        let mut state = self.state.borrow_mut();
        let id = NodeId(state.next_id);
        state.insert(NodeRecord {
            id,
            parent,
            tag: info.tag,
            attributes: info.attributes,
            rect,
            text: String::new(),
            hidden: false,
            scroll_container: false,
            media_time: None,
        });
        id
    }

    /// Detach `node` and its whole subtree. Returns the removed ids in
    /// document order.
    pub fn remove(&self, node: NodeId) -> Vec<NodeId> {
        let mut state = self.state.borrow_mut();
        let parent = match state.nodes.get(&node) {
            Some(record) => record.parent,
            None => return Vec::new(),
        };
        match parent {
            Some(parent) => {
                if let Some(siblings) = state.children.get_mut(&parent) {
                    siblings.retain(|n| *n != node);
                }
            }
            None => state.roots.retain(|n| *n != node),
        }
        let mut subtree = Vec::new();
        state.descendants_in_order(&[node], &mut subtree);
        for id in &subtree {
            state.nodes.remove(id);
            state.children.remove(id);
        }
        subtree
    }

    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        self.update(node, |record| record.rect = rect);
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.update(node, |record| {
            record.attributes.insert(name.to_string(), value.to_string());
        });
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        self.update(node, |record| {
            record.attributes.remove(name);
        });
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        self.update(node, |record| record.text = text.to_string());
    }

    pub fn set_hidden(&self, node: NodeId, hidden: bool) {
        self.update(node, |record| record.hidden = hidden);
    }

    pub fn set_scroll_container(&self, node: NodeId, scroll_container: bool) {
        self.update(node, |record| record.scroll_container = scroll_container);
    }

    pub fn set_media_time(&self, node: NodeId, time: Option<f64>) {
        self.update(node, |record| record.media_time = time);
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.borrow_mut().viewport = viewport;
    }

    /// Nodes passed to `scroll_into_view`, oldest first.
    pub fn scroll_requests(&self) -> Vec<NodeId> {
        self.state.borrow().scroll_requests.clone()
    }

    fn update(&self, node: NodeId, f: impl FnOnce(&mut NodeRecord)) {
        if let Some(record) = self.state.borrow_mut().nodes.get_mut(&node) {
            f(record);
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let state = self.state.borrow();
        if let Some(record) = state.nodes.get(&node) {
            out.push_str(&record.text);
        }
        let children = state.children.get(&node).cloned().unwrap_or_default();
        drop(state);
        for child in children {
            self.collect_text(child, out);
        }
    }
}

impl Dom for SnapshotDom {
    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let parsed = Selector::parse(selector)?;
        let order = {
            let state = self.state.borrow();
            let mut order = Vec::new();
            state.descendants_in_order(&state.roots, &mut order);
            order
        };
        order.into_iter().find(|node| parsed.matches(self, *node))
    }

    fn element(&self, node: NodeId) -> Option<ElementInfo> {
        self.state.borrow().nodes.get(&node).map(|record| ElementInfo {
            tag: record.tag.clone(),
            attributes: record.attributes.clone(),
        })
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().nodes.get(&node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state
            .borrow()
            .children
            .get(&node)
            .cloned()
            .unwrap_or_default()
    }

    fn bounding_client_rect(&self, node: NodeId) -> Rect {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|record| record.rect)
            .unwrap_or_default()
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        let state = self.state.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            match state.nodes.get(&id) {
                Some(record) if record.hidden => return true,
                Some(record) => current = record.parent,
                None => return true,
            }
        }
        false
    }

    fn is_scroll_container(&self, node: NodeId) -> bool {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .is_some_and(|record| record.scroll_container)
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    fn scroll_into_view(&self, node: NodeId) {
        self.state.borrow_mut().scroll_requests.push(node);
    }

    fn media_current_time(&self, node: NodeId) -> Option<f64> {
        self.state.borrow().nodes.get(&node)?.media_time
    }

    fn set_media_current_time(&self, node: NodeId, time: f64) -> bool {
        let mut state = self.state.borrow_mut();
        match state.nodes.get_mut(&node) {
            Some(record) if record.media_time.is_some() => {
                record.media_time = Some(time);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (SnapshotDom, NodeId, NodeId, NodeId) {
        let dom = SnapshotDom::new(Viewport::default());
        let body = dom.append(None, ElementInfo::new("body"), Rect::new(0.0, 0.0, 1280.0, 800.0));
        let list = dom.append(
            Some(body),
            ElementInfo::new("ul").with_attribute("class", "list"),
            Rect::default(),
        );
        let item = dom.append(
            Some(list),
            ElementInfo::new("li").with_attribute("class", "row x"),
            Rect::new(10.0, 10.0, 100.0, 20.0),
        );
        (dom, body, list, item)
    }

    #[test]
    fn query_selector_walks_document_order() {
        let (dom, _, list, item) = sample();
        assert_eq!(dom.query_selector("ul.list > li.x"), Some(item));
        assert_eq!(dom.query_selector("body li"), Some(item));
        assert_eq!(dom.query_selector(".list"), Some(list));
        assert_eq!(dom.query_selector("body > li"), None);
        assert_eq!(dom.query_selector("not a (selector"), None);
    }

    #[test]
    fn remove_detaches_subtree() {
        let (dom, _, list, item) = sample();
        assert_eq!(dom.remove(list), vec![list, item]);
        assert_eq!(dom.element(item), None);
        assert!(dom.is_hidden(item));
        assert_eq!(dom.query_selector("li"), None);
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let (dom, body, _, item) = sample();
        assert!(!dom.is_hidden(item));
        dom.set_hidden(body, true);
        assert!(dom.is_hidden(item));
    }

    fn record(id: u64, parent: Option<u64>) -> NodeRecord {
        NodeRecord {
            id: NodeId(id),
            parent: parent.map(NodeId),
            tag: "div".into(),
            attributes: BTreeMap::new(),
            rect: Rect::default(),
            text: String::new(),
            hidden: false,
            scroll_container: false,
            media_time: None,
        }
    }

    fn load(nodes: Vec<NodeRecord>) -> Result<SnapshotDom, SnapshotError> {
        SnapshotDom::from_snapshot(DocumentSnapshot {
            viewport: Viewport::default(),
            nodes,
        })
    }

    #[test]
    fn snapshot_rejects_unknown_parent() {
        assert!(matches!(
            load(vec![record(1, Some(7))]),
            Err(SnapshotError::UnknownParent { node: 1, parent: 7 })
        ));
    }

    #[test]
    fn snapshot_rejects_parent_cycles() {
        let result = load(vec![record(1, None), record(2, Some(3)), record(3, Some(2))]);
        assert!(matches!(result, Err(SnapshotError::ParentCycle(2 | 3))));

        let result = load(vec![record(4, Some(4))]);
        assert!(matches!(result, Err(SnapshotError::ParentCycle(4))));
    }

    #[test]
    fn snapshot_accepts_children_listed_before_parents() {
        let dom = load(vec![record(3, Some(2)), record(2, Some(1)), record(1, None)]).unwrap();
        assert_eq!(dom.parent(NodeId(3)), Some(NodeId(2)));
        assert!(!dom.is_hidden(NodeId(3)));
    }
}
