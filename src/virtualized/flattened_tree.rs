use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::dom::dom_model::{Dom, NodeId};
use crate::virtualized::tree::{AncestorInfo, NodePositionVsScroll, TreeEntity, VirtualizedTree};

#[derive(Debug, Default)]
struct TreeState {
    /// Every node, pre-order.
    entities: Vec<TreeEntity>,
    expanded: HashSet<String>,
    /// Index (into the flattened list) of the first rendered row.
    rendered_start: usize,
}

impl TreeState {
    /// Nodes reachable through expanded parents, in display order.
    fn flattened(&self) -> Vec<&TreeEntity> {
        let mut out = Vec::new();
        let mut collapsed_at: Option<u32> = None;
        for entity in &self.entities {
            if let Some(level) = collapsed_at {
                if entity.level > level {
                    continue;
                }
                collapsed_at = None;
            }
            out.push(entity);
            if !self.expanded.contains(&entity.key) {
                collapsed_at = Some(entity.level);
            }
        }
        out
    }

    fn flattened_index(&self, key: &str) -> Option<usize> {
        self.flattened().iter().position(|e| e.key == key)
    }
}

/// Keys of the temporary entities a tree inserts while animating an
/// expand or collapse contain this marker.
pub const MOTION_PLACEHOLDER_MARKER: &str = "RC_TREE_MOTION";

fn is_motion_placeholder(key: &str) -> bool {
    key.contains(MOTION_PLACEHOLDER_MARKER)
}

/// A virtualized tree that renders a window of its flattened node list into
/// a fixed pool of recycled row elements.
///
/// Rows are the children of `node_container`; row `i` shows flattened node
/// `rendered_start + i`. A row counts as visible when it lies entirely
/// within the outer container's box.
pub struct FlattenedTree {
    dom: Rc<dyn Dom>,
    outer_container: NodeId,
    node_container: NodeId,
    expand_delay: Duration,
    state: RefCell<TreeState>,
}

impl FlattenedTree {
    pub fn new(
        dom: Rc<dyn Dom>,
        outer_container: NodeId,
        node_container: NodeId,
        entities: Vec<TreeEntity>,
    ) -> Self {
        Self {
            dom,
            outer_container,
            node_container,
            expand_delay: Duration::from_millis(100),
            state: RefCell::new(TreeState {
                entities,
                ..TreeState::default()
            }),
        }
    }

    pub fn with_expanded<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .borrow_mut()
            .expanded
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_expand_delay(mut self, delay: Duration) -> Self {
        self.expand_delay = delay;
        self
    }

    pub fn expand(&self, key: &str) {
        self.state.borrow_mut().expanded.insert(key.to_string());
    }

    pub fn collapse(&self, key: &str) {
        self.state.borrow_mut().expanded.remove(key);
    }

    pub fn set_rendered_start(&self, start: usize) {
        self.state.borrow_mut().rendered_start = start;
    }

    pub fn rendered_start(&self) -> usize {
        self.state.borrow().rendered_start
    }

    pub fn flattened_keys(&self) -> Vec<String> {
        self.state
            .borrow()
            .flattened()
            .into_iter()
            .map(|e| e.key.clone())
            .collect()
    }

    fn rows(&self) -> Vec<NodeId> {
        self.dom.children(self.node_container)
    }

    fn is_row_visible(&self, row: NodeId) -> bool {
        let outer = self.dom.bounding_client_rect(self.outer_container);
        if outer.is_empty() {
            return false;
        }
        let rect = self.dom.bounding_client_rect(row);
        rect.top() >= outer.top() && rect.bottom() <= outer.bottom()
    }

    /// Flattened-index range `[start, end)` of rows fully on screen.
    fn visible_item_range(&self) -> Option<(usize, usize)> {
        let rows = self.rows();
        let first = rows.iter().position(|row| self.is_row_visible(*row))?;
        let last = rows.iter().rposition(|row| self.is_row_visible(*row))?;
        let start = self.rendered_start();
        Some((start + first, start + last + 1))
    }
}

#[async_trait(?Send)]
impl VirtualizedTree for FlattenedTree {
    fn is_visible(&self) -> bool {
        !self.dom.is_hidden(self.outer_container)
            && !self.dom.bounding_client_rect(self.outer_container).is_empty()
    }

    fn is_node_in_tree(&self, key: &str) -> bool {
        self.state.borrow().entities.iter().any(|e| e.key == key)
    }

    fn get_visible_tree_node(&self, key: &str) -> Option<NodeId> {
        let (index, start) = {
            let state = self.state.borrow();
            (state.flattened_index(key)?, state.rendered_start)
        };
        let row = *self.rows().get(index.checked_sub(start)?)?;
        self.is_row_visible(row).then_some(row)
    }

    fn get_ancestors(&self, key: &str) -> Option<Vec<AncestorInfo>> {
        let state = self.state.borrow();
        let index = state.entities.iter().position(|e| e.key == key)?;
        let entity = &state.entities[index];

        let mut ancestors = Vec::new();
        let (mut level, mut pos) = (entity.level, entity.pos.as_str());
        for node in state.entities[..index].iter().rev() {
            let is_prefix = pos
                .strip_prefix(node.pos.as_str())
                .is_some_and(|rest| rest.starts_with('-'));
            if node.level >= level || !is_prefix || is_motion_placeholder(&node.key) {
                continue;
            }
            ancestors.push(node.clone());
            level = node.level;
            pos = node.pos.as_str();
        }
        ancestors.reverse();
        Some(ancestors)
    }

    fn is_node_expanded(&self, key: &str) -> bool {
        self.state.borrow().expanded.contains(key)
    }

    fn get_node_position_vs_scroll(&self, key: &str) -> NodePositionVsScroll {
        let Some(index) = self.state.borrow().flattened_index(key) else {
            return NodePositionVsScroll::NotPresent;
        };
        let (start, end) = match self.visible_item_range() {
            Some(range) => range,
            None => {
                let start = self.rendered_start();
                (start, start)
            }
        };
        if index < start {
            NodePositionVsScroll::Above
        } else if index < end {
            NodePositionVsScroll::Within
        } else {
            NodePositionVsScroll::Below
        }
    }

    async fn scroll_to_key(&self, key: &str) {
        let Some(ancestors) = self.get_ancestors(key) else {
            debug!(key, "scroll_to_key: key not in tree");
            return;
        };
        for ancestor in ancestors {
            if self.is_node_expanded(&ancestor.key) {
                continue;
            }
            self.expand(&ancestor.key);
            tokio::time::sleep(self.expand_delay).await;
        }

        let index = self.state.borrow().flattened_index(key);
        if let Some(index) = index {
            let last_start = self
                .state
                .borrow()
                .flattened()
                .len()
                .saturating_sub(self.rows().len());
            self.set_rendered_start(index.min(last_start));
        }
        tokio::time::sleep(self.expand_delay).await;
    }

    fn outer_container(&self) -> NodeId {
        self.outer_container
    }
}
