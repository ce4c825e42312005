use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dom::dom_model::NodeId;

/// One logical node of a virtualized tree, rendered or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntity {
    pub key: String,
    /// Depth, roots at 0.
    pub level: u32,
    /// Index path through the tree, e.g. `0-2-1`.
    pub pos: String,
}

pub type AncestorInfo = TreeEntity;

/// Where a logical node sits relative to the rows currently scrolled into
/// view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodePositionVsScroll {
    Above,
    Within,
    Below,
    NotPresent,
}

/// What an annotation may ask of a virtualized list/tree it points into.
///
/// Implementations own all recycling and expansion state; annotations only
/// hold a weak handle to this capability and look nodes up by key.
#[async_trait(?Send)]
pub trait VirtualizedTree {
    fn is_visible(&self) -> bool;

    fn is_node_in_tree(&self, key: &str) -> bool;

    /// Rendered element for `key`, if its row is on screen right now.
    fn get_visible_tree_node(&self, key: &str) -> Option<NodeId>;

    /// Ancestors of `key`, root first. `None` if the key is unknown.
    fn get_ancestors(&self, key: &str) -> Option<Vec<AncestorInfo>>;

    fn is_node_expanded(&self, key: &str) -> bool;

    fn get_node_position_vs_scroll(&self, key: &str) -> NodePositionVsScroll;

    /// Expand whatever hides `key` and scroll its row into view.
    async fn scroll_to_key(&self, key: &str);

    fn outer_container(&self) -> NodeId;
}
