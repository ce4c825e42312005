use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::location_model::Rect;

/// Handle to an element in a document. Holding one never keeps the element
/// alive; lookups on a removed node simply come back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl Viewport {
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Static facts about an element: what fingerprinting and selector matching
/// look at.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ElementInfo {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes
            .get("id")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace())
            .into_iter()
            .flatten()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Read/act capability over one document (the top page or one frame).
///
/// Everything the resolvers need from a live page goes through here, so the
/// core never touches a concrete DOM binding.
pub trait Dom {
    /// First element matching `selector` in document order. Malformed
    /// selectors match nothing.
    fn query_selector(&self, selector: &str) -> Option<NodeId>;

    fn element(&self, node: NodeId) -> Option<ElementInfo>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Viewport-relative box. Detached nodes report an empty rect.
    fn bounding_client_rect(&self, node: NodeId) -> Rect;

    fn is_hidden(&self, node: NodeId) -> bool;

    /// Whether the element clips and scrolls its content (`overflow` other
    /// than `visible`/`hidden`).
    fn is_scroll_container(&self, node: NodeId) -> bool;

    fn text_content(&self, node: NodeId) -> String;

    fn viewport(&self) -> Viewport;

    fn scroll_into_view(&self, node: NodeId);

    /// `Some` iff the node is a media element.
    fn media_current_time(&self, node: NodeId) -> Option<f64>;

    /// Returns false when the node is not a media element.
    fn set_media_current_time(&self, node: NodeId, time: f64) -> bool;
}

/// Parent chain of `node`, nearest first, excluding `node` itself.
pub fn ancestors(dom: &dyn Dom, node: NodeId) -> Vec<NodeId> {
    let mut chain = Vec::new();
    let mut current = dom.parent(node);
    while let Some(parent) = current {
        chain.push(parent);
        current = dom.parent(parent);
    }
    chain
}
