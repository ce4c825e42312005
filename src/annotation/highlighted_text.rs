use std::rc::Rc;

use crate::annotation::context::AnnotationContext;
use crate::annotation::dom_annotation::direct_arrow;
use crate::dom::dom_model::{Dom, NodeId};
use crate::error::LocationError;
use crate::identity::fingerprint::matches_text_digest;
use crate::location::location_model::{
    ArrowPosition, LocationDescriptor, LocationMatch, Point, ResolvedPosition,
};
use crate::position::arrow::ArrowRouter;
use crate::position::resolver::{TargetGeometry, resolve_target_position};

/// Resolver for a pin on a run of highlighted text.
///
/// The text itself is the identity: the pin matches only while the range
/// between the two recorded offsets still reads as the captured text.
pub struct HighlightedTextAnnotation {
    location: LocationDescriptor,
    start_selector: String,
    end_selector: String,
    start_offset: usize,
    end_offset: usize,
    selected_text: String,
    dom: Rc<dyn Dom>,
    router: ArrowRouter,
}

impl HighlightedTextAnnotation {
    pub fn new(location: LocationDescriptor, ctx: &AnnotationContext) -> Result<Self, LocationError> {
        location.validate()?;
        let config = location
            .highlighted_text()
            .ok_or(LocationError::EmptyHighlightedText)?;
        if config.selected_text.is_empty() {
            return Err(LocationError::EmptyHighlightedText);
        }
        let start_selector = non_blank(&config.start_element_selector)
            .unwrap_or_else(|| location.selector.clone());
        if start_selector.trim().is_empty() {
            return Err(LocationError::EmptySelector { kind: "highlighted text" });
        }
        let end_selector =
            non_blank(&config.end_element_selector).unwrap_or_else(|| start_selector.clone());

        Ok(Self {
            start_selector,
            end_selector,
            start_offset: config.start_node_offset,
            end_offset: config.end_node_offset,
            selected_text: config.selected_text.clone(),
            location,
            dom: ctx.dom.clone(),
            router: ArrowRouter::new(ctx.arrow),
        })
    }

    pub fn location(&self) -> &LocationDescriptor {
        &self.location
    }

    fn locate(&self) -> Option<TargetGeometry> {
        let target = self.dom.query_selector(&self.start_selector)?;
        Some(resolve_target_position(
            self.dom.as_ref(),
            target,
            self.location.x,
            self.location.y,
            self.router.settings.right_boundary,
        ))
    }

    /// Text between the two recorded offsets, or `None` when either end is
    /// gone or unrendered or the offsets no longer fit the text.
    fn range_text(&self) -> Option<String> {
        let dom = self.dom.as_ref();
        let start = dom.query_selector(&self.start_selector)?;
        let end = dom.query_selector(&self.end_selector)?;
        if dom.is_hidden(start) || dom.is_hidden(end) {
            return None;
        }

        let root = topmost_ancestor(dom, start);
        let from = text_start(dom, root, start)? + self.start_offset;
        let to = text_start(dom, root, end)? + self.end_offset;
        let text: Vec<char> = dom.text_content(root).chars().collect();
        if from > to || to > text.len() {
            return None;
        }
        Some(text[from..to].iter().collect())
    }

    pub async fn get_position(&self) -> Option<ResolvedPosition> {
        self.locate().map(|geometry| geometry.position)
    }

    pub async fn get_match_type(&self) -> LocationMatch {
        let matched = self.range_text().is_some_and(|text| {
            text == self.selected_text || matches_text_digest(&text, &self.selected_text)
        });
        if matched {
            LocationMatch::Exact
        } else {
            LocationMatch::None
        }
    }

    pub async fn is_outside_scroll(&self) -> bool {
        self.locate().is_some_and(|g| !g.position.visible)
    }

    pub async fn scroll_to(&self) {
        if let Some(target) = self.locate().and_then(|g| g.position.target) {
            self.dom.scroll_into_view(target);
        }
    }

    pub async fn get_position_for_arrow(&self, from: Point) -> Option<ArrowPosition> {
        let geometry = self.locate()?;
        Some(direct_arrow(&self.router, self.dom.as_ref(), from, &geometry, true))
    }
}

fn non_blank(selector: &str) -> Option<String> {
    (!selector.trim().is_empty()).then(|| selector.to_string())
}

fn topmost_ancestor(dom: &dyn Dom, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(parent) = dom.parent(current) {
        current = parent;
    }
    current
}

/// Character offset at which `target`'s text begins inside `root`'s text.
/// An element's own text precedes that of its children.
fn text_start(dom: &dyn Dom, root: NodeId, target: NodeId) -> Option<usize> {
    if root == target {
        return Some(0);
    }
    let children = dom.children(root);
    let child_lengths: Vec<usize> = children
        .iter()
        .map(|child| dom.text_content(*child).chars().count())
        .collect();
    let own = dom
        .text_content(root)
        .chars()
        .count()
        .saturating_sub(child_lengths.iter().sum::<usize>());

    let mut offset = own;
    for (child, length) in children.into_iter().zip(child_lengths) {
        if let Some(inner) = text_start(dom, child, target) {
            return Some(offset + inner);
        }
        offset += length;
    }
    None
}
