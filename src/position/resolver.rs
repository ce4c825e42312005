use crate::dom::dom_model::{Dom, NodeId, Viewport};
use crate::location::location_model::{Point, Rect, ResolvedPosition, fractional_point};

/// A resolved position plus the clipping box that decided its visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetGeometry {
    pub position: ResolvedPosition,
    pub target_rect: Rect,
    /// Nearest scrolling ancestor, if the target lives inside one.
    pub scroll_container: Option<Rect>,
}

/// Viewport coordinates of the pin on `target`, at fractional offset
/// `(x, y)` of its current bounding box.
///
/// The pin counts as visible when the element is not hidden and the point
/// sits inside the viewport (up to `right_boundary`, which defaults to the
/// viewport width) and inside every scrolling ancestor.
pub fn resolve_target_position(
    dom: &dyn Dom,
    target: NodeId,
    x: f64,
    y: f64,
    right_boundary: Option<f64>,
) -> TargetGeometry {
    let target_rect = dom.bounding_client_rect(target);
    let point = fractional_point(&target_rect, x, y);
    let viewport = dom.viewport();

    let mut scroll_container = None;
    let mut inside_scroll_parents = true;
    let mut current = dom.parent(target);
    while let Some(ancestor) = current {
        if dom.is_scroll_container(ancestor) {
            let rect = dom.bounding_client_rect(ancestor);
            scroll_container.get_or_insert(rect);
            inside_scroll_parents &= rect.contains(point);
        }
        current = dom.parent(ancestor);
    }

    let visible = !dom.is_hidden(target)
        && point_in_viewport(point, viewport, right_boundary)
        && inside_scroll_parents;

    TargetGeometry {
        position: ResolvedPosition {
            x_vs_viewport: point.x,
            y_vs_viewport: point.y,
            visible,
            target: Some(target),
        },
        target_rect,
        scroll_container,
    }
}

pub fn point_in_viewport(point: Point, viewport: Viewport, right_boundary: Option<f64>) -> bool {
    let right = right_boundary.unwrap_or(viewport.width);
    point.x >= 0.0 && point.x <= right && point.y >= 0.0 && point.y <= viewport.height
}

/// Map a position computed inside an iframe into the parent's viewport.
pub fn frame_position_to_viewport(
    position: ResolvedPosition,
    iframe_rect: Rect,
    parent_viewport: Viewport,
) -> ResolvedPosition {
    let point = Point::new(
        position.x_vs_viewport + iframe_rect.x,
        position.y_vs_viewport + iframe_rect.y,
    );
    ResolvedPosition {
        x_vs_viewport: point.x,
        y_vs_viewport: point.y,
        visible: position.visible && point_in_viewport(point, parent_viewport, None),
        // Child-document handles mean nothing to the parent.
        target: None,
    }
}
