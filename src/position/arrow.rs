use serde::{Deserialize, Serialize};

use crate::dom::dom_model::Viewport;
use crate::location::location_model::{ArrowPosition, Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowSettings {
    pub pointer_width: f64,
    pub pointer_height: f64,
    /// Minimum distance kept between a clamped arrow tip and the screen edge.
    pub gap_vs_screen_edge: f64,
    /// Right edge of the annotatable area (e.g. where a sidebar starts).
    pub right_boundary: Option<f64>,
}

impl Default for ArrowSettings {
    fn default() -> Self {
        Self {
            pointer_width: 24.0,
            pointer_height: 24.0,
            gap_vs_screen_edge: 10.0,
            right_boundary: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowDirection {
    Up,
    Down,
    Left,
    Right,
}

/// A pointer line ready to draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowRoute {
    pub from: Point,
    pub to: Point,
    pub direction: ArrowDirection,
    pub within_scroll: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowRouter {
    pub settings: ArrowSettings,
}

impl ArrowRouter {
    pub fn new(settings: ArrowSettings) -> Self {
        Self { settings }
    }

    pub fn right_boundary(&self, viewport: Viewport) -> f64 {
        self.settings.right_boundary.unwrap_or(viewport.width)
    }

    /// Pin icons sit above and to the right of the pinned point, so a line
    /// coming down from above has to stop at the top of the icon instead.
    pub fn adjust_for_pointer_icon(&self, from: Point, target: Point, highlighted_text: bool) -> Point {
        if highlighted_text || target.y <= from.y {
            return target;
        }
        Point::new(
            target.x + self.settings.pointer_width / 2.0,
            target.y - self.settings.pointer_height,
        )
    }

    /// Stand-in tip for a pin outside the visible area: the nearest point on
    /// the viewport (or on the scroll container the pin is clipped by),
    /// pulled inwards by the screen-edge gap.
    pub fn clamp_out_of_view(
        &self,
        point: Point,
        viewport: Viewport,
        scroll_container: Option<Rect>,
    ) -> ArrowPosition {
        let right = self.right_boundary(viewport);
        let (mut to_x, mut to_y) = (point.x, point.y);
        let mut vertical = 0.0;
        let mut horizontal = 0.0;

        if point.y < 0.0 {
            vertical = 1.0;
            to_y = 0.0;
        } else if point.y > viewport.height {
            vertical = -1.0;
            to_y = viewport.height;
        }
        if point.x < 0.0 {
            horizontal = 1.0;
            to_x = 0.0;
        } else if point.x > right {
            horizontal = -1.0;
            to_x = right;
        }

        if let Some(container) = scroll_container {
            if point.y < container.top() {
                vertical = 1.0;
                to_y = to_y.max(container.top());
            } else if point.y > container.bottom() {
                vertical = -1.0;
                to_y = to_y.min(container.bottom());
            }
            if point.x < container.left() {
                horizontal = 1.0;
                to_x = to_x.max(container.left());
            } else if point.x > container.right() {
                horizontal = -1.0;
                to_x = to_x.min(container.right());
            }
        }

        let gap = self.settings.gap_vs_screen_edge;
        ArrowPosition::new(
            Point::new(to_x + horizontal * gap, to_y + vertical * gap),
            false,
        )
    }

    /// Keep an arrow computed in a child frame on screen in the parent.
    pub fn clamp_to_viewport(&self, arrow: ArrowPosition, viewport: Viewport) -> ArrowPosition {
        let gap = self.settings.gap_vs_screen_edge;
        let right = self.right_boundary(viewport);
        let mut clamped = arrow;

        if arrow.y_vs_viewport < 0.0 {
            clamped.y_vs_viewport = gap;
            clamped.within_scroll = false;
        } else if arrow.y_vs_viewport > viewport.height {
            clamped.y_vs_viewport = viewport.height - gap;
            clamped.within_scroll = false;
        }
        if arrow.x_vs_viewport < 0.0 {
            clamped.x_vs_viewport = gap;
            clamped.within_scroll = false;
        } else if arrow.x_vs_viewport > right {
            clamped.x_vs_viewport = right - gap;
            clamped.within_scroll = false;
        }
        clamped
    }

    pub fn route(&self, from: Point, arrow: ArrowPosition) -> ArrowRoute {
        let to = arrow.point();
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let direction = if dy.abs() >= dx.abs() {
            if dy > 0.0 { ArrowDirection::Down } else { ArrowDirection::Up }
        } else if dx > 0.0 {
            ArrowDirection::Right
        } else {
            ArrowDirection::Left
        };
        ArrowRoute {
            from,
            to,
            direction,
            within_scroll: arrow.within_scroll,
        }
    }
}
