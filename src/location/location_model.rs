use serde::{Deserialize, Serialize};

use crate::dom::dom_model::NodeId;
use crate::error::LocationError;

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A bounding box in viewport coordinates, shaped like `DOMRect`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Edges are inclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// True for elements that take no space (e.g. `display: none`).
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

// ============================================================================
// Location Descriptor
// ============================================================================

/// Versioned structural fingerprint captured alongside a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementIdentifier {
    pub identifier: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactTreeData {
    /// Stable virtualization key; survives row recycling.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tree_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub chart_id: String,
    pub series_id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultimediaData {
    pub current_time: f64,
}

/// A selected run of text, from a character offset inside the start
/// element's text to one inside the end element's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightedTextConfig {
    /// Empty means the descriptor's own selector.
    #[serde(default)]
    pub start_element_selector: String,
    /// Empty means the start element.
    #[serde(default)]
    pub end_element_selector: String,
    #[serde(default)]
    pub start_node_offset: usize,
    pub end_node_offset: usize,
    /// Captured text, verbatim or as a salted digest.
    pub selected_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_to_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalTargetData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub react_tree: Option<ReactTreeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multimedia: Option<MultimediaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_text_config: Option<HighlightedTextConfig>,
}

/// The portable value identifying a pinned point. Created once at capture
/// time and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDescriptor {
    /// Best-effort CSS selector; not guaranteed unique.
    pub selector: String,
    /// Fraction of the target's width, in `[0, 1]`.
    pub x: f64,
    /// Fraction of the target's height, in `[0, 1]`.
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_identifier: Option<ElementIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_target_data: Option<AdditionalTargetData>,
    /// Selectors of nested iframes, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub iframe_selectors: Vec<String>,
}

impl LocationDescriptor {
    pub fn new(selector: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            selector: selector.into(),
            x,
            y,
            element_identifier: None,
            additional_target_data: None,
            iframe_selectors: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>, version: u32) -> Self {
        self.element_identifier = Some(ElementIdentifier {
            identifier: identifier.into(),
            version,
        });
        self
    }

    pub fn with_target_data(mut self, data: AdditionalTargetData) -> Self {
        self.additional_target_data = Some(data);
        self
    }

    pub fn with_iframe_selectors(mut self, selectors: Vec<String>) -> Self {
        self.iframe_selectors = selectors;
        self
    }

    pub fn react_tree(&self) -> Option<&ReactTreeData> {
        self.additional_target_data.as_ref()?.react_tree.as_ref()
    }

    pub fn chart(&self) -> Option<&ChartData> {
        self.additional_target_data.as_ref()?.chart.as_ref()
    }

    pub fn multimedia(&self) -> Option<&MultimediaData> {
        self.additional_target_data.as_ref()?.multimedia.as_ref()
    }

    pub fn highlighted_text(&self) -> Option<&HighlightedTextConfig> {
        self.additional_target_data
            .as_ref()?
            .highlighted_text_config
            .as_ref()
    }

    /// Copy of this descriptor addressed to the next frame down.
    pub fn without_outer_frame(&self) -> Self {
        let mut inner = self.clone();
        if !inner.iframe_selectors.is_empty() {
            inner.iframe_selectors.remove(0);
        }
        inner
    }

    /// Data-integrity checks shared by every target kind.
    pub fn validate(&self) -> Result<(), LocationError> {
        for (axis, value) in [("x", self.x), ("y", self.y)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(LocationError::OffsetOutOfRange { axis, value });
            }
        }
        if let Some(ElementIdentifier { identifier, .. }) = &self.element_identifier {
            if identifier.is_empty() {
                return Err(LocationError::EmptyIdentifier);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Resolution results
// ============================================================================

/// Confidence verdict when re-resolving a descriptor.
///
/// Declaration order is confidence order: `Exact` is the most confident and
/// compares smallest. The ordering is for ranking only, not arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMatch {
    Exact,
    Stale,
    MaybeStale,
    Chart,
    Multimedia,
    OutsideAccessibleVirtualisedList,
    OutsideInaccessibleVirtualisedList,
    None,
}

/// Viewport-relative pin position. Recomputed on every tick, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPosition {
    pub x_vs_viewport: f64,
    pub y_vs_viewport: f64,
    pub visible: bool,
    #[serde(skip)]
    pub target: Option<NodeId>,
}

impl ResolvedPosition {
    /// Placeholder for a target that exists logically but has no rendered
    /// element right now.
    pub fn not_rendered() -> Self {
        Self {
            x_vs_viewport: 0.0,
            y_vs_viewport: 0.0,
            visible: false,
            target: None,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x_vs_viewport, self.y_vs_viewport)
    }
}

/// Where a pointer line should terminate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowPosition {
    pub x_vs_viewport: f64,
    pub y_vs_viewport: f64,
    /// False when the arrow points at a stand-in (scroll edge, container
    /// edge) instead of the pin itself.
    pub within_scroll: bool,
}

impl ArrowPosition {
    pub fn new(point: Point, within_scroll: bool) -> Self {
        Self {
            x_vs_viewport: point.x,
            y_vs_viewport: point.y,
            within_scroll,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x_vs_viewport, self.y_vs_viewport)
    }
}

/// Fractional-offset invariant: the pin scales with the element.
pub fn fractional_point(rect: &Rect, x: f64, y: f64) -> Point {
    Point::new(rect.x + x * rect.width, rect.y + y * rect.height)
}
