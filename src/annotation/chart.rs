use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::annotation::context::AnnotationContext;
use crate::dom::dom_model::{Dom, NodeId};
use crate::error::LocationError;
use crate::location::location_model::{
    ArrowPosition, ChartData, LocationDescriptor, LocationMatch, Point, Rect, ResolvedPosition,
};
use crate::position::arrow::ArrowRouter;
use crate::position::resolver::point_in_viewport;

// ============================================================================
// Chart capability
// ============================================================================

/// What an annotation may ask of a rendered chart.
pub trait ChartHost {
    /// Element wrapping the whole chart; used for scrolling.
    fn container(&self) -> NodeId;

    /// Viewport box of the plotting area, excluding axes and legend.
    fn plot_area(&self) -> Rect;

    /// Where the data point `(x, y)` of `series_id` is drawn right now.
    fn point_vs_viewport(&self, series_id: &str, x: f64, y: f64) -> Option<Point>;
}

/// A plotted data point and where it is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub series_id: String,
    pub x: f64,
    pub y: f64,
    pub position: Point,
}

/// Chart with a fixed set of plotted points. The plot area can move to
/// model the page scrolling underneath it; points move with it.
pub struct StaticChart {
    container: NodeId,
    plot_area: RefCell<Rect>,
    /// Point positions relative to the plot area's origin.
    points: Vec<ChartPoint>,
}

impl StaticChart {
    pub fn new(container: NodeId, plot_area: Rect) -> Self {
        Self {
            container,
            plot_area: RefCell::new(plot_area),
            points: Vec::new(),
        }
    }

    /// Add a point drawn at `position`, given in viewport coordinates for
    /// the current plot area.
    pub fn with_point(mut self, series_id: &str, x: f64, y: f64, position: Point) -> Self {
        let origin = *self.plot_area.borrow();
        self.points.push(ChartPoint {
            series_id: series_id.to_string(),
            x,
            y,
            position: Point::new(position.x - origin.x, position.y - origin.y),
        });
        self
    }

    pub fn set_plot_area(&self, plot_area: Rect) {
        *self.plot_area.borrow_mut() = plot_area;
    }
}

impl ChartHost for StaticChart {
    fn container(&self) -> NodeId {
        self.container
    }

    fn plot_area(&self) -> Rect {
        *self.plot_area.borrow()
    }

    fn point_vs_viewport(&self, series_id: &str, x: f64, y: f64) -> Option<Point> {
        let origin = self.plot_area();
        self.points
            .iter()
            .find(|p| p.series_id == series_id && same_value(p.x, x) && same_value(p.y, y))
            .map(|p| Point::new(origin.x + p.position.x, origin.y + p.position.y))
    }
}

fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

// ============================================================================
// Chart annotation
// ============================================================================

struct ChartGeometry {
    point: Point,
    visible: bool,
    plot_area: Rect,
    container: NodeId,
}

/// Resolver for a pin on a chart data point.
pub struct ChartAnnotation {
    location: LocationDescriptor,
    data: ChartData,
    host: Option<Weak<dyn ChartHost>>,
    dom: Rc<dyn Dom>,
    router: ArrowRouter,
}

impl ChartAnnotation {
    pub fn new(location: LocationDescriptor, ctx: &AnnotationContext) -> Result<Self, LocationError> {
        location.validate()?;
        let data = location
            .chart()
            .cloned()
            .ok_or(LocationError::IncompleteChart { field: "chart" })?;
        if data.chart_id.is_empty() {
            return Err(LocationError::IncompleteChart { field: "chartId" });
        }
        if data.series_id.is_empty() {
            return Err(LocationError::IncompleteChart { field: "seriesId" });
        }

        let host = ctx.charts.get(&data.chart_id);
        Ok(Self {
            location,
            data,
            host,
            dom: ctx.dom.clone(),
            router: ArrowRouter::new(ctx.arrow),
        })
    }

    pub fn location(&self) -> &LocationDescriptor {
        &self.location
    }

    fn locate(&self) -> Option<ChartGeometry> {
        let host = self.host.as_ref()?.upgrade()?;
        let point = host.point_vs_viewport(&self.data.series_id, self.data.x, self.data.y)?;
        let plot_area = host.plot_area();
        let container = host.container();
        let visible = !self.dom.is_hidden(container)
            && plot_area.contains(point)
            && point_in_viewport(point, self.dom.viewport(), self.router.settings.right_boundary);
        Some(ChartGeometry {
            point,
            visible,
            plot_area,
            container,
        })
    }

    pub async fn get_position(&self) -> Option<ResolvedPosition> {
        self.locate().map(|geometry| ResolvedPosition {
            x_vs_viewport: geometry.point.x,
            y_vs_viewport: geometry.point.y,
            visible: geometry.visible,
            target: Some(geometry.container),
        })
    }

    pub async fn get_match_type(&self) -> LocationMatch {
        match self.locate() {
            Some(_) => LocationMatch::Chart,
            None => LocationMatch::None,
        }
    }

    pub async fn is_outside_scroll(&self) -> bool {
        self.locate().is_some_and(|geometry| !geometry.visible)
    }

    pub async fn scroll_to(&self) {
        if let Some(host) = self.host.as_ref().and_then(Weak::upgrade) {
            self.dom.scroll_into_view(host.container());
        }
    }

    pub async fn get_position_for_arrow(&self, from: Point) -> Option<ArrowPosition> {
        let geometry = self.locate()?;
        if geometry.visible {
            let to = self.router.adjust_for_pointer_icon(from, geometry.point, false);
            return Some(ArrowPosition::new(to, true));
        }
        Some(self.router.clamp_out_of_view(
            geometry.point,
            self.dom.viewport(),
            Some(geometry.plot_area),
        ))
    }
}
