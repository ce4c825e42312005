use std::rc::Rc;

use tracing::debug;

use crate::annotation::context::AnnotationContext;
use crate::annotation::dom_annotation::direct_arrow;
use crate::dom::dom_model::Dom;
use crate::error::LocationError;
use crate::location::location_model::{
    ArrowPosition, LocationDescriptor, LocationMatch, Point, ResolvedPosition,
};
use crate::position::arrow::ArrowRouter;
use crate::position::resolver::{TargetGeometry, resolve_target_position};

/// Resolver for a pin on a video or audio element at a point in time.
pub struct MultimediaAnnotation {
    location: LocationDescriptor,
    current_time: f64,
    dom: Rc<dyn Dom>,
    router: ArrowRouter,
}

impl MultimediaAnnotation {
    pub fn new(location: LocationDescriptor, ctx: &AnnotationContext) -> Result<Self, LocationError> {
        location.validate()?;
        if location.selector.trim().is_empty() {
            return Err(LocationError::EmptySelector { kind: "multimedia" });
        }
        let current_time = location.multimedia().map(|m| m.current_time).unwrap_or(0.0);
        Ok(Self {
            location,
            current_time,
            dom: ctx.dom.clone(),
            router: ArrowRouter::new(ctx.arrow),
        })
    }

    pub fn location(&self) -> &LocationDescriptor {
        &self.location
    }

    pub fn annotated_time(&self) -> f64 {
        self.current_time
    }

    fn locate(&self) -> Option<TargetGeometry> {
        let target = self.dom.query_selector(&self.location.selector)?;
        Some(resolve_target_position(
            self.dom.as_ref(),
            target,
            self.location.x,
            self.location.y,
            self.router.settings.right_boundary,
        ))
    }

    pub async fn get_position(&self) -> Option<ResolvedPosition> {
        self.locate().map(|geometry| geometry.position)
    }

    pub async fn get_match_type(&self) -> LocationMatch {
        let Some(target) = self.locate().and_then(|g| g.position.target) else {
            return LocationMatch::None;
        };
        match self.dom.media_current_time(target) {
            Some(_) => LocationMatch::Multimedia,
            None => LocationMatch::Stale,
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
        Some(direct_arrow(&self.router, self.dom.as_ref(), from, &geometry, false))
    }

    /// Seek the media element to the moment the pin was placed at. Returns
    /// false when the target is missing or is not a media element.
    pub fn skip_media_to_annotated_time(&self) -> bool {
        let Some(target) = self.dom.query_selector(&self.location.selector) else {
            debug!(selector = %self.location.selector, "media element not found");
            return false;
        };
        self.dom.set_media_current_time(target, self.current_time)
    }
}
