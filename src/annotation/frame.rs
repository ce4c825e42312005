use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::annotation::annotation::Annotation;
use crate::annotation::context::AnnotationContext;
use crate::dom::dom_model::{Dom, NodeId};
use crate::error::LocationError;
use crate::location::location_model::{
    ArrowPosition, LocationDescriptor, LocationMatch, Point, Rect, ResolvedPosition,
};
use crate::position::arrow::ArrowRouter;
use crate::position::resolver::frame_position_to_viewport;
use crate::relay::protocol::{
    FrameId, GetAnnotationArrowPosition, GetAnnotationMatchType, GetAnnotationPosition,
    ScrollToAnnotation,
};
use crate::relay::rpc::FrameRelay;

// ============================================================================
// Frame capability
// ============================================================================

/// How the host reaches into its iframes.
pub trait FrameAccess {
    /// Address of the frame's window on the relay.
    fn frame_id(&self, iframe: NodeId) -> FrameId;

    fn is_same_origin(&self, iframe: NodeId) -> bool;

    /// Document of a same-origin frame; `None` when it cannot be read.
    fn content_document(&self, iframe: NodeId) -> Option<Rc<dyn Dom>>;
}

struct FrameEntry {
    id: FrameId,
    document: Option<Rc<dyn Dom>>,
}

/// Frames known to the host, keyed by their iframe element. A frame
/// registered without a document is cross-origin.
#[derive(Default)]
pub struct FrameTable {
    frames: RefCell<HashMap<NodeId, FrameEntry>>,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_same_origin(&self, iframe: NodeId, id: FrameId, document: Rc<dyn Dom>) {
        self.frames.borrow_mut().insert(
            iframe,
            FrameEntry {
                id,
                document: Some(document),
            },
        );
    }

    pub fn add_cross_origin(&self, iframe: NodeId, id: FrameId) {
        self.frames
            .borrow_mut()
            .insert(iframe, FrameEntry { id, document: None });
    }
}

impl FrameAccess for FrameTable {
    fn frame_id(&self, iframe: NodeId) -> FrameId {
        self.frames
            .borrow()
            .get(&iframe)
            .map(|entry| entry.id.clone())
            .unwrap_or_else(|| FrameId(iframe.to_string()))
    }

    fn is_same_origin(&self, iframe: NodeId) -> bool {
        self.frames
            .borrow()
            .get(&iframe)
            .is_some_and(|entry| entry.document.is_some())
    }

    fn content_document(&self, iframe: NodeId) -> Option<Rc<dyn Dom>> {
        self.frames.borrow().get(&iframe)?.document.clone()
    }
}

// ============================================================================
// Frame annotation
// ============================================================================

enum FrameRoute {
    /// Same-origin: resolve in the child document directly.
    Direct { iframe_rect: Rect, inner: Box<Annotation> },
    /// Cross-origin: ask the frame over the relay.
    Relay {
        iframe_rect: Rect,
        frame: FrameId,
        relay: Rc<FrameRelay>,
    },
    Unreachable,
}

/// Resolver for a pin inside an iframe. Coordinates coming back from the
/// frame are translated into this document's viewport.
pub struct FrameAnnotation {
    location: LocationDescriptor,
    iframe_selector: String,
    inner_location: LocationDescriptor,
    ctx: AnnotationContext,
    router: ArrowRouter,
}

impl FrameAnnotation {
    pub fn new(location: LocationDescriptor, ctx: &AnnotationContext) -> Result<Self, LocationError> {
        location.validate()?;
        let iframe_selector = location
            .iframe_selectors
            .first()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .ok_or(LocationError::EmptySelector { kind: "iframe" })?;
        Ok(Self {
            inner_location: location.without_outer_frame(),
            iframe_selector,
            location,
            ctx: ctx.clone(),
            router: ArrowRouter::new(ctx.arrow),
        })
    }

    pub fn location(&self) -> &LocationDescriptor {
        &self.location
    }

    fn iframe(&self) -> Option<NodeId> {
        self.ctx.dom.query_selector(&self.iframe_selector)
    }

    fn route(&self) -> FrameRoute {
        let Some(iframe) = self.iframe() else {
            debug!(selector = %self.iframe_selector, "iframe not found");
            return FrameRoute::Unreachable;
        };
        let Some(frames) = &self.ctx.frames else {
            return FrameRoute::Unreachable;
        };
        let iframe_rect = self.ctx.dom.bounding_client_rect(iframe);

        if frames.is_same_origin(iframe) {
            let Some(document) = frames.content_document(iframe) else {
                return FrameRoute::Unreachable;
            };
            let child = self.ctx.for_child_document(document);
            return match Annotation::new(self.inner_location.clone(), &child) {
                Ok(inner) => FrameRoute::Direct {
                    iframe_rect,
                    inner: Box::new(inner),
                },
                Err(err) => {
                    warn!(error = %err, "cannot resolve location inside frame");
                    FrameRoute::Unreachable
                }
            };
        }

        match self.ctx.relay.as_ref().and_then(|relay| relay.upgrade()) {
            Some(relay) => FrameRoute::Relay {
                iframe_rect,
                frame: frames.frame_id(iframe),
                relay,
            },
            None => {
                debug!(selector = %self.iframe_selector, "cross-origin frame and no relay");
                FrameRoute::Unreachable
            }
        }
    }

    pub async fn get_position(&self) -> Option<ResolvedPosition> {
        let viewport = self.ctx.dom.viewport();
        match self.route() {
            FrameRoute::Direct { iframe_rect, inner } => {
                let position = inner.get_position().boxed_local().await?;
                Some(frame_position_to_viewport(position, iframe_rect, viewport))
            }
            FrameRoute::Relay {
                iframe_rect,
                frame,
                relay,
            } => {
                let request = GetAnnotationPosition {
                    location: self.inner_location.clone(),
                };
                match relay.send(&frame, request).await {
                    Ok(position) => {
                        position.map(|p| frame_position_to_viewport(p, iframe_rect, viewport))
                    }
                    Err(err) => {
                        warn!(frame = %frame, error = %err, "frame position unavailable");
                        None
                    }
                }
            }
            FrameRoute::Unreachable => None,
        }
    }

    pub async fn get_match_type(&self) -> LocationMatch {
        match self.route() {
            FrameRoute::Direct { inner, .. } => inner.get_match_type().boxed_local().await,
            FrameRoute::Relay { frame, relay, .. } => {
                let request = GetAnnotationMatchType {
                    location: self.inner_location.clone(),
                };
                relay.send(&frame, request).await.unwrap_or_else(|err| {
                    warn!(frame = %frame, error = %err, "frame match type unavailable");
                    LocationMatch::None
                })
            }
            FrameRoute::Unreachable => LocationMatch::None,
        }
    }

    pub async fn is_outside_scroll(&self) -> bool {
        self.get_position().await.is_some_and(|p| !p.visible)
    }

    pub async fn scroll_to(&self) {
        if let Some(iframe) = self.iframe() {
            self.ctx.dom.scroll_into_view(iframe);
        }
        match self.route() {
            FrameRoute::Direct { inner, .. } => inner.scroll_to().boxed_local().await,
            FrameRoute::Relay { frame, relay, .. } => {
                let request = ScrollToAnnotation {
                    location: self.inner_location.clone(),
                };
                if let Err(err) = relay.send(&frame, request).await {
                    warn!(frame = %frame, error = %err, "scroll inside frame failed");
                }
            }
            FrameRoute::Unreachable => {}
        }
    }

    pub async fn get_position_for_arrow(&self, from: Point) -> Option<ArrowPosition> {
        let (arrow, iframe_rect) = match self.route() {
            FrameRoute::Direct { iframe_rect, inner } => {
                let from = Point::new(from.x - iframe_rect.x, from.y - iframe_rect.y);
                (inner.get_position_for_arrow(from).boxed_local().await?, iframe_rect)
            }
            FrameRoute::Relay {
                iframe_rect,
                frame,
                relay,
            } => {
                let request = GetAnnotationArrowPosition {
                    location: self.inner_location.clone(),
                    from: Point::new(from.x - iframe_rect.x, from.y - iframe_rect.y),
                };
                match relay.send(&frame, request).await {
                    Ok(arrow) => (arrow?, iframe_rect),
                    Err(err) => {
                        warn!(frame = %frame, error = %err, "frame arrow position unavailable");
                        return None;
                    }
                }
            }
            FrameRoute::Unreachable => return None,
        };

        let translated = ArrowPosition {
            x_vs_viewport: arrow.x_vs_viewport + iframe_rect.x,
            y_vs_viewport: arrow.y_vs_viewport + iframe_rect.y,
            within_scroll: arrow.within_scroll,
        };
        Some(self.router.clamp_to_viewport(translated, self.ctx.dom.viewport()))
    }
}
