use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::annotation::annotation::Annotation;
use crate::annotation::context::AnnotationContext;
use crate::location::location_model::{LocationDescriptor, LocationMatch};
use crate::position::arrow::ArrowRouter;
use crate::relay::protocol::{
    DrawArrowToAnnotation, FrameId, FrameScroll, GetAnnotationArrowPosition,
    GetAnnotationMatchType, GetAnnotationPosition, Ping, RemoveAnnotationArrow,
    ScrollToAnnotation,
};
use crate::relay::rpc::FrameRelay;
use crate::scheduler::arrow_layer::ArrowLayer;
use crate::scheduler::events::{EventHub, HostEvent, Subscription};

fn bind(location: LocationDescriptor, ctx: &AnnotationContext) -> Option<Annotation> {
    match Annotation::new(location, ctx) {
        Ok(annotation) => Some(annotation),
        Err(err) => {
            warn!(error = %err, "rejecting relayed location");
            None
        }
    }
}

/// Answer annotation queries coming from the parent window. Run inside a
/// frame; `ctx` describes the frame's own document and `arrows` is where
/// the frame draws.
pub fn register_frame_handlers(relay: &FrameRelay, ctx: AnnotationContext, arrows: Rc<ArrowLayer>) {
    let ctx = Rc::new(ctx);

    let c = ctx.clone();
    relay.on(move |_from, request: GetAnnotationMatchType| {
        let ctx = c.clone();
        async move {
            match bind(request.location, &ctx) {
                Some(annotation) => annotation.get_match_type().await,
                None => LocationMatch::None,
            }
        }
    });

    let c = ctx.clone();
    relay.on(move |_from, request: GetAnnotationPosition| {
        let ctx = c.clone();
        async move {
            let annotation = bind(request.location, &ctx)?;
            annotation.get_position().await
        }
    });

    let c = ctx.clone();
    relay.on(move |_from, request: GetAnnotationArrowPosition| {
        let ctx = c.clone();
        async move {
            let annotation = bind(request.location, &ctx)?;
            annotation.get_position_for_arrow(request.from).await
        }
    });

    let c = ctx.clone();
    relay.on(move |_from, request: ScrollToAnnotation| {
        let ctx = c.clone();
        async move {
            if let Some(annotation) = bind(request.location, &ctx) {
                annotation.scroll_to().await;
            }
        }
    });

    let c = ctx.clone();
    let layer = arrows.clone();
    relay.on(move |_from, request: DrawArrowToAnnotation| {
        let ctx = c.clone();
        let arrows = layer.clone();
        async move {
            let Some(annotation) = bind(request.location, &ctx) else {
                return;
            };
            match annotation.get_position_for_arrow(request.from).await {
                Some(arrow) => arrows.draw(ArrowRouter::new(ctx.arrow).route(request.from, arrow)),
                None => debug!("no arrow position inside frame"),
            }
        }
    });

    relay.on(move |_from, _request: RemoveAnnotationArrow| {
        let arrows = arrows.clone();
        async move {
            arrows.hide();
        }
    });

    relay.on(|_from, _request: Ping| async {});
}

/// Turn scroll notifications from child frames into host events on `hub`,
/// so the parent's scheduler reacts to scrolling inside frames.
pub fn forward_frame_scroll(relay: &FrameRelay, hub: Weak<EventHub>) {
    relay.on_notification(move |from: FrameId, _message: FrameScroll| {
        if let Some(hub) = hub.upgrade() {
            hub.emit(&HostEvent::FrameScroll(from));
        }
    });
}

/// Inside a frame: tell the parent window every time this document
/// scrolls. Notifications stop when the subscription is dropped.
pub fn notify_parent_of_scroll(hub: &Rc<EventHub>, relay: Weak<FrameRelay>, parent: FrameId) -> Subscription {
    hub.subscribe(move |event| {
        if !matches!(event, HostEvent::Scroll { .. }) {
            return;
        }
        let Some(relay) = relay.upgrade() else {
            return;
        };
        if let Err(err) = relay.notify(&parent, FrameScroll {}) {
            warn!(parent = %parent, error = %err, "failed to forward scroll");
        }
    })
}
