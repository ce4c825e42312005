use std::fmt;

use serde::{Deserialize, Serialize};

use crate::annotation::chart::ChartAnnotation;
use crate::annotation::context::AnnotationContext;
use crate::annotation::dom_annotation::DomAnnotation;
use crate::annotation::frame::FrameAnnotation;
use crate::annotation::highlighted_text::HighlightedTextAnnotation;
use crate::annotation::multimedia::MultimediaAnnotation;
use crate::error::LocationError;
use crate::location::location_model::{
    ArrowPosition, LocationDescriptor, LocationMatch, Point, ResolvedPosition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    PlainDom,
    VirtualizedTree,
    Chart,
    Multimedia,
    HighlightedText,
    Frame,
}

impl AnnotationKind {
    /// Which resolver a descriptor needs. Frame routing wins over every
    /// target kind; the target kind is decided again inside the frame.
    pub fn of(location: &LocationDescriptor) -> Self {
        if !location.iframe_selectors.is_empty() {
            AnnotationKind::Frame
        } else if location.react_tree().is_some() {
            AnnotationKind::VirtualizedTree
        } else if location.chart().is_some() {
            AnnotationKind::Chart
        } else if location.multimedia().is_some() {
            AnnotationKind::Multimedia
        } else if location.highlighted_text().is_some() {
            AnnotationKind::HighlightedText
        } else {
            AnnotationKind::PlainDom
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationKind::PlainDom => "plain_dom",
            AnnotationKind::VirtualizedTree => "virtualized_tree",
            AnnotationKind::Chart => "chart",
            AnnotationKind::Multimedia => "multimedia",
            AnnotationKind::HighlightedText => "highlighted_text",
            AnnotationKind::Frame => "frame",
        };
        f.write_str(name)
    }
}

pub enum AnnotationVariant {
    PlainDom(DomAnnotation),
    VirtualizedTree(DomAnnotation),
    Chart(ChartAnnotation),
    Multimedia(MultimediaAnnotation),
    HighlightedText(HighlightedTextAnnotation),
    Frame(FrameAnnotation),
}

/// A pinned location bound to the page it is being shown on.
///
/// The resolver variant is chosen once, here, from the descriptor's target
/// data and never changes afterwards.
pub struct Annotation {
    variant: AnnotationVariant,
}

impl Annotation {
    pub fn new(location: LocationDescriptor, ctx: &AnnotationContext) -> Result<Self, LocationError> {
        let variant = match AnnotationKind::of(&location) {
            AnnotationKind::PlainDom => AnnotationVariant::PlainDom(DomAnnotation::new(location, ctx)?),
            AnnotationKind::VirtualizedTree => {
                AnnotationVariant::VirtualizedTree(DomAnnotation::new(location, ctx)?)
            }
            AnnotationKind::Chart => AnnotationVariant::Chart(ChartAnnotation::new(location, ctx)?),
            AnnotationKind::Multimedia => {
                AnnotationVariant::Multimedia(MultimediaAnnotation::new(location, ctx)?)
            }
            AnnotationKind::HighlightedText => {
                AnnotationVariant::HighlightedText(HighlightedTextAnnotation::new(location, ctx)?)
            }
            AnnotationKind::Frame => AnnotationVariant::Frame(FrameAnnotation::new(location, ctx)?),
        };
        Ok(Self { variant })
    }

    pub fn kind(&self) -> AnnotationKind {
        match &self.variant {
            AnnotationVariant::PlainDom(_) => AnnotationKind::PlainDom,
            AnnotationVariant::VirtualizedTree(_) => AnnotationKind::VirtualizedTree,
            AnnotationVariant::Chart(_) => AnnotationKind::Chart,
            AnnotationVariant::Multimedia(_) => AnnotationKind::Multimedia,
            AnnotationVariant::HighlightedText(_) => AnnotationKind::HighlightedText,
            AnnotationVariant::Frame(_) => AnnotationKind::Frame,
        }
    }

    pub fn location(&self) -> &LocationDescriptor {
        match &self.variant {
            AnnotationVariant::PlainDom(a) | AnnotationVariant::VirtualizedTree(a) => a.location(),
            AnnotationVariant::Chart(a) => a.location(),
            AnnotationVariant::Multimedia(a) => a.location(),
            AnnotationVariant::HighlightedText(a) => a.location(),
            AnnotationVariant::Frame(a) => a.location(),
        }
    }

    /// Viewport position of the pin. `None` means it cannot be shown right
    /// now, which is not the same as gone.
    pub async fn get_position(&self) -> Option<ResolvedPosition> {
        match &self.variant {
            AnnotationVariant::PlainDom(a) | AnnotationVariant::VirtualizedTree(a) => a.get_position().await,
            AnnotationVariant::Chart(a) => a.get_position().await,
            AnnotationVariant::Multimedia(a) => a.get_position().await,
            AnnotationVariant::HighlightedText(a) => a.get_position().await,
            AnnotationVariant::Frame(a) => a.get_position().await,
        }
    }

    pub async fn get_match_type(&self) -> LocationMatch {
        match &self.variant {
            AnnotationVariant::PlainDom(a) | AnnotationVariant::VirtualizedTree(a) => a.get_match_type().await,
            AnnotationVariant::Chart(a) => a.get_match_type().await,
            AnnotationVariant::Multimedia(a) => a.get_match_type().await,
            AnnotationVariant::HighlightedText(a) => a.get_match_type().await,
            AnnotationVariant::Frame(a) => a.get_match_type().await,
        }
    }

    /// Whether the pin exists but the user has to scroll (or expand) to
    /// see it.
    pub async fn is_outside_scroll(&self) -> bool {
        match &self.variant {
            AnnotationVariant::PlainDom(a) | AnnotationVariant::VirtualizedTree(a) => a.is_outside_scroll().await,
            AnnotationVariant::Chart(a) => a.is_outside_scroll().await,
            AnnotationVariant::Multimedia(a) => a.is_outside_scroll().await,
            AnnotationVariant::HighlightedText(a) => a.is_outside_scroll().await,
            AnnotationVariant::Frame(a) => a.is_outside_scroll().await,
        }
    }

    pub async fn scroll_to(&self) {
        match &self.variant {
            AnnotationVariant::PlainDom(a) | AnnotationVariant::VirtualizedTree(a) => a.scroll_to().await,
            AnnotationVariant::Chart(a) => a.scroll_to().await,
            AnnotationVariant::Multimedia(a) => a.scroll_to().await,
            AnnotationVariant::HighlightedText(a) => a.scroll_to().await,
            AnnotationVariant::Frame(a) => a.scroll_to().await,
        }
    }

    /// Where an arrow drawn from `from` should end.
    pub async fn get_position_for_arrow(&self, from: Point) -> Option<ArrowPosition> {
        match &self.variant {
            AnnotationVariant::PlainDom(a) | AnnotationVariant::VirtualizedTree(a) => {
                a.get_position_for_arrow(from).await
            }
            AnnotationVariant::Chart(a) => a.get_position_for_arrow(from).await,
            AnnotationVariant::Multimedia(a) => a.get_position_for_arrow(from).await,
            AnnotationVariant::HighlightedText(a) => a.get_position_for_arrow(from).await,
            AnnotationVariant::Frame(a) => a.get_position_for_arrow(from).await,
        }
    }

    /// Seek a multimedia target to the annotated time. Other kinds have
    /// nothing to seek and return false.
    pub fn skip_media_to_annotated_time(&self) -> bool {
        match &self.variant {
            AnnotationVariant::Multimedia(a) => a.skip_media_to_annotated_time(),
            _ => false,
        }
    }
}
