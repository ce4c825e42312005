use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::location::location_model::{
    ArrowPosition, LocationDescriptor, LocationMatch, Point, ResolvedPosition,
};

/// Identifies a window (the top page or one frame) on the messaging bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub String);

impl FrameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// Every message type the relay understands. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    GetAnnotationMatchType,
    GetAnnotationPosition,
    GetAnnotationArrowPosition,
    ScrollToAnnotation,
    DrawArrowToAnnotation,
    RemoveAnnotationArrow,
    #[serde(rename = "CORD_SCROLL")]
    Scroll,
    Ping,
    Response,
}

impl MessageType {
    /// Whether the sender waits for a `RESPONSE` to this message.
    pub fn expects_response(self) -> bool {
        !matches!(self, MessageType::Scroll | MessageType::Response)
    }
}

/// One message on the wire: `{"type": ..., "data": ..., "id": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub data: serde_json::Value,
    pub id: String,
}

/// Payload of a `RESPONSE` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Id of the request being answered.
    pub id: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

// ============================================================================
// Message catalog
// ============================================================================

mod sealed {
    pub trait Sealed {}
}

/// A message with a fixed type tag. Only the types in this module implement
/// it.
pub trait RelayMessage: Serialize + DeserializeOwned + sealed::Sealed + 'static {
    const TYPE: MessageType;
}

/// A message answered with a `RESPONSE` carrying `Self::Response`.
pub trait RelayRequest: RelayMessage {
    type Response: Serialize + DeserializeOwned + 'static;
}

macro_rules! catalog {
    ($($message:ident => $kind:ident $(, responds $response:ty)?;)*) => {
        $(
            impl sealed::Sealed for $message {}

            impl RelayMessage for $message {
                const TYPE: MessageType = MessageType::$kind;
            }

            $(
                impl RelayRequest for $message {
                    type Response = $response;
                }
            )?
        )*
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAnnotationMatchType {
    pub location: LocationDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAnnotationPosition {
    pub location: LocationDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAnnotationArrowPosition {
    pub location: LocationDescriptor,
    /// Arrow origin in the receiving frame's viewport.
    pub from: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollToAnnotation {
    pub location: LocationDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawArrowToAnnotation {
    pub location: LocationDescriptor,
    pub from: Point,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoveAnnotationArrow {}

/// Sent by a frame whenever its content scrolled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameScroll {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ping {}

catalog! {
    GetAnnotationMatchType => GetAnnotationMatchType, responds LocationMatch;
    GetAnnotationPosition => GetAnnotationPosition, responds Option<ResolvedPosition>;
    GetAnnotationArrowPosition => GetAnnotationArrowPosition, responds Option<ArrowPosition>;
    ScrollToAnnotation => ScrollToAnnotation, responds ();
    DrawArrowToAnnotation => DrawArrowToAnnotation, responds ();
    RemoveAnnotationArrow => RemoveAnnotationArrow, responds ();
    FrameScroll => Scroll;
    Ping => Ping, responds ();
}
