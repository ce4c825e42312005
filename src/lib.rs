pub mod annotation;
pub mod cli;
pub mod dom;
pub mod error;
pub mod identity;
pub mod location;
pub mod position;
pub mod relay;
pub mod scheduler;
pub mod trace;
pub mod virtualized;

pub use annotation::annotation::{Annotation, AnnotationKind};
pub use annotation::context::AnnotationContext;
pub use error::{LocationError, RelayError, SnapshotError};
pub use location::location_model::{
    ArrowPosition, LocationDescriptor, LocationMatch, Point, Rect, ResolvedPosition,
};
