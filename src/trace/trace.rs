use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::annotation::annotation::AnnotationKind;
use crate::location::location_model::{ArrowPosition, LocationMatch, ResolvedPosition};
use crate::position::arrow::ArrowRoute;

/// One line of the resolution trace: what a single resolution pass saw.
#[derive(Debug, Serialize)]
pub struct ResolutionEvent {
    pub timestamp_ms: u128,
    pub kind: AnnotationKind,
    pub selector: String,

    pub match_type: Option<LocationMatch>,
    pub position: Option<ResolvedPosition>,
    pub outside_scroll: Option<bool>,

    pub arrow: Option<ArrowPosition>,
    pub route: Option<ArrowRoute>,

    pub note: Option<String>,
}

impl ResolutionEvent {
    pub fn now(kind: AnnotationKind, selector: &str) -> Self {
        Self {
            // A clock before the epoch only skews the trace; it is not fatal.
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            kind,
            selector: selector.to_string(),
            match_type: None,
            position: None,
            outside_scroll: None,
            arrow: None,
            route: None,
            note: None,
        }
    }

    pub fn with_match_type(mut self, match_type: LocationMatch) -> Self {
        self.match_type = Some(match_type);
        self
    }

    pub fn with_position(mut self, position: Option<ResolvedPosition>) -> Self {
        self.position = position;
        self
    }

    pub fn with_outside_scroll(mut self, outside: bool) -> Self {
        self.outside_scroll = Some(outside);
        self
    }

    pub fn with_arrow(mut self, arrow: Option<ArrowPosition>, route: Option<ArrowRoute>) -> Self {
        self.arrow = arrow;
        self.route = route;
        self
    }

    pub fn with_note(mut self, note: impl ToString) -> Self {
        self.note = Some(note.to_string());
        self
    }
}
