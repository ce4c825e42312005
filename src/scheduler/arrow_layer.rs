use std::cell::Cell;

use tracing::debug;

use crate::position::arrow::ArrowRoute;

/// The pointer line currently on screen, if any. At most one is drawn at a
/// time.
#[derive(Debug, Default)]
pub struct ArrowLayer {
    current: Cell<Option<ArrowRoute>>,
}

impl ArrowLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&self, route: ArrowRoute) {
        debug!(to_x = route.to.x, to_y = route.to.y, direction = ?route.direction, "draw arrow");
        self.current.set(Some(route));
    }

    /// Returns whether an arrow was showing.
    pub fn hide(&self) -> bool {
        self.current.take().is_some()
    }

    pub fn current(&self) -> Option<ArrowRoute> {
        self.current.get()
    }

    pub fn is_drawn(&self) -> bool {
        self.current.get().is_some()
    }
}
