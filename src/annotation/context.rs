use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::annotation::chart::ChartHost;
use crate::annotation::frame::FrameAccess;
use crate::dom::dom_model::Dom;
use crate::position::arrow::ArrowSettings;
use crate::relay::rpc::FrameRelay;
use crate::virtualized::tree::VirtualizedTree;

/// Owns host-provided capabilities by id and hands out weak handles, so an
/// annotation never keeps a tree or chart alive after the host drops it.
pub struct CapabilityRegistry<T: ?Sized> {
    entries: RefCell<HashMap<String, Rc<T>>>,
}

impl<T: ?Sized> Default for CapabilityRegistry<T> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }
}

impl<T: ?Sized> CapabilityRegistry<T> {
    pub fn add(&self, id: impl Into<String>, capability: Rc<T>) {
        self.entries.borrow_mut().insert(id.into(), capability);
    }

    pub fn remove(&self, id: &str) -> Option<Rc<T>> {
        self.entries.borrow_mut().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Weak<T>> {
        self.entries.borrow().get(id).map(Rc::downgrade)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

pub type TreeRegistry = CapabilityRegistry<dyn VirtualizedTree>;
pub type ChartRegistry = CapabilityRegistry<dyn ChartHost>;

/// Everything an annotation needs from the page it is rendered on.
#[derive(Clone)]
pub struct AnnotationContext {
    pub dom: Rc<dyn Dom>,
    pub trees: Rc<TreeRegistry>,
    pub charts: Rc<ChartRegistry>,
    pub frames: Option<Rc<dyn FrameAccess>>,
    pub relay: Option<Weak<FrameRelay>>,
    pub arrow: ArrowSettings,
}

impl AnnotationContext {
    pub fn new(dom: Rc<dyn Dom>) -> Self {
        Self {
            dom,
            trees: Rc::new(TreeRegistry::default()),
            charts: Rc::new(ChartRegistry::default()),
            frames: None,
            relay: None,
            arrow: ArrowSettings::default(),
        }
    }

    pub fn with_trees(mut self, trees: Rc<TreeRegistry>) -> Self {
        self.trees = trees;
        self
    }

    pub fn with_charts(mut self, charts: Rc<ChartRegistry>) -> Self {
        self.charts = charts;
        self
    }

    pub fn with_frames(mut self, frames: Rc<dyn FrameAccess>) -> Self {
        self.frames = Some(frames);
        self
    }

    /// The relay usually owns handlers that hold a context, so the context
    /// only keeps a weak handle back to it.
    pub fn with_relay(mut self, relay: &Rc<FrameRelay>) -> Self {
        self.relay = Some(Rc::downgrade(relay));
        self
    }

    pub fn with_arrow_settings(mut self, arrow: ArrowSettings) -> Self {
        self.arrow = arrow;
        self
    }

    /// Same capabilities, pointed at a same-origin child document. The
    /// parent's right boundary does not apply inside the frame.
    pub fn for_child_document(&self, dom: Rc<dyn Dom>) -> Self {
        Self {
            dom,
            arrow: ArrowSettings {
                right_boundary: None,
                ..self.arrow
            },
            ..self.clone()
        }
    }
}
