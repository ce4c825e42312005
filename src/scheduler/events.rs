use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dom::dom_model::NodeId;
use crate::relay::protocol::FrameId;

/// Something that scrolls: the window itself or one scrollable element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scroller {
    Window,
    Element(NodeId),
}

/// Page-level events that can move a pin.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Scroll {
        scroller: Scroller,
        scroll_top: f64,
        scroll_left: f64,
    },
    Resize,
    Wheel,
    /// Elements left the document, subtrees included.
    NodesRemoved(Vec<NodeId>),
    /// A child frame reported that its content scrolled.
    FrameScroll(FrameId),
}

impl HostEvent {
    pub fn window_scroll(scroll_top: f64, scroll_left: f64) -> Self {
        HostEvent::Scroll {
            scroller: Scroller::Window,
            scroll_top,
            scroll_left,
        }
    }

    pub fn element_scroll(node: NodeId, scroll_top: f64, scroll_left: f64) -> Self {
        HostEvent::Scroll {
            scroller: Scroller::Element(node),
            scroll_top,
            scroll_left,
        }
    }
}

type Listener = Rc<dyn Fn(&HostEvent)>;

/// Fan-out point for host events. Listeners are attached through
/// [`EventHub::subscribe`] and stay attached exactly as long as the returned
/// [`Subscription`] lives.
#[derive(Default)]
pub struct EventHub {
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_id: Cell<u64>,
}

impl EventHub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn subscribe(self: &Rc<Self>, listener: impl Fn(&HostEvent) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        Subscription {
            hub: Rc::downgrade(self),
            id,
        }
    }

    pub fn emit(&self, event: &HostEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.borrow_mut().retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Keeps one listener attached to an [`EventHub`]; dropping it detaches.
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    hub: Weak<EventHub>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}
