use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cli::config::SchedulerConfig;
use crate::scheduler::arrow_layer::ArrowLayer;
use crate::scheduler::events::{EventHub, HostEvent, Scroller, Subscription};

/// Drops scroll events that did not actually move their scroller. Offsets
/// are only remembered while the scroller is in the document.
#[derive(Debug, Default)]
struct ScrollFilter {
    last_offsets: HashMap<Scroller, (f64, f64)>,
}

impl ScrollFilter {
    fn should_recompute(&mut self, event: &HostEvent) -> bool {
        match event {
            HostEvent::Scroll {
                scroller,
                scroll_top,
                scroll_left,
            } => {
                let offsets = (*scroll_top, *scroll_left);
                match self.last_offsets.insert(scroller.clone(), offsets) {
                    Some(previous) => previous != offsets,
                    None => true,
                }
            }
            HostEvent::NodesRemoved(nodes) => {
                for node in nodes {
                    self.last_offsets.remove(&Scroller::Element(*node));
                }
                true
            }
            _ => true,
        }
    }
}

/// Keeps pin and arrow positions fresh while the page moves.
///
/// Every relevant host event requests a recomputation; requests are
/// debounced (trailing edge) and run one at a time on a local task, and each
/// finished recomputation hides the drawn arrow. Dropping the scheduler
/// detaches its listener and cancels any pending or running recomputation.
pub struct PositionUpdateScheduler {
    _subscription: Subscription,
    worker: JoinHandle<()>,
    ticks: Rc<Cell<u64>>,
}

impl PositionUpdateScheduler {
    /// Must be called from within a `tokio::task::LocalSet`.
    pub fn start<F, Fut>(
        hub: &Rc<EventHub>,
        debounce: Duration,
        arrows: Rc<ArrowLayer>,
        mut recompute: F,
    ) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let filter = RefCell::new(ScrollFilter::default());

        let subscription = hub.subscribe(move |event| {
            if !filter.borrow_mut().should_recompute(event) {
                debug!(?event, "scroll offsets unchanged; ignoring");
                return;
            }
            // Closed only once the worker is gone.
            let _ = tx.send(());
        });

        let ticks = Rc::new(Cell::new(0));
        let worker_ticks = ticks.clone();
        let worker = tokio::task::spawn_local(async move {
            while rx.recv().await.is_some() {
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                recompute().await;
                worker_ticks.set(worker_ticks.get() + 1);
                if arrows.hide() {
                    debug!("arrow hidden after position update");
                }
            }
        });

        Self {
            _subscription: subscription,
            worker,
            ticks,
        }
    }

    /// [`start`](Self::start) with the configured debounce window.
    pub fn from_config<F, Fut>(
        hub: &Rc<EventHub>,
        config: &SchedulerConfig,
        arrows: Rc<ArrowLayer>,
        recompute: F,
    ) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::start(hub, config.debounce(), arrows, recompute)
    }

    /// Recomputations completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }
}

impl Drop for PositionUpdateScheduler {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
