use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use annotation_locator::cli::config::SchedulerConfig;
use annotation_locator::dom::dom_model::NodeId;
use annotation_locator::position::arrow::{ArrowDirection, ArrowRouter};
use annotation_locator::scheduler::arrow_layer::ArrowLayer;
use annotation_locator::scheduler::events::{EventHub, HostEvent, Subscription};
use annotation_locator::scheduler::update_scheduler::PositionUpdateScheduler;
use annotation_locator::{ArrowPosition, Point};
use tokio::task::LocalSet;
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(10);

fn counting() -> (Rc<Cell<u32>>, impl FnMut() -> std::future::Ready<()> + 'static) {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    (count, move || {
        c.set(c.get() + 1);
        std::future::ready(())
    })
}

fn sample_route() -> annotation_locator::position::arrow::ArrowRoute {
    ArrowRouter::default().route(
        Point::new(0.0, 0.0),
        ArrowPosition::new(Point::new(100.0, 300.0), true),
    )
}

// =========================================================================
// Event hub
// =========================================================================

#[test]
fn subscription_detaches_on_drop() {
    let hub = EventHub::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let subscription = hub.subscribe(move |event| s.borrow_mut().push(event.clone()));
    assert_eq!(hub.listener_count(), 1);

    hub.emit(&HostEvent::Resize);
    drop(subscription);
    hub.emit(&HostEvent::Wheel);

    assert_eq!(hub.listener_count(), 0);
    assert_eq!(*seen.borrow(), vec![HostEvent::Resize]);
}

#[test]
fn listener_may_unsubscribe_while_handling() {
    let hub = EventHub::new();
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let s = slot.clone();
    let subscription = hub.subscribe(move |_| {
        s.borrow_mut().take();
    });
    *slot.borrow_mut() = Some(subscription);

    hub.emit(&HostEvent::Resize);
    assert_eq!(hub.listener_count(), 0);
}

#[test]
fn subscription_outliving_hub_is_harmless() {
    let hub = EventHub::new();
    let subscription = hub.subscribe(|_| {});
    drop(hub);
    drop(subscription);
}

#[test]
fn route_direction_follows_dominant_axis() {
    assert_eq!(sample_route().direction, ArrowDirection::Down);
}

// =========================================================================
// Scheduling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_events_recomputes_once() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let (count, recompute) = counting();
            let scheduler =
                PositionUpdateScheduler::start(&hub, DEBOUNCE, Rc::new(ArrowLayer::new()), recompute);

            for _ in 0..5 {
                hub.emit(&HostEvent::Resize);
            }
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 1);
            assert_eq!(scheduler.ticks(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn debounce_waits_for_quiet_period() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let (count, recompute) = counting();
            let _scheduler =
                PositionUpdateScheduler::start(&hub, DEBOUNCE, Rc::new(ArrowLayer::new()), recompute);

            for _ in 0..4 {
                hub.emit(&HostEvent::Wheel);
                sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(count.get(), 0);

            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 1);

            hub.emit(&HostEvent::Wheel);
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn scroll_without_movement_is_ignored() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let (count, recompute) = counting();
            let _scheduler =
                PositionUpdateScheduler::start(&hub, DEBOUNCE, Rc::new(ArrowLayer::new()), recompute);

            hub.emit(&HostEvent::window_scroll(100.0, 0.0));
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 1);

            hub.emit(&HostEvent::window_scroll(100.0, 0.0));
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 1);

            // Same offsets on a different scroller still count.
            hub.emit(&HostEvent::element_scroll(NodeId(4), 100.0, 0.0));
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 2);

            hub.emit(&HostEvent::window_scroll(100.0, 20.0));
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 3);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn removed_scroller_is_forgotten() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let (count, recompute) = counting();
            let _scheduler =
                PositionUpdateScheduler::start(&hub, DEBOUNCE, Rc::new(ArrowLayer::new()), recompute);

            hub.emit(&HostEvent::element_scroll(NodeId(4), 100.0, 0.0));
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 1);

            // Removal is itself a mutation worth recomputing for.
            hub.emit(&HostEvent::NodesRemoved(vec![NodeId(4), NodeId(5)]));
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 2);

            // A scroller reusing the id starts with no remembered offsets.
            hub.emit(&HostEvent::element_scroll(NodeId(4), 100.0, 0.0));
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 3);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn configured_debounce_window_is_used() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let (count, recompute) = counting();
            let config = SchedulerConfig { debounce_ms: 100 };
            let _scheduler = PositionUpdateScheduler::from_config(
                &hub,
                &config,
                Rc::new(ArrowLayer::new()),
                recompute,
            );

            hub.emit(&HostEvent::Resize);
            sleep(Duration::from_millis(50)).await;
            assert_eq!(count.get(), 0);
            sleep(Duration::from_millis(100)).await;
            assert_eq!(count.get(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn each_update_hides_the_arrow() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let arrows = Rc::new(ArrowLayer::new());
            let (_count, recompute) = counting();
            let _scheduler = PositionUpdateScheduler::start(&hub, DEBOUNCE, arrows.clone(), recompute);

            arrows.draw(sample_route());
            assert!(arrows.is_drawn());

            hub.emit(&HostEvent::Resize);
            sleep(Duration::from_millis(50)).await;
            assert!(!arrows.is_drawn());
            assert_eq!(arrows.current(), None);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn recomputations_never_overlap() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let running = Rc::new(Cell::new(0u32));
            let peak = Rc::new(Cell::new(0u32));
            let (r, p) = (running.clone(), peak.clone());
            let scheduler = PositionUpdateScheduler::start(
                &hub,
                DEBOUNCE,
                Rc::new(ArrowLayer::new()),
                move || {
                    let (running, peak) = (r.clone(), p.clone());
                    async move {
                        running.set(running.get() + 1);
                        peak.set(peak.get().max(running.get()));
                        sleep(Duration::from_millis(30)).await;
                        running.set(running.get() - 1);
                    }
                },
            );

            hub.emit(&HostEvent::Resize);
            sleep(Duration::from_millis(15)).await;
            // First recompute is mid-flight now.
            hub.emit(&HostEvent::Resize);
            sleep(Duration::from_millis(200)).await;

            assert_eq!(peak.get(), 1);
            assert_eq!(scheduler.ticks(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn dropping_scheduler_detaches_and_cancels() {
    LocalSet::new()
        .run_until(async {
            let hub = EventHub::new();
            let finished = Rc::new(Cell::new(false));
            let f = finished.clone();
            let scheduler = PositionUpdateScheduler::start(
                &hub,
                DEBOUNCE,
                Rc::new(ArrowLayer::new()),
                move || {
                    let finished = f.clone();
                    async move {
                        sleep(Duration::from_secs(1)).await;
                        finished.set(true);
                    }
                },
            );
            assert_eq!(hub.listener_count(), 1);

            hub.emit(&HostEvent::Resize);
            sleep(Duration::from_millis(20)).await;
            drop(scheduler);
            assert_eq!(hub.listener_count(), 0);

            hub.emit(&HostEvent::Resize);
            sleep(Duration::from_secs(2)).await;
            assert!(!finished.get());
        })
        .await;
}
