use std::rc::Rc;
use std::time::Duration;

use annotation_locator::cli::config::RelayConfig;
use annotation_locator::relay::protocol::FrameId;
use annotation_locator::relay::rpc::{ChannelTransport, FrameRelay, LocalBus};

pub const PARENT: &str = "top";
pub const CHILD: &str = "child";

pub fn relay_config(timeout: Duration) -> RelayConfig {
    RelayConfig {
        timeout_ms: timeout.as_millis() as u64,
    }
}

/// Parent and child windows on one bus. Each message is handled on its own
/// task, so slow handlers do not block the bus.
///
/// Must be called inside a `LocalSet`.
pub fn connect(timeout: Duration) -> (Rc<FrameRelay>, Rc<FrameRelay>) {
    let bus = LocalBus::new(&relay_config(timeout));
    (bus.join(&FrameId::new(PARENT)), bus.join(&FrameId::new(CHILD)))
}

/// A relay whose messages go nowhere.
pub fn unanswered(timeout: Duration) -> Rc<FrameRelay> {
    let (transport, rx) = ChannelTransport::new();
    drop(rx);
    Rc::new(FrameRelay::from_config(Rc::new(transport), &relay_config(timeout)))
}
