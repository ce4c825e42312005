use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cli::config::RelayConfig;
use crate::error::RelayError;
use crate::relay::protocol::{Envelope, FrameId, MessageType, RelayMessage, RelayRequest, ResponseData};

// ============================================================================
// Transport
// ============================================================================

/// The generic cross-window messaging primitive the relay runs on top of.
/// Delivery is fire-and-forget.
pub trait FrameTransport {
    fn post_message(&self, to: &FrameId, message: String);
}

/// A message handed to [`ChannelTransport`] for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub to: FrameId,
    pub message: String,
}

/// Transport that queues outgoing messages on a channel; whoever owns the
/// receiving end delivers them to the target window.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<PostedMessage>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PostedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FrameTransport for ChannelTransport {
    fn post_message(&self, to: &FrameId, message: String) {
        let posted = PostedMessage {
            to: to.clone(),
            message,
        };
        if self.tx.send(posted).is_err() {
            debug!(to = %to, "transport closed; message dropped");
        }
    }
}

// ============================================================================
// Relay
// ============================================================================

type RequestHandler = Rc<dyn Fn(FrameId, Value) -> LocalBoxFuture<'static, Result<Value, RelayError>>>;
type NotificationHandler = Rc<dyn Fn(FrameId, Value) -> Result<(), RelayError>>;

type PendingMap = RefCell<HashMap<String, oneshot::Sender<Value>>>;

/// Removes a pending slot however the request ends (answered, timed out or
/// the future dropped).
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.borrow_mut().remove(&self.id);
    }
}

/// Request/response RPC between windows, correlated by message id.
///
/// Incoming frames are routed by type: `RESPONSE` resolves the pending
/// request with the same id, everything else goes to the handler registered
/// for that type.
pub struct FrameRelay {
    transport: Rc<dyn FrameTransport>,
    timeout: Duration,
    handlers: RefCell<HashMap<MessageType, RequestHandler>>,
    listeners: RefCell<HashMap<MessageType, NotificationHandler>>,
    pending: PendingMap,
}

impl FrameRelay {
    pub fn new(transport: Rc<dyn FrameTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            handlers: RefCell::new(HashMap::new()),
            listeners: RefCell::new(HashMap::new()),
            pending: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_config(transport: Rc<dyn FrameTransport>, config: &RelayConfig) -> Self {
        Self::new(transport, config.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Answer requests of type `R`. Replaces any previous handler.
    pub fn on<R, F, Fut>(&self, handler: F)
    where
        R: RelayRequest,
        F: Fn(FrameId, R) -> Fut + 'static,
        Fut: Future<Output = R::Response> + 'static,
    {
        let handler = Rc::new(handler);
        let wrapped: RequestHandler = Rc::new(move |from, data| {
            let handler = handler.clone();
            async move {
                let request: R = serde_json::from_value(data)
                    .map_err(|source| RelayError::Decode { kind: R::TYPE, source })?;
                let response = handler(from, request).await;
                serde_json::to_value(response).map_err(|source| RelayError::Encode {
                    context: "response",
                    source,
                })
            }
            .boxed_local()
        });
        self.handlers.borrow_mut().insert(R::TYPE, wrapped);
    }

    /// React to fire-and-forget messages of type `N`.
    pub fn on_notification<N, F>(&self, handler: F)
    where
        N: RelayMessage,
        F: Fn(FrameId, N) + 'static,
    {
        let wrapped: NotificationHandler = Rc::new(move |from, data| {
            let message: N = serde_json::from_value(data)
                .map_err(|source| RelayError::Decode { kind: N::TYPE, source })?;
            handler(from, message);
            Ok(())
        });
        self.listeners.borrow_mut().insert(N::TYPE, wrapped);
    }

    pub fn off(&self, kind: MessageType) {
        self.handlers.borrow_mut().remove(&kind);
        self.listeners.borrow_mut().remove(&kind);
    }

    /// Send `request` to `to` and wait for the matching `RESPONSE`, at most
    /// for the relay's timeout.
    pub async fn send<R: RelayRequest>(&self, to: &FrameId, request: R) -> Result<R::Response, RelayError> {
        let data = serde_json::to_value(&request).map_err(|source| RelayError::Encode {
            context: "request",
            source,
        })?;
        let id = Uuid::new_v4().to_string();
        let message = encode(&Envelope {
            kind: R::TYPE,
            data,
            id: id.clone(),
        })?;

        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().insert(id.clone(), tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id: id.clone(),
        };

        debug!(to = %to, kind = ?R::TYPE, id = %id, "relay request");
        self.transport.post_message(to, message);

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => serde_json::from_value(result)
                .map_err(|source| RelayError::Decode { kind: R::TYPE, source }),
            Ok(Err(_)) => Err(RelayError::Closed(id)),
            Err(_) => Err(RelayError::Timeout {
                id,
                kind: R::TYPE,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Post a message nobody answers.
    pub fn notify<N: RelayMessage>(&self, to: &FrameId, message: N) -> Result<(), RelayError> {
        let data = serde_json::to_value(&message).map_err(|source| RelayError::Encode {
            context: "notification",
            source,
        })?;
        let message = encode(&Envelope {
            kind: N::TYPE,
            data,
            id: Uuid::new_v4().to_string(),
        })?;
        self.transport.post_message(to, message);
        Ok(())
    }

    /// Handle one raw message that arrived from window `from`.
    pub async fn receive(&self, from: FrameId, raw: &str) -> Result<(), RelayError> {
        let envelope: Envelope = serde_json::from_str(raw).map_err(RelayError::Malformed)?;

        if envelope.kind == MessageType::Response {
            let response: ResponseData = serde_json::from_value(envelope.data).map_err(|source| {
                RelayError::Decode {
                    kind: MessageType::Response,
                    source,
                }
            })?;
            match self.pending.borrow_mut().remove(&response.id) {
                Some(tx) => {
                    // The requester may have given up already.
                    let _ = tx.send(response.result);
                }
                None => debug!(id = %response.id, "response for unknown or expired request"),
            }
            return Ok(());
        }

        let listener = self.listeners.borrow().get(&envelope.kind).cloned();
        if let Some(listener) = listener {
            return listener(from, envelope.data);
        }

        let handler = self.handlers.borrow().get(&envelope.kind).cloned();
        let Some(handler) = handler else {
            return Err(RelayError::NoHandler(envelope.kind));
        };

        let result = handler(from.clone(), envelope.data).await?;
        if !envelope.kind.expects_response() {
            return Ok(());
        }
        let data = serde_json::to_value(ResponseData {
            id: envelope.id,
            result,
        })
        .map_err(|source| RelayError::Encode {
            context: "response",
            source,
        })?;
        let reply = encode(&Envelope {
            kind: MessageType::Response,
            data,
            id: Uuid::new_v4().to_string(),
        })?;
        self.transport.post_message(&from, reply);
        Ok(())
    }

    /// Like [`receive`](Self::receive), but failures are logged instead of
    /// returned. For message pumps that have nobody to report to.
    pub async fn dispatch(&self, from: FrameId, raw: &str) {
        if let Err(err) = self.receive(from.clone(), raw).await {
            warn!(from = %from, error = %err, "dropping relay message");
        }
    }

    /// Requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

// ============================================================================
// In-process bus
// ============================================================================

/// Delivers messages between windows that live on the same thread, such as
/// a page snapshot and the frames embedded in it. Each window joins once
/// and gets its own relay; messages are routed by their target id.
pub struct LocalBus {
    timeout: Duration,
    windows: RefCell<HashMap<FrameId, Weak<FrameRelay>>>,
}

impl LocalBus {
    pub fn new(config: &RelayConfig) -> Rc<Self> {
        Rc::new(Self {
            timeout: config.timeout(),
            windows: RefCell::new(HashMap::new()),
        })
    }

    /// The relay of window `id`, joining the bus on first use. Must be
    /// called inside a `tokio::task::LocalSet`.
    pub fn join(self: &Rc<Self>, id: &FrameId) -> Rc<FrameRelay> {
        if let Some(relay) = self.window(id) {
            return relay;
        }
        let (transport, mut rx) = ChannelTransport::new();
        let relay = Rc::new(FrameRelay::new(Rc::new(transport), self.timeout));
        self.windows
            .borrow_mut()
            .insert(id.clone(), Rc::downgrade(&relay));

        // Ends once the relay, and with it the sending half, is dropped.
        let bus = self.clone();
        let from = id.clone();
        tokio::task::spawn_local(async move {
            while let Some(posted) = rx.recv().await {
                let Some(target) = bus.window(&posted.to) else {
                    debug!(from = %from, to = %posted.to, "no such window; message dropped");
                    continue;
                };
                let from = from.clone();
                tokio::task::spawn_local(async move {
                    target.dispatch(from, &posted.message).await;
                });
            }
        });
        relay
    }

    fn window(&self, id: &FrameId) -> Option<Rc<FrameRelay>> {
        self.windows.borrow().get(id)?.upgrade()
    }
}

fn encode(envelope: &Envelope) -> Result<String, RelayError> {
    serde_json::to_string(envelope).map_err(|source| RelayError::Encode {
        context: "envelope",
        source,
    })
}
