//! Async client: one connection, one request table.
//!
//! [`Client`] runs two tasks per connection. The writer drains the outbound
//! queue into the transport sink in order. The reader feeds inbound frames
//! to the [`Correlator`] and fires retransmissions when deadlines pass. Both
//! stop when the connection drops or the client is disconnected.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use holoplay_cbor::Value;
use holoplay_frame::RequestIdGenerator;
use holoplay_transport::{FrameSink, FrameSource};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::correlator::{Correlator, FrameDisposition, Outcome, Reply};
use crate::error::{ClientError, Result};
use crate::message::{InitOptions, Message};

type Outbound = mpsc::UnboundedSender<Bytes>;

/// Connection lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    /// The transport failed. A `Closed` event follows.
    Error(String),
    Closed,
}

struct Shared {
    correlator: Mutex<Correlator<Outbound>>,
    /// Pinged after every submit so the reader re-reads the next deadline.
    wake: Notify,
}

impl Shared {
    fn correlator(&self) -> MutexGuard<'_, Correlator<Outbound>> {
        self.correlator.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Request/reply client for HoloPlay Service.
pub struct Client {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    events: Option<mpsc::UnboundedReceiver<ConnectionEvent>>,
    handshake: Option<Value>,
}

impl Client {
    /// Connect to the driver over WebSocket and run the handshake.
    #[cfg(feature = "ws")]
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let (sink, source) =
            holoplay_transport::connect(&config.url, config.subprotocol.as_deref()).await?;
        Self::with_transport(sink, source, config).await
    }

    /// Run a client over an already open connection.
    ///
    /// Sends `init` when any init option is set, otherwise `info` if
    /// `fetch_info` is on, and waits for that reply before returning.
    pub async fn with_transport<S, R>(sink: S, source: R, config: ClientConfig) -> Result<Self>
    where
        S: FrameSink + 'static,
        R: FrameSource + 'static,
    {
        let mut client = Self::start(sink, source, &config);

        let first = if config.needs_init() {
            let options = InitOptions {
                app_id: config.app_id.clone(),
                greedy: config.greedy,
                on_close: config.on_close,
                debug: config.debug,
            };
            Some(Message::init(&options))
        } else {
            if config.debug {
                client.shared.correlator().set_always_debug(true);
            }
            config.fetch_info.then(Message::info)
        };

        if let Some(message) = first {
            debug!(command = message.name().unwrap_or_default(), "sending handshake");
            let outcome = client.send_message(&message)?;
            let reply = client.wait(outcome).await?;
            client.handshake = Some(reply);
        }
        Ok(client)
    }

    fn start<S, R>(sink: S, source: R, config: &ClientConfig) -> Self
    where
        S: FrameSink + 'static,
        R: FrameSource + 'static,
    {
        let ids = config
            .id_seed
            .as_deref()
            .map(RequestIdGenerator::from_seed)
            .unwrap_or_default();
        let (outbound, queue) = mpsc::unbounded_channel();
        let mut correlator = Correlator::new(outbound, config.correlator.clone()).with_id_generator(ids);
        correlator.connection_opened();

        let shared = Arc::new(Shared {
            correlator: Mutex::new(correlator),
            wake: Notify::new(),
        });
        let cancel = CancellationToken::new();
        let (events_tx, events) = mpsc::unbounded_channel();
        let _ = events_tx.send(ConnectionEvent::Opened);
        info!(url = %config.url, "client connected");

        let tasks = vec![
            tokio::spawn(write_loop(sink, queue, cancel.clone(), events_tx.clone())),
            tokio::spawn(read_loop(source, Arc::clone(&shared), cancel.clone(), events_tx)),
        ];

        Self {
            shared,
            cancel,
            tasks,
            events: Some(events),
            handshake: None,
        }
    }

    /// Submit a raw value with the configured retransmit interval.
    pub fn submit(&self, value: Value) -> Result<Outcome> {
        let outcome = self.shared.correlator().submit(value)?;
        self.shared.wake.notify_one();
        Ok(outcome)
    }

    pub fn submit_with_timeout(&self, value: Value, timeout: Duration) -> Result<Outcome> {
        let outcome = self.shared.correlator().submit_with_timeout(value, timeout)?;
        self.shared.wake.notify_one();
        Ok(outcome)
    }

    pub fn send_message(&self, message: &Message) -> Result<Outcome> {
        self.submit(message.to_value())
    }

    pub fn send_message_with_timeout(&self, message: &Message, timeout: Duration) -> Result<Outcome> {
        self.submit_with_timeout(message.to_value(), timeout)
    }

    /// Submit and wait for the reply.
    ///
    /// Fails with [`ClientError::Disconnected`] if the connection drops
    /// first; the request itself stays pending.
    pub async fn request(&self, value: Value) -> Result<Value> {
        let outcome = self.submit(value)?;
        self.wait(outcome).await
    }

    /// Submit and wait at most `wait` for the reply. Cancels the request on expiry.
    pub async fn request_within(&self, value: Value, wait: Duration) -> Result<Value> {
        let outcome = self.submit(value)?;
        let id = outcome.id();
        match tokio::time::timeout(wait, self.wait(outcome)).await {
            Ok(result) => result,
            Err(_) => {
                self.cancel(id);
                Err(ClientError::Timeout(wait))
            }
        }
    }

    async fn wait(&self, outcome: Outcome) -> Result<Value> {
        tokio::select! {
            biased;
            result = outcome => Ok(result?),
            _ = self.cancel.cancelled() => {
                debug!("connection closed while awaiting reply");
                Err(ClientError::Disconnected)
            }
        }
    }

    /// Withdraw a pending request. Its outcome completes with `Cancelled`.
    pub fn cancel(&self, id: u32) -> bool {
        self.shared.correlator().cancel(id)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.correlator().is_connected()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.correlator().pending_count()
    }

    /// Snapshot of the reply history, oldest first.
    pub fn replies(&self) -> Vec<Reply> {
        self.shared.correlator().replies().cloned().collect()
    }

    /// Reply to the `init`/`info` sent on connect.
    pub fn handshake_reply(&self) -> Option<&Value> {
        self.handshake.as_ref()
    }

    /// Take the connection event stream. Only the first call gets it.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>> {
        self.events.take()
    }

    /// Close the connection and wait for the driver tasks to finish.
    pub async fn disconnect(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "client task failed");
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("correlator", &*self.shared.correlator())
            .field("handshake", &self.handshake)
            .finish_non_exhaustive()
    }
}

async fn write_loop<S: FrameSink>(
    mut sink: S,
    mut queue: mpsc::UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = queue.recv() => frame,
        };
        let Some(frame) = frame else { break };
        if let Err(err) = sink.send_frame(frame).await {
            warn!(error = %err, "send failed");
            let _ = events.send(ConnectionEvent::Error(err.to_string()));
            cancel.cancel();
            break;
        }
    }
    if let Err(err) = sink.close().await {
        debug!(error = %err, "close failed");
    }
}

async fn read_loop<R: FrameSource>(
    mut source: R,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    loop {
        let deadline = shared.correlator().next_deadline();
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = shared.wake.notified() => {}
            _ = sleep_until(deadline) => {
                let resent = shared.correlator().poll_timers(Instant::now());
                if resent > 0 {
                    debug!(resent, "retransmitted requests");
                }
            }
            frame = source.next_frame() => match frame {
                Some(Ok(frame)) => {
                    if let FrameDisposition::Dropped(reason) = shared.correlator().on_frame(frame) {
                        debug!(?reason, "inbound frame dropped");
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "receive failed");
                    let _ = events.send(ConnectionEvent::Error(err.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    shared.correlator().connection_closed();
    info!("client disconnected");
    let _ = events.send(ConnectionEvent::Closed);
    cancel.cancel();
}

fn sleep_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
