//! Request/reply correlation.
//!
//! The [`Correlator`] owns the table of in-flight requests. It frames each
//! outgoing value with a fresh request id, hands the frame to an [`Outbox`],
//! re-sends it every time its deadline passes, and completes the matching
//! [`Outcome`] when a reply with the same id arrives.
//!
//! It does no I/O of its own and never reads the clock except in
//! [`Correlator::submit`]: the owner feeds it inbound frames, connection
//! events and the current time. [`Client`](crate::Client) is one such owner;
//! tests are another.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use holoplay_cbor::{encode, CodecError, Decoder, Value};
use holoplay_frame::{decode_frame, Frame, FrameError, RequestIdGenerator};
use holoplay_transport::TransportError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::CorrelatorConfig;
use crate::error::{RequestError, Result};

/// How many times a colliding id is redrawn before it is used anyway.
const MAX_ID_REDRAWS: usize = 8;

/// Destination for outbound frames.
///
/// Frames must leave in the order they are pushed.
pub trait Outbox {
    fn push(&mut self, frame: Bytes) -> holoplay_transport::Result<()>;
}

impl Outbox for mpsc::UnboundedSender<Bytes> {
    fn push(&mut self, frame: Bytes) -> holoplay_transport::Result<()> {
        self.send(frame).map_err(|_| TransportError::Closed)
    }
}

impl Outbox for Vec<Bytes> {
    fn push(&mut self, frame: Bytes) -> holoplay_transport::Result<()> {
        Vec::push(self, frame);
        Ok(())
    }
}

/// What an [`Outcome`] resolves to.
pub type RequestResult = std::result::Result<Value, RequestError>;

/// A request waiting for its reply.
#[derive(Debug)]
struct PendingRequest {
    frame: Bytes,
    sender: oneshot::Sender<RequestResult>,
    timeout: Duration,
    deadline: Instant,
    attempts: u32,
    submitted_at: Instant,
}

impl PendingRequest {
    fn complete(self, result: RequestResult) {
        // The caller may have dropped its outcome; nothing to tell.
        let _ = self.sender.send(result);
    }
}

/// A reply that matched a pending request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: u32,
    pub payload: Value,
}

/// What [`Correlator::on_frame`] did with an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDisposition {
    /// Matched a pending request and resolved it.
    Resolved { id: u32 },
    /// Matched a pending request and rejected it.
    Rejected { id: u32 },
    /// Discarded without touching any pending request.
    Dropped(DropReason),
}

/// Why an inbound frame was discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// Shorter than the id header.
    Truncated { len: usize },
    /// Id without the reply bit.
    NotAReply { id: u32 },
    /// Payload is not valid CBOR. The request stays pending.
    Undecodable { id: u32, error: CodecError },
    /// No pending request has this id.
    Unmatched { id: u32 },
}

/// Completion handle for one submitted request.
///
/// Resolves to the reply payload on success or a [`RequestError`]. Dropping
/// it does not withdraw the request; use [`Correlator::cancel`] for that.
#[derive(Debug)]
pub struct Outcome {
    id: u32,
    rx: oneshot::Receiver<RequestResult>,
}

impl Outcome {
    /// Request id this outcome is waiting on.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Take the result if the request has already completed.
    pub fn try_result(&mut self) -> Option<RequestResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RequestError::Abandoned)),
        }
    }
}

impl Future for Outcome {
    type Output = RequestResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RequestError::Abandoned)))
    }
}

/// In-flight request table.
pub struct Correlator<O> {
    outbox: O,
    ids: RequestIdGenerator,
    decoder: Decoder,
    config: CorrelatorConfig,
    pending: HashMap<u32, PendingRequest>,
    replies: VecDeque<Reply>,
    connected: bool,
}

impl<O: Outbox> Correlator<O> {
    pub fn new(outbox: O, config: CorrelatorConfig) -> Self {
        Self {
            outbox,
            ids: RequestIdGenerator::from_system_time(),
            decoder: Decoder::new(),
            config,
            pending: HashMap::new(),
            replies: VecDeque::new(),
            connected: false,
        }
    }

    /// Replace the id generator, e.g. with a fixed seed.
    pub fn with_id_generator(mut self, ids: RequestIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the reply decoder.
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Turn on `cmd.debug = true` for every later submission.
    pub fn set_always_debug(&mut self, enabled: bool) {
        self.config.always_debug = enabled;
    }

    /// Submit with the default timeout.
    pub fn submit(&mut self, value: Value) -> Result<Outcome> {
        let timeout = self.config.default_timeout;
        self.submit_at(value, timeout, Instant::now())
    }

    pub fn submit_with_timeout(&mut self, value: Value, timeout: Duration) -> Result<Outcome> {
        self.submit_at(value, timeout, Instant::now())
    }

    /// Frame `value`, send it, and arm its retransmit deadline at `now + timeout`.
    ///
    /// Fails only when the outbox is closed; nothing is left pending then.
    pub fn submit_at(&mut self, mut value: Value, timeout: Duration, now: Instant) -> Result<Outcome> {
        if self.config.always_debug {
            mark_debug(&mut value);
        }

        let id = self.fresh_id();
        let frame = Frame::new(id, encode(&value)).to_bytes();

        self.outbox.push(frame.clone())?;
        debug!(id, len = frame.len(), timeout_ms = timeout.as_millis() as u64, "request sent");

        let (sender, rx) = oneshot::channel();
        self.pending.insert(
            id,
            PendingRequest {
                frame,
                sender,
                timeout,
                deadline: now + timeout,
                attempts: 1,
                submitted_at: now,
            },
        );
        Ok(Outcome { id, rx })
    }

    /// Re-send every request whose deadline is at or before `now`.
    ///
    /// Requests that hit `max_attempts` are rejected instead. Returns the
    /// number of frames re-sent. Does nothing while the connection is down.
    pub fn poll_timers(&mut self, now: Instant) -> usize {
        if !self.connected {
            return 0;
        }
        let mut due: Vec<(Instant, Instant, u32)> = self
            .pending
            .iter()
            .filter(|(_, request)| request.deadline <= now)
            .map(|(id, request)| (request.deadline, request.submitted_at, *id))
            .collect();
        due.sort_unstable();

        let cap = self.config.max_attempts.map(|cap| cap.max(1));
        let mut resent = 0;
        for (_, _, id) in due {
            let exhausted = match (self.pending.get(&id), cap) {
                (Some(request), Some(cap)) => request.attempts >= cap,
                (Some(_), None) => false,
                (None, _) => continue,
            };

            if exhausted {
                if let Some(request) = self.pending.remove(&id) {
                    let attempts = request.attempts;
                    warn!(id, attempts, "giving up on request");
                    request.complete(Err(RequestError::RetriesExhausted { attempts }));
                }
                continue;
            }

            let Some(request) = self.pending.get_mut(&id) else {
                continue;
            };
            request.deadline = now + request.timeout;
            request.attempts += 1;
            let attempts = request.attempts;
            let frame = request.frame.clone();
            match self.outbox.push(frame) {
                Ok(()) => {
                    debug!(id, attempts, "request re-sent");
                    resent += 1;
                }
                Err(err) => warn!(id, attempts, error = %err, "re-send failed"),
            }
        }
        resent
    }

    /// Earliest pending deadline, or `None` while the connection is down.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.connected {
            return None;
        }
        self.pending.values().map(|request| request.deadline).min()
    }

    /// Route one inbound frame.
    ///
    /// Never fails: anything that does not complete a request is dropped and
    /// reported through the returned disposition and a log line.
    pub fn on_frame(&mut self, frame: Bytes) -> FrameDisposition {
        let len = frame.len();
        let frame = match decode_frame(frame) {
            Ok(frame) => frame,
            Err(FrameError::Truncated { len }) => {
                warn!(len, "dropping truncated frame");
                return FrameDisposition::Dropped(DropReason::Truncated { len });
            }
            Err(FrameError::NotAReply { id }) => {
                warn!(id, len, "dropping frame with bad header");
                return FrameDisposition::Dropped(DropReason::NotAReply { id });
            }
        };

        let id = frame.id;
        if !self.pending.contains_key(&id) {
            debug!(id, "reply for unknown or completed request");
            return FrameDisposition::Dropped(DropReason::Unmatched { id });
        }

        let payload = match self.decoder.decode(&frame.payload) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(id, error = %error, "dropping undecodable reply");
                return FrameDisposition::Dropped(DropReason::Undecodable { id, error });
            }
        };

        let Some(request) = self.pending.remove(&id) else {
            return FrameDisposition::Dropped(DropReason::Unmatched { id });
        };
        trace!(id, attempts = request.attempts, "reply matched");
        self.remember(Reply {
            id,
            payload: payload.clone(),
        });

        if is_success(&payload) {
            request.complete(Ok(payload));
            FrameDisposition::Resolved { id }
        } else {
            debug!(id, "request rejected by driver");
            request.complete(Err(RequestError::Rejected(payload)));
            FrameDisposition::Rejected { id }
        }
    }

    pub fn connection_opened(&mut self) {
        debug!(pending = self.pending.len(), "connection opened");
        self.connected = true;
    }

    /// Mark the connection down. Pending requests stay pending.
    pub fn connection_closed(&mut self) {
        debug!(pending = self.pending.len(), "connection closed");
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Withdraw a pending request. Returns false if `id` is not pending.
    pub fn cancel(&mut self, id: u32) -> bool {
        match self.pending.remove(&id) {
            Some(request) => {
                debug!(id, "request cancelled");
                request.complete(Err(RequestError::Cancelled));
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: u32) -> bool {
        self.pending.contains_key(&id)
    }

    /// Completed replies, oldest first.
    pub fn replies(&self) -> impl ExactSizeIterator<Item = &Reply> + '_ {
        self.replies.iter()
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    fn fresh_id(&mut self) -> u32 {
        let mut id = self.ids.next_id();
        for _ in 0..MAX_ID_REDRAWS {
            if !self.pending.contains_key(&id) {
                return id;
            }
            id = self.ids.next_id();
        }
        if self.pending.contains_key(&id) {
            warn!(id, "request id still collides after redraws");
        }
        id
    }

    fn remember(&mut self, reply: Reply) {
        match self.config.history_limit {
            Some(0) => {}
            Some(limit) => {
                while self.replies.len() >= limit {
                    self.replies.pop_front();
                }
                self.replies.push_back(reply);
            }
            None => self.replies.push_back(reply),
        }
    }
}

impl<O> fmt::Debug for Correlator<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending.len())
            .field("replies", &self.replies.len())
            .field("connected", &self.connected)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A reply succeeds only when it is a map whose `error` field is numeric zero.
fn is_success(payload: &Value) -> bool {
    payload.get("error").is_some_and(Value::is_zero)
}

fn mark_debug(value: &mut Value) {
    if let Some(cmd) = value.get_mut("cmd") {
        if cmd.is_map() {
            cmd.insert("debug", true);
        }
    }
}
