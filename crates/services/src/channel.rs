//! Asynchronous message channel between the host page and the embedded quiz.
//!
//! Each direction is an unbounded FIFO of raw JSON values, the same contract a
//! cross-frame `postMessage` gives: sending never blocks, anything may arrive,
//! and each side decodes only the message family addressed to it. Order is
//! preserved per direction, so directives are applied in emission order.

use std::marker::PhantomData;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use retain_core::protocol::{HostMessage, ProtocolError, QuizMessage};

use crate::error::ChannelError;

/// A message family that can cross the frame boundary.
pub trait WireMessage: Sized {
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message cannot be represented as JSON.
    fn to_value(&self) -> Result<Value, ProtocolError>;

    /// # Errors
    ///
    /// Returns `ProtocolError` if `value` is not a message of this family.
    fn from_value(value: &Value) -> Result<Self, ProtocolError>;
}

impl WireMessage for HostMessage {
    fn to_value(&self) -> Result<Value, ProtocolError> {
        self.encode()
    }

    fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        HostMessage::decode(value)
    }
}

impl WireMessage for QuizMessage {
    fn to_value(&self) -> Result<Value, ProtocolError> {
        self.encode()
    }

    fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        QuizMessage::decode(value)
    }
}

/// One side of the channel: sends `Out`, receives `In`.
pub struct Endpoint<Out, In> {
    outbound: UnboundedSender<Value>,
    inbound: UnboundedReceiver<Value>,
    _marker: PhantomData<fn(Out) -> In>,
}

/// Held by the host bridge: sends telemetry, receives directives.
pub type HostEndpoint = Endpoint<HostMessage, QuizMessage>;

/// Held by the embedded quiz: sends directives, receives telemetry.
pub type EmbedEndpoint = Endpoint<QuizMessage, HostMessage>;

/// Create a connected host/embed endpoint pair.
#[must_use]
pub fn pair() -> (HostEndpoint, EmbedEndpoint) {
    let (to_embed, from_host) = mpsc::unbounded_channel();
    let (to_host, from_embed) = mpsc::unbounded_channel();
    (
        Endpoint {
            outbound: to_embed,
            inbound: from_embed,
            _marker: PhantomData,
        },
        Endpoint {
            outbound: to_host,
            inbound: from_host,
            _marker: PhantomData,
        },
    )
}

impl<Out: WireMessage, In: WireMessage> Endpoint<Out, In> {
    /// Post a typed message to the peer.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Closed` once the peer has been torn down.
    pub fn post(&self, message: &Out) -> Result<(), ChannelError> {
        self.post_raw(message.to_value()?)
    }

    /// Post an arbitrary JSON payload, as any script on the page could.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Closed` once the peer has been torn down.
    pub fn post_raw(&self, value: Value) -> Result<(), ChannelError> {
        self.outbound.send(value).map_err(|_| ChannelError::Closed)
    }

    /// Wait for the next message addressed to this side.
    ///
    /// Payloads that do not decode are skipped. Returns `None` once the peer
    /// is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<In> {
        loop {
            let value = self.inbound.recv().await?;
            if let Some(message) = decode_or_skip(&value) {
                return Some(message);
            }
        }
    }

    /// Take the next queued message without waiting.
    pub fn try_recv(&mut self) -> Option<In> {
        while let Ok(value) = self.inbound.try_recv() {
            if let Some(message) = decode_or_skip(&value) {
                return Some(message);
            }
        }
        None
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

fn decode_or_skip<In: WireMessage>(value: &Value) -> Option<In> {
    match In::from_value(value) {
        Ok(message) => Some(message),
        Err(err) => {
            debug!(%err, payload = %value, "dropping unrecognised message");
            None
        }
    }
}
