//! Transport abstraction layer for Inkling.
//!
//! Provides the [`Transport`] and [`Connection`] traits the server is written
//! against, plus a WebSocket implementation.
//!
//! A connection yields [`Incoming`] items: either a data frame or a single
//! terminal [`Incoming::Closed`] that says *how* the peer went away. The
//! room layer treats a deliberate close very differently from a dropped
//! network link (see [`CloseKind`]).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection.
///
/// A player keeps their `PlayerId` across reconnects; the connection id
/// changes every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// The peer asked to close with a normal close code. The player meant
    /// to go.
    Deliberate,
    /// The link dropped: abnormal close code, reset, stream ended without a
    /// close frame, or idle timeout. Typical of mobile clients switching
    /// networks or backgrounding the tab.
    Transient,
}

/// One item read from a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A complete data frame.
    Data(Vec<u8>),
    /// The connection is closed. No more items follow.
    Closed(CloseKind),
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
///
/// Sending and receiving are independent: a task blocked in
/// [`recv`](Self::recv) never delays a concurrent [`send`](Self::send).
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next item from the remote peer.
    ///
    /// Transport errors are folded into [`Incoming::Closed`] with
    /// [`CloseKind::Transient`]; a broken link is just another way to go
    /// away.
    async fn recv(&self) -> Incoming;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
