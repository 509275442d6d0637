//! Wire protocol for Inkling.
//!
//! This crate defines the language that browser clients and the server
//! speak:
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`RoomStatus`], [`Envelope`]):
//!   identities and framing.
//! - **Settings** ([`Settings`], [`SettingsRequest`]): per-room
//!   configuration and the clamping applied to client input.
//! - **Snapshots** ([`RoomSnapshot`] and friends): the read-only view of a
//!   room pushed after every mutation.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): what travels inside an
//!   envelope.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how it all becomes bytes.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<ClientEvent>) → Session → Room
//! ```
//!
//! The protocol layer knows nothing about connections or room logic.

mod codec;
mod error;
mod events;
mod settings;
mod snapshot;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{AckOutcome, ChatMessage, ClientEvent, JoinedRoom, ServerEvent};
pub use settings::{
    MAX_CHAT_LEN, MAX_CUSTOM_WORDS, MAX_NAME_LEN, Settings, SettingsRequest, normalize_name,
    truncate_chars,
};
pub use snapshot::{GameView, PlayerView, Ranking, RoomSnapshot, TurnView};
pub use types::{
    Envelope, ErrorCode, PlayerId, Recipient, RoomCode, RoomStatus, TurnEndReason,
};
