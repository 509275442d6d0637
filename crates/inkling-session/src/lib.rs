//! Player session management for Inkling.
//!
//! This crate separates *who a player is* from *which socket they are on*:
//!
//! 1. **Bindings**: [`SessionManager`] maps each live connection to the
//!    stable [`PlayerId`](inkling_protocol::PlayerId) and room it plays in.
//!    A reconnect swaps the connection behind a player without touching
//!    anything keyed by the player id.
//! 2. **Disconnects**: [`DisconnectReason`] tells a deliberate exit apart
//!    from a dropped network link.
//! 3. **Grace periods**: [`GracePeriods`] holds one cancellable timer per
//!    disconnected player. Rejoining or leaving cancels it; if it fires, the
//!    player is removed for good.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← owns a GracePeriods per room
//!     ↕
//! Session Layer (here)   ← connection ↔ player bindings
//!     ↕
//! Protocol / Transport   ← PlayerId, RoomCode, ConnectionId, CloseKind
//! ```

mod error;
mod grace;
mod manager;
mod session;

pub use error::SessionError;
pub use grace::GracePeriods;
pub use manager::SessionManager;
pub use session::{DisconnectReason, Session};
