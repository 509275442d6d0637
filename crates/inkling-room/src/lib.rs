//! Room engine for Inkling.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns a
//! [`Room`] aggregate: the roster, settings, current turn, round cycle and
//! every timer. Nothing outside the actor touches room state.
//!
//! # Key types
//!
//! - [`Room`]: the aggregate and its whole mutation surface
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomStore`] / [`InMemoryRoomStore`]: the injected room registry
//! - [`EngineConfig`]: reveal, countdown, reset and grace timings
//!
//! The scoring, mask and word-pool rules are pure and live in
//! [`scoring`], [`mask`] and [`words`].

mod actor;
mod config;
mod error;
pub mod mask;
mod room;
mod scheduler;
pub mod scoring;
mod store;
mod turn;
pub mod words;

pub use actor::{PlayerAction, PlayerSender, RoomHandle, RoomInfo};
pub use config::EngineConfig;
pub use error::RoomError;
pub use room::{Player, Room, TimerEvent};
pub use store::{InMemoryRoomStore, RoomStore};
pub use turn::{CorrectGuess, Turn};
