//! # Inkling
//!
//! Real-time, server-authoritative draw-and-guess game server.
//!
//! One player draws while the others guess in chat. The server owns every
//! rule: who draws, what the word is, how much of it is shown, who scored
//! what, and when the game moves on. Clients speak JSON over WebSocket and
//! receive a full room snapshot after every change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inkling::{InklingServer, ServerConfig};
//!
//! # async fn run() -> Result<(), inkling::InklingError> {
//! let config = ServerConfig::from_env();
//! let server = InklingServer::builder().config(&config).build().await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Layers
//!
//! | Crate | Concern |
//! |---|---|
//! | [`transport`] | WebSocket connections and close classification |
//! | [`protocol`] | wire events, snapshots, settings, codec |
//! | [`session`] | connection ↔ player bindings, grace periods |
//! | [`room`] | the room actor, scheduler, scoring and masking |

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::InklingError;
pub use server::{InklingServer, InklingServerBuilder};

pub use inkling_protocol as protocol;
pub use inkling_room as room;
pub use inkling_session as session;
pub use inkling_transport as transport;
