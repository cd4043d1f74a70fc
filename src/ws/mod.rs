//! WebSocket hub for relaying chat messages between connected clients.
//!
//! A [`Hub`] runs one dedicated task that owns the membership set for a
//! single room. Client adapters submit joins, leaves, and broadcasts through
//! bounded queues on a cloned [`HubHandle`]; the hub task is the only code
//! that ever mutates membership, so no locking is needed on it.

mod client;
mod handler;
mod hub;

pub use client::ClientAdapter;
pub use handler::room_handler;
pub use hub::{ConnId, Hub, HubHandle, OUTBOUND_BUFFER_SIZE, Registration};
