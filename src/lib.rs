//! Roomcast library.
//!
//! This library provides the core components of the roomcast chat relay:
//! the WebSocket hub and its client adapters, the session/auth gate, and
//! the avatar-resolution chain.

pub mod api;
pub mod auth;
pub mod avatar;
pub mod config;
pub mod ws;
