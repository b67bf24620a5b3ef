//! Adapters - Implementations of port interfaces.
//!
//! - `backend` - Fluently backend API client and a scripted mock
//! - `session` - Session stores (Redis, in-memory)
//! - `http` - Webhook endpoint for the chat transport

pub mod backend;
pub mod http;
pub mod session;
