//! WebSocket message types for the order progress stream.
//!
//! The `GET /orders/{id}/ws` endpoint upgrades to a WebSocket
//! connection and pushes [`WsServerMessage`] JSON frames.
//!
//! # Protocol
//!
//! 1. The server sends a [`WsServerMessage::Progress`] with the current
//!    order state immediately after the upgrade.
//! 2. Subsequent [`WsServerMessage::Progress`] frames are sent whenever
//!    the order's lifecycle stage changes.
//! 3. After a terminal stage (`settled`, `failed`) the server sends a
//!    normal close frame.
//! 4. If the order is not found the server sends an error frame followed
//!    by a close frame with an application-defined code (see
//!    [`WsCloseCode`]).

use serde::{Deserialize, Serialize};

use super::order::OrderResponse;

/// Server-to-client WebSocket message.
///
/// ```json
/// {"type":"progress","order":{ ... }}
/// {"type":"error","code":4004,"reason":"order not found"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// Full order state at this point in time.
    Progress { order: OrderResponse },

    /// A server-side error. The server may send a close frame afterwards.
    Error { code: u16, reason: String },
}

/// Close codes used by the order progress stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure after a terminal stage has been delivered.
    pub const NORMAL: u16 = 1000;

    /// The order store went away (server shutting down).
    pub const GOING_AWAY: u16 = 1001;

    /// The requested order does not exist.
    pub const ORDER_NOT_FOUND: u16 = 4004;
}
