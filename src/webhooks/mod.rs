//! Inbound webhook events.
//!
//! This module provides:
//! - Typed events ([`InboundEvent`]) that the dispatcher routes
//! - A decoder table mapping event-type headers to payload decoders
//! - Signature verification for webhook payloads (HMAC-SHA256)

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{CommentAction, CommentEvent, EventKind, InboundEvent};
pub use parser::{Decoder, DecoderTable, ParseError};
pub use signature::{SignatureError, WebhookSecret};
