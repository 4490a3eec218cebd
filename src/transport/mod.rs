//! Transport layer: gRPC wire messages and domain ↔ wire mapping.

mod proto;
mod send;

pub use proto::{MailerClient, SendRes};
pub use send::{TransportError, WireRequest, decode_send_res, encode_send_request};
