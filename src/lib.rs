//! Typed Rust client for the Kannon transactional email gRPC API.
//!
//! The crate is split into a domain layer (recipients, options, the canonical send
//! request and result), a transport layer for the protobuf wire format, and a small
//! client layer that issues one unary call per send.
//!
//! ```rust,no_run
//! use kannon::{KannonClient, KannonConfig, Recipient, SendOptions, Sender};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kannon::KannonError> {
//!     let sender = Sender::new("noreply@example.com", "Example");
//!     let client = KannonClient::new(
//!         "example.com",
//!         "api-key",
//!         sender,
//!         KannonConfig::endpoint("api.kannon.email:443"),
//!     )?;
//!     let recipients = vec![Recipient::from("user@example.com")];
//!     let result = client
//!         .send_html(recipients, "Hello", "<p>Hi!</p>", SendOptions::default())
//!         .await?;
//!     println!("queued {}", result.message_id);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
mod transport;

pub use client::{KannonClient, KannonClientBuilder, KannonConfig, KannonError};
pub use domain::{
    Attachment, AuthToken, Content, Endpoint, Fields, NormalizedRecipient, Recipient,
    SendOptions, SendRequest, SendResult, Sender, ValidationError, normalize,
};
pub use transport::TransportError;
