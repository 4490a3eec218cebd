//! Domain layer: recipients, send requests and results, credentials (no I/O).

mod request;
mod response;
mod validation;
mod value;

pub(crate) use request::SendRequestParts;
pub use request::{
    Attachment, Content, Fields, NormalizedRecipient, Recipient, SendOptions, SendRequest,
    normalize,
};
pub use response::SendResult;
pub use validation::ValidationError;
pub use value::{AuthToken, Endpoint, Sender};
