//! Envelope Codec & Validator
//!
//! Decodes the self-describing binary envelope carried by couriers and
//! checks its structural, temporal and identity validity. Payloads are
//! never decrypted or interpreted here.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{EnvelopeBuilder, Identity};
pub use error::{EnvelopeError, EnvelopeResult};
pub use types::{Envelope, MessageKind, Recipient, RecipientType};
