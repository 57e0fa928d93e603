use crate::envelope::codec::WIRE_VERSION;
use crate::envelope::error::{EnvelopeError, EnvelopeResult};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Kind of message carried by an envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageKind {
    /// Opaque signed bundle of messages carried between courier and relay
    Cargo,
    /// Signed grant authorizing a relay to release pending cargo to the bearer
    CollectionAuthorization,
}

impl MessageKind {
    pub(crate) fn to_wire(self) -> u8 {
        match self {
            MessageKind::Cargo => 0,
            MessageKind::CollectionAuthorization => 1,
        }
    }

    pub(crate) fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(MessageKind::Cargo),
            1 => Some(MessageKind::CollectionAuthorization),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Cargo => "cargo",
            MessageKind::CollectionAuthorization => "cca",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "cargo" => Some(MessageKind::Cargo),
            "cca" => Some(MessageKind::CollectionAuthorization),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a destination is reachable: local/offline addressing or an
/// internet-style address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecipientType {
    LocalNetwork,
    Internet,
}

impl RecipientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientType::LocalNetwork => "local",
            RecipientType::Internet => "internet",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "local" => Some(RecipientType::LocalNetwork),
            "internet" => Some(RecipientType::Internet),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecipientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of a message: always a local-network node id, optionally
/// also reachable through an internet-style address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub node_id: String,
    pub internet_address: Option<String>,
}

impl Recipient {
    pub fn local(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            internet_address: None,
        }
    }

    pub fn with_internet_address(mut self, address: impl Into<String>) -> Self {
        self.internet_address = Some(address.into());
        self
    }
}

/// Serialized form of the envelope body (the signed region of the frame)
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EnvelopeBody {
    pub id: String,
    pub sender_id: String,
    pub sender_public_key: [u8; 32],
    pub recipient: Recipient,
    pub created_at: i64,
    pub expires_at: i64,
    pub payload: Vec<u8>,
}

/// Immutable decoded message, validated only at the envelope level.
/// The payload stays opaque; this layer never interprets it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub kind: MessageKind,
    pub version: u8,
    pub id: String,
    pub sender_id: String,
    pub sender_public_key: [u8; 32],
    pub recipient: Recipient,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub payload: Bytes,
    /// Exact body bytes the signature covers
    pub(crate) signed: Bytes,
    pub(crate) signature: [u8; 64],
}

impl Envelope {
    /// Check semantic, temporal and identity validity.
    ///
    /// Pure and side-effect-free; callers decide what to log. Checks, in
    /// order: supported format version, expiry not before creation, not
    /// already expired, sender id matching the BLAKE3 digest of the sender
    /// public key, Ed25519 signature over the body, and (cargo only) that
    /// the recipient address form matches the requested recipient type.
    pub fn validate(&self, recipient_type: RecipientType) -> EnvelopeResult<()> {
        if self.version != WIRE_VERSION {
            return Err(EnvelopeError::Invalid(format!(
                "unsupported format version {}",
                self.version
            )));
        }

        if self.expires_at < self.created_at {
            return Err(EnvelopeError::Invalid(
                "expiry precedes creation time".into(),
            ));
        }

        if self.expires_at < Utc::now() {
            return Err(EnvelopeError::Invalid("already expired".into()));
        }

        let expected_id = sender_id_for(&self.sender_public_key);
        if self.sender_id != expected_id {
            return Err(EnvelopeError::Invalid(
                "sender id does not match public key".into(),
            ));
        }

        let key = VerifyingKey::from_bytes(&self.sender_public_key)
            .map_err(|_| EnvelopeError::Invalid("invalid sender public key".into()))?;
        let signature = Signature::from_bytes(&self.signature);
        key.verify(&self.signed, &signature)
            .map_err(|_| EnvelopeError::Invalid("signature verification failed".into()))?;

        if self.kind == MessageKind::Cargo
            && recipient_type == RecipientType::Internet
            && self.recipient.internet_address.is_none()
        {
            return Err(EnvelopeError::Invalid(
                "recipient has no internet-style address".into(),
            ));
        }

        Ok(())
    }
}

/// Derive a sender id from a public key (hex BLAKE3 digest).
pub fn sender_id_for(public_key: &[u8; 32]) -> String {
    blake3::hash(public_key).to_hex().to_string()
}
