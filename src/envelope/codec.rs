//! Wire format for courier messages
//!
//! Frame layout:
//!
//! ```text
//! [0..4)   magic  b"CRGO"
//! [4]      format version
//! [5]      message kind (0 = cargo, 1 = collection authorization)
//! [6..10)  body length, u32 little-endian
//! [10..)   bincode-encoded body, then a 64-byte Ed25519 signature
//! ```
//!
//! The signature covers exactly the body bytes. Decoding never verifies
//! it; that belongs to [`Envelope::validate`].

use crate::envelope::error::{EnvelopeError, EnvelopeResult};
use crate::envelope::types::{sender_id_for, Envelope, EnvelopeBody, MessageKind, Recipient};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use ed25519_dalek::{Signer, SigningKey};
use std::time::Duration;

pub(crate) const MAGIC: [u8; 4] = *b"CRGO";
pub(crate) const WIRE_VERSION: u8 = 1;
const HEADER_LEN: usize = 10;
const SIGNATURE_LEN: usize = 64;

/// Default message lifetime when the builder is given none
const DEFAULT_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

impl Envelope {
    /// Decode a binary frame, requiring it to carry `expected_kind`.
    ///
    /// Every input byte stream originates outside the trust boundary, so
    /// any structural defect fails with [`EnvelopeError::Malformed`].
    pub fn decode(bytes: &[u8], expected_kind: MessageKind) -> EnvelopeResult<Envelope> {
        if bytes.len() < HEADER_LEN + SIGNATURE_LEN {
            return Err(EnvelopeError::Malformed("frame shorter than header".into()));
        }
        if bytes[..4] != MAGIC {
            return Err(EnvelopeError::Malformed("bad magic".into()));
        }

        let version = bytes[4];
        let kind = MessageKind::from_wire(bytes[5])
            .ok_or_else(|| EnvelopeError::Malformed(format!("unknown kind byte {}", bytes[5])))?;
        if kind != expected_kind {
            return Err(EnvelopeError::Malformed(format!(
                "expected {expected_kind}, found {kind}"
            )));
        }

        let body_len =
            u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        if bytes.len() != HEADER_LEN + body_len + SIGNATURE_LEN {
            return Err(EnvelopeError::Malformed(
                "frame length does not match body length".into(),
            ));
        }

        let body = &bytes[HEADER_LEN..HEADER_LEN + body_len];
        let parsed: EnvelopeBody = bincode::deserialize(body)
            .map_err(|e| EnvelopeError::Malformed(format!("undecodable body: {e}")))?;

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&bytes[HEADER_LEN + body_len..]);

        Ok(Envelope {
            kind,
            version,
            id: parsed.id,
            sender_id: parsed.sender_id,
            sender_public_key: parsed.sender_public_key,
            recipient: parsed.recipient,
            created_at: decode_timestamp(parsed.created_at)?,
            expires_at: decode_timestamp(parsed.expires_at)?,
            payload: Bytes::from(parsed.payload),
            signed: Bytes::copy_from_slice(body),
            signature,
        })
    }
}

fn decode_timestamp(secs: i64) -> EnvelopeResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| EnvelopeError::Malformed(format!("timestamp {secs} out of range")))
}

/// A sender identity: an Ed25519 keypair whose id is the hex BLAKE3
/// digest of the public key.
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Deterministic identity from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn id(&self) -> String {
        sender_id_for(&self.public_key())
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Builder producing signed wire frames.
///
/// Peers use this to mint cargo and collection authorizations; the relay
/// core itself only decodes.
pub struct EnvelopeBuilder {
    kind: MessageKind,
    recipient: Recipient,
    payload: Vec<u8>,
    lifetime: Duration,
    created_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    id: Option<String>,
}

impl EnvelopeBuilder {
    pub fn cargo(recipient_node_id: impl Into<String>) -> Self {
        Self::new(MessageKind::Cargo, recipient_node_id)
    }

    pub fn collection_authorization(recipient_node_id: impl Into<String>) -> Self {
        Self::new(MessageKind::CollectionAuthorization, recipient_node_id)
    }

    fn new(kind: MessageKind, recipient_node_id: impl Into<String>) -> Self {
        Self {
            kind,
            recipient: Recipient::local(recipient_node_id),
            payload: Vec::new(),
            lifetime: DEFAULT_LIFETIME,
            created_at: None,
            expires_at: None,
            id: None,
        }
    }

    /// Also make the recipient reachable at an internet-style address.
    pub fn internet_address(mut self, address: impl Into<String>) -> Self {
        self.recipient.internet_address = Some(address.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Override both timestamps explicitly (creation defaults to now,
    /// expiry to creation plus the lifetime).
    pub fn timestamps(mut self, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self.expires_at = Some(expires_at);
        self
    }

    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Serialize the body, sign it with `identity` and assemble the frame.
    pub fn sign(self, identity: &Identity) -> EnvelopeResult<Vec<u8>> {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        let expires_at = self.expires_at.unwrap_or_else(|| {
            created_at + chrono::Duration::seconds(self.lifetime.as_secs() as i64)
        });

        let body = EnvelopeBody {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            sender_id: identity.id(),
            sender_public_key: identity.public_key(),
            recipient: self.recipient,
            created_at: created_at.timestamp(),
            expires_at: expires_at.timestamp(),
            payload: self.payload,
        };

        let body_bytes = bincode::serialize(&body)
            .map_err(|e| EnvelopeError::Malformed(format!("unencodable body: {e}")))?;
        let signature = identity.sign(&body_bytes);

        let mut frame = Vec::with_capacity(HEADER_LEN + body_bytes.len() + SIGNATURE_LEN);
        frame.extend_from_slice(&MAGIC);
        frame.push(WIRE_VERSION);
        frame.push(self.kind.to_wire());
        frame.extend_from_slice(&(body_bytes.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body_bytes);
        frame.extend_from_slice(&signature);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::types::RecipientType;

    fn sender() -> Identity {
        Identity::from_seed([7u8; 32])
    }

    #[test]
    fn test_round_trip() {
        let frame = EnvelopeBuilder::cargo("node-1")
            .internet_address("relay.example.com")
            .payload(b"opaque cargo".to_vec())
            .sign(&sender())
            .unwrap();

        let envelope = Envelope::decode(&frame, MessageKind::Cargo).unwrap();
        assert_eq!(envelope.kind, MessageKind::Cargo);
        assert_eq!(envelope.recipient.node_id, "node-1");
        assert_eq!(
            envelope.recipient.internet_address.as_deref(),
            Some("relay.example.com")
        );
        assert_eq!(&envelope.payload[..], b"opaque cargo");
        assert_eq!(envelope.sender_id, sender().id());

        envelope.validate(RecipientType::Internet).unwrap();
        envelope.validate(RecipientType::LocalNetwork).unwrap();
    }

    #[test]
    fn test_decode_rejects_garbage() {
        for bytes in [&b""[..], &b"CRGO"[..], &[0u8; 200][..]] {
            let err = Envelope::decode(bytes, MessageKind::Cargo).unwrap_err();
            assert!(err.is_malformed());
        }
    }

    #[test]
    fn test_decode_rejects_truncated_frame() {
        let mut frame = EnvelopeBuilder::cargo("node-1").sign(&sender()).unwrap();
        frame.truncate(frame.len() - 10);

        let err = Envelope::decode(&frame, MessageKind::Cargo).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_decode_rejects_wrong_kind() {
        let frame = EnvelopeBuilder::collection_authorization("node-1")
            .sign(&sender())
            .unwrap();

        let err = Envelope::decode(&frame, MessageKind::Cargo).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_tampered_body_fails_validation() {
        let mut frame = EnvelopeBuilder::cargo("node-1")
            .payload(vec![0u8; 32])
            .sign(&sender())
            .unwrap();
        // Flip a payload byte inside the signed region
        let idx = frame.len() - 70;
        frame[idx] ^= 0xff;

        let envelope = Envelope::decode(&frame, MessageKind::Cargo).unwrap();
        let err = envelope.validate(RecipientType::LocalNetwork).unwrap_err();
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_expiry_before_creation_is_invalid() {
        let now = Utc::now();
        let frame = EnvelopeBuilder::cargo("node-1")
            .timestamps(now, now - chrono::Duration::seconds(60))
            .sign(&sender())
            .unwrap();

        let envelope = Envelope::decode(&frame, MessageKind::Cargo).unwrap();
        let err = envelope.validate(RecipientType::LocalNetwork).unwrap_err();
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_expired_is_invalid() {
        let now = Utc::now();
        let frame = EnvelopeBuilder::cargo("node-1")
            .timestamps(
                now - chrono::Duration::hours(2),
                now - chrono::Duration::hours(1),
            )
            .sign(&sender())
            .unwrap();

        let envelope = Envelope::decode(&frame, MessageKind::Cargo).unwrap();
        assert!(envelope.validate(RecipientType::LocalNetwork).is_err());
    }

    #[test]
    fn test_internet_cargo_requires_internet_address() {
        let frame = EnvelopeBuilder::cargo("node-1").sign(&sender()).unwrap();
        let envelope = Envelope::decode(&frame, MessageKind::Cargo).unwrap();

        assert!(envelope.validate(RecipientType::LocalNetwork).is_ok());
        assert!(envelope.validate(RecipientType::Internet).is_err());
    }

    #[test]
    fn test_sender_id_must_match_key() {
        let frame = EnvelopeBuilder::cargo("node-1").sign(&sender()).unwrap();
        let mut envelope = Envelope::decode(&frame, MessageKind::Cargo).unwrap();
        envelope.sender_id = "someone-else".into();

        assert!(envelope.validate(RecipientType::LocalNetwork).is_err());
    }
}
