//! HTTP message signatures (draft-ietf-httpbis-message-signatures) and
//! content digests (draft-ietf-httpbis-digest-headers) on top of the
//! RFC 8941 structured field codec.
//!
//! Signing takes a [`MessageContext`] describing the message, resolves the
//! covered components to their canonical values, assembles the signature
//! base and produces ready-to-send `Signature-Input` and `Signature` field
//! values:
//!
//! ```
//! use http_message_signatures::{
//!     Algorithm, MessageContext, SignatureComponent, SignatureSpec, SigningKey,
//! };
//!
//! let context = MessageContext::request("POST", "https://example.com/foo")?
//!     .with_header("Content-Type", "application/json");
//! let spec = SignatureSpec::builder()
//!     .label("sig1")
//!     .key(SigningKey::from_pem(Algorithm::Ed25519, private_key_pem)?)
//!     .created_now()
//!     .keyid("my-key")
//!     .components([
//!         SignatureComponent::method(),
//!         SignatureComponent::authority(),
//!         SignatureComponent::header("content-type"),
//!     ])
//!     .build()?;
//! let signed = spec.sign(&context)?;
//! ```
//!
//! Verification reverses the flow, rebuilding the base from the covered
//! component order on the wire and applying the configured policy
//! (required/forbidden parameters, required components, age and skew).

mod base;
mod component;
mod context;
pub mod digest;
mod error;
mod key;
mod params;
mod signer;
mod verifier;

pub use component::SignatureComponent;
pub use context::MessageContext;
pub use error::{DigestError, DigestErrorKind, SignatureError, SignatureErrorKind};
pub use key::{Algorithm, KeyData, PublicKeyInfo, SigningKey, VerifyingKey};
pub use params::SignatureParameters;
pub use signer::{SignatureResult, SignatureSpec, SignatureSpecBuilder};
pub use verifier::{PublicKeyGetter, VerificationSpec, VerificationSpecBuilder};

// re-export the codec the field values flow through
pub use http_structured_fields;

use std::time::{SystemTime, UNIX_EPOCH};

/// The default clock: wall-clock unix seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
