use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Closed set of failure categories for signing and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureErrorKind {
    /// A covered header is not present in the message.
    MissingHeader,
    /// A covered derived component cannot be resolved from the message.
    MissingComponent,
    /// A covered dictionary member is not present in the parsed header.
    MissingDictionaryKey,
    /// A header that must carry a structured value does not parse as one.
    InvalidStructuredHeader,
    /// No signature matches the requested label and/or tag.
    MissingSignature,
    /// A required signature parameter is absent.
    MissingParameter,
    /// A forbidden signature parameter is present.
    UnauthorizedParameter,
    /// The signature is older than allowed, or past its expiry.
    Expired,
    /// The signature creation time lies too far in the future.
    Future,
    /// No usable algorithm, or the key does not fit the chosen algorithm.
    IncorrectAlgorithm,
    /// The `alg` parameter names an algorithm outside the supported set.
    UnknownAlgorithm,
    /// Key material cannot be decoded.
    InvalidKey,
    /// The caller-supplied public key getter failed.
    KeyGetterError,
    /// The cryptographic check failed.
    IncorrectSignature,
    /// Anything else: invalid specs, serialization failures.
    Generic,
}

impl fmt::Display for SignatureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignatureErrorKind::MissingHeader => "missing header",
            SignatureErrorKind::MissingComponent => "missing component",
            SignatureErrorKind::MissingDictionaryKey => "missing dictionary key",
            SignatureErrorKind::InvalidStructuredHeader => "invalid structured header",
            SignatureErrorKind::MissingSignature => "missing signature",
            SignatureErrorKind::MissingParameter => "missing parameter",
            SignatureErrorKind::UnauthorizedParameter => "unauthorized parameter",
            SignatureErrorKind::Expired => "expired",
            SignatureErrorKind::Future => "future",
            SignatureErrorKind::IncorrectAlgorithm => "incorrect algorithm",
            SignatureErrorKind::UnknownAlgorithm => "unknown algorithm",
            SignatureErrorKind::InvalidKey => "invalid key",
            SignatureErrorKind::KeyGetterError => "key getter error",
            SignatureErrorKind::IncorrectSignature => "incorrect signature",
            SignatureErrorKind::Generic => "signature error",
        };
        f.write_str(name)
    }
}

/// Error raised while signing or verifying a message.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct SignatureError {
    kind: SignatureErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl SignatureError {
    pub fn new(kind: SignatureErrorKind, message: impl Into<String>) -> Self {
        SignatureError {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: SignatureErrorKind,
        message: impl Into<String>,
        source: Box<dyn StdError + Send + Sync>,
    ) -> Self {
        SignatureError {
            kind,
            message: message.into(),
            source: Some(source),
        }
    }

    pub(crate) fn invalid_structured(
        context: &str,
        err: http_structured_fields::Error,
    ) -> Self {
        Self::with_source(
            SignatureErrorKind::InvalidStructuredHeader,
            context.to_owned(),
            Box::new(err),
        )
    }

    pub fn kind(&self) -> SignatureErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Closed set of failure categories for content digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestErrorKind {
    /// No supported algorithm appears in the header.
    UnsupportedAlgorithm,
    /// A supported digest is present but does not match the content.
    IncorrectDigest,
    /// The digest header does not parse, or is empty.
    InvalidHeader,
}

impl fmt::Display for DigestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DigestErrorKind::UnsupportedAlgorithm => "unsupported algorithm",
            DigestErrorKind::IncorrectDigest => "incorrect digest",
            DigestErrorKind::InvalidHeader => "invalid header",
        };
        f.write_str(name)
    }
}

/// Error raised while computing or verifying content digests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DigestError {
    kind: DigestErrorKind,
    message: String,
}

impl DigestError {
    pub fn new(kind: DigestErrorKind, message: impl Into<String>) -> Self {
        DigestError {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DigestErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
