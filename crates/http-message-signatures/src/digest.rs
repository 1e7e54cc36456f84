//! `Content-Digest` / `Repr-Digest` calculation and verification, plus
//! `Want-*` negotiation.

use http_structured_fields::{
    BareItem, Dictionary, DictionaryExt as _, Item, Key, ListEntry, Parser, SerializeValue as _,
};
use sha2::{Digest as _, Sha256, Sha512};
use subtle::ConstantTimeEq as _;

use crate::error::{DigestError, DigestErrorKind};

/// Supported content digest algorithms, keyed by their HTTP names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// The dictionary key carried in digest headers.
    pub fn key(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha-256",
            DigestAlgorithm::Sha512 => "sha-512",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "sha-256" => Some(DigestAlgorithm::Sha256),
            "sha-512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    fn digest(&self, content: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => Sha256::digest(content).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(content).to_vec(),
        }
    }
}

/// Computes the digest field value for `content`, e.g.
/// `sha-256=:aGVsbG8=:`.
pub fn calculate(content: &[u8], algorithm: DigestAlgorithm) -> Result<String, DigestError> {
    let mut dict = Dictionary::default();
    dict.insert(
        Key::constant(algorithm.key()),
        ListEntry::Item(Item::new(BareItem::ByteSequence(algorithm.digest(content)))),
    );
    dict.serialize_value().map_err(|err| {
        DigestError::new(
            DigestErrorKind::InvalidHeader,
            format!("cannot serialize digest: {err}"),
        )
    })
}

/// Computes a digest using the best algorithm a `Want-Content-Digest` /
/// `Want-Repr-Digest` value asks for: zero weights are skipped, higher
/// weights win, ties keep the field order.
pub fn calculate_preferred(content: &[u8], want_header: &str) -> Result<String, DigestError> {
    let weights = Parser::new(want_header)
        .parse_dictionary()
        .and_then(|dict| dict.to_integer_map())
        .map_err(|err| {
            DigestError::new(
                DigestErrorKind::InvalidHeader,
                format!("cannot parse want header: {err}"),
            )
        })?;
    let mut preferences: Vec<(&Key, i64)> = weights
        .iter()
        .filter(|(_, weight)| **weight != 0)
        .map(|(key, weight)| (key, *weight))
        .collect();
    preferences.sort_by(|a, b| b.1.cmp(&a.1));
    for (key, _) in preferences {
        if let Some(algorithm) = DigestAlgorithm::from_key(key.as_str()) {
            return calculate(content, algorithm);
        }
    }
    Err(DigestError::new(
        DigestErrorKind::UnsupportedAlgorithm,
        "the want header names no supported algorithm",
    ))
}

/// Checks a digest field value against `content`. One matching entry with
/// a supported algorithm suffices; comparisons are constant time.
pub fn verify(header: &str, content: &[u8]) -> Result<(), DigestError> {
    let digests = Parser::new(header)
        .parse_dictionary()
        .and_then(|dict| dict.to_byte_sequence_map())
        .map_err(|err| {
            DigestError::new(
                DigestErrorKind::InvalidHeader,
                format!("cannot parse digest header: {err}"),
            )
        })?;
    if digests.is_empty() {
        return Err(DigestError::new(
            DigestErrorKind::InvalidHeader,
            "the digest header is empty",
        ));
    }
    let mut supported = false;
    for (key, expected) in &digests {
        if let Some(algorithm) = DigestAlgorithm::from_key(key.as_str()) {
            supported = true;
            let actual = algorithm.digest(content);
            if bool::from(actual.as_slice().ct_eq(expected.as_slice())) {
                return Ok(());
            }
        }
    }
    if supported {
        Err(DigestError::new(
            DigestErrorKind::IncorrectDigest,
            "no digest entry matches the content",
        ))
    } else {
        Err(DigestError::new(
            DigestErrorKind::UnsupportedAlgorithm,
            "the digest header names no supported algorithm",
        ))
    }
}
