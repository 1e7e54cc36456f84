use http_structured_fields::Parameters;

/// The ordered parameters of one signature, as carried on the
/// `@signature-params` inner list.
///
/// The raw parameter map keeps its wire order; the typed accessors read the
/// well-known parameters and ignore entries of an unexpected type.
#[derive(Debug, Clone)]
pub struct SignatureParameters {
    raw: Parameters,
}

impl SignatureParameters {
    pub(crate) fn from_raw(raw: Parameters) -> Self {
        SignatureParameters { raw }
    }

    pub fn created(&self) -> Option<i64> {
        self.raw.get("created").and_then(|v| v.as_integer().ok())
    }

    pub fn expires(&self) -> Option<i64> {
        self.raw.get("expires").and_then(|v| v.as_integer().ok())
    }

    pub fn nonce(&self) -> Option<&str> {
        self.raw.get("nonce").and_then(|v| v.as_string().ok())
    }

    /// The raw `alg` parameter, when the signer chose to make it visible.
    pub fn algorithm(&self) -> Option<&str> {
        self.raw.get("alg").and_then(|v| v.as_string().ok())
    }

    pub fn keyid(&self) -> Option<&str> {
        self.raw.get("keyid").and_then(|v| v.as_string().ok())
    }

    pub fn tag(&self) -> Option<&str> {
        self.raw.get("tag").and_then(|v| v.as_string().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw.contains_key(name)
    }

    pub(crate) fn raw(&self) -> &Parameters {
        &self.raw
    }
}
