use std::fmt::Write as _;

use http_structured_fields::{InnerList, Item, ListEntry, Parameters, SerializeValue as _};

use crate::error::{SignatureError, SignatureErrorKind};

/// Accumulates signature-base lines in insertion order and renders the
/// canonical base: one `"<identifier>": <value>` line per component and a
/// trailing `"@signature-params"` line, LF-separated, no trailing newline.
///
/// Signer and verifier both rebuild this structure independently; the bytes
/// must agree for the cryptographic check to pass.
#[derive(Debug, Default)]
pub(crate) struct SignatureBase {
    lines: Vec<(Item, String)>,
}

impl SignatureBase {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_line(&mut self, identifier: Item, value: String) {
        self.lines.push((identifier, value));
    }

    /// Renders the base and the `@signature-params` value (the inner list
    /// of identifiers carrying `params`).
    pub(crate) fn render(
        &self,
        params: &Parameters,
    ) -> Result<(String, String), SignatureError> {
        let mut base = String::new();
        let mut identifiers = Vec::with_capacity(self.lines.len());
        for (identifier, value) in &self.lines {
            let serialized = identifier.serialize_value().map_err(|err| {
                SignatureError::with_source(
                    SignatureErrorKind::Generic,
                    "cannot serialize component identifier",
                    Box::new(err),
                )
            })?;
            let _ = writeln!(base, "{serialized}: {value}");
            identifiers.push(identifier.clone());
        }
        let params_value = ListEntry::InnerList(InnerList::with_params(
            identifiers,
            params.clone(),
        ))
        .serialize_value()
        .map_err(|err| {
            SignatureError::with_source(
                SignatureErrorKind::Generic,
                "cannot serialize signature parameters",
                Box::new(err),
            )
        })?;
        let _ = write!(base, "\"@signature-params\": {params_value}");
        Ok((base, params_value))
    }
}
