use std::collections::HashMap;

use http_structured_fields::{Dictionary, InnerList, Key, Parser};

use crate::base::SignatureBase;
use crate::component::SignatureComponent;
use crate::context::MessageContext;
use crate::error::{SignatureError, SignatureErrorKind};
use crate::key::{Algorithm, PublicKeyInfo};
use crate::params::SignatureParameters;
use crate::unix_now;

/// The caller-supplied resolver from a `keyid` to key material. Its error
/// is preserved as the source of a
/// [`SignatureErrorKind::KeyGetterError`].
pub type PublicKeyGetter = Box<dyn Fn(&str) -> anyhow::Result<PublicKeyInfo> + Send + Sync>;

/// The policy and key source for verifying one signature. Built through
/// [`VerificationSpec::builder`]; verification itself is stateless and the
/// clock is read once per call.
pub struct VerificationSpec {
    label: Option<String>,
    application_tag: Option<String>,
    required_parameters: Vec<String>,
    forbidden_parameters: Vec<String>,
    required_components: Vec<SignatureComponent>,
    required_if_present: Vec<SignatureComponent>,
    max_age: Option<i64>,
    max_skew: Option<i64>,
    key_getter: PublicKeyGetter,
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl VerificationSpec {
    pub fn builder() -> VerificationSpecBuilder {
        VerificationSpecBuilder::default()
    }

    /// Verifies the selected signature of `context` against the policy and
    /// the key returned by the getter, handing back the accepted
    /// signature's parameters.
    pub fn verify(
        &self,
        context: &MessageContext,
    ) -> Result<SignatureParameters, SignatureError> {
        let signature_input = context.header("signature-input").ok_or_else(|| {
            SignatureError::new(
                SignatureErrorKind::MissingSignature,
                "the message carries no Signature-Input header",
            )
        })?;
        let input_dict = Parser::new(&signature_input)
            .parse_dictionary()
            .map_err(|err| {
                SignatureError::invalid_structured("cannot parse Signature-Input", err)
            })?;
        let (label, inner) = self.select_candidate(&input_dict)?;

        let signature_header = context.header("signature").ok_or_else(|| {
            SignatureError::new(
                SignatureErrorKind::MissingSignature,
                "the message carries no Signature header",
            )
        })?;
        let signature_dict = Parser::new(&signature_header)
            .parse_dictionary()
            .map_err(|err| SignatureError::invalid_structured("cannot parse Signature", err))?;
        let signature = signature_dict
            .get(label.as_str())
            .ok_or_else(|| {
                SignatureError::new(
                    SignatureErrorKind::MissingSignature,
                    format!("no signature under label `{label}`"),
                )
            })?
            .as_item()
            .and_then(|item| item.bare_item.as_byte_sequence())
            .map_err(|err| {
                SignatureError::invalid_structured("a signature must be a byte sequence", err)
            })?
            .to_vec();

        let params = SignatureParameters::from_raw(inner.params.clone());
        for name in &self.required_parameters {
            if !params.contains(name) {
                return Err(SignatureError::new(
                    SignatureErrorKind::MissingParameter,
                    format!("required parameter `{name}` is absent"),
                ));
            }
        }
        for name in &self.forbidden_parameters {
            if params.contains(name) {
                return Err(SignatureError::new(
                    SignatureErrorKind::UnauthorizedParameter,
                    format!("forbidden parameter `{name}` is present"),
                ));
            }
        }

        let covered = inner
            .items
            .iter()
            .map(SignatureComponent::from_identifier)
            .collect::<Result<Vec<_>, _>>()?;
        for required in &self.required_components {
            if !covered.contains(required) {
                return Err(SignatureError::new(
                    SignatureErrorKind::MissingComponent,
                    format!("signature does not cover {required}"),
                ));
            }
        }
        for required in &self.required_if_present {
            if context.resolve(required).is_ok() && !covered.contains(required) {
                return Err(SignatureError::new(
                    SignatureErrorKind::MissingComponent,
                    format!("signature does not cover the present {required}"),
                ));
            }
        }

        let now = (self.clock)();
        if let (Some(max_age), Some(created)) = (self.max_age, params.created()) {
            if now - created > max_age {
                return Err(SignatureError::new(
                    SignatureErrorKind::Expired,
                    format!("signature created {}s ago exceeds max age", now - created),
                ));
            }
        }
        if let (Some(max_skew), Some(created)) = (self.max_skew, params.created()) {
            if created - now > max_skew {
                return Err(SignatureError::new(
                    SignatureErrorKind::Future,
                    format!("signature created {}s in the future", created - now),
                ));
            }
        }
        if let Some(expires) = params.expires() {
            if now > expires {
                return Err(SignatureError::new(
                    SignatureErrorKind::Expired,
                    "signature is past its expiry",
                ));
            }
        }

        let keyid = params.keyid().unwrap_or("");
        let info = (self.key_getter)(keyid).map_err(|err| {
            SignatureError::with_source(
                SignatureErrorKind::KeyGetterError,
                format!("public key lookup failed for keyid `{keyid}`"),
                err.into(),
            )
        })?;
        let algorithm = match info.algorithm {
            Some(algorithm) => algorithm,
            None => match params.algorithm() {
                Some(tag) => Algorithm::from_tag(tag).ok_or_else(|| {
                    SignatureError::new(
                        SignatureErrorKind::UnknownAlgorithm,
                        format!("unsupported algorithm `{tag}`"),
                    )
                })?,
                None => {
                    return Err(SignatureError::new(
                        SignatureErrorKind::IncorrectAlgorithm,
                        "neither the key nor the signature names an algorithm",
                    ))
                }
            },
        };
        let verifying_key = info.into_verifying_key(algorithm)?;

        // rebuild the base in the covered order, binding repeated
        // @query-param identifiers to successive occurrences
        let mut base = SignatureBase::new();
        let mut query_occurrences: HashMap<String, usize> = HashMap::new();
        for (item, component) in inner.items.iter().zip(&covered) {
            let values = context.resolve(component)?;
            let value = if let Some(name) = component.query_param_name() {
                let index = query_occurrences.entry(name.to_owned()).or_insert(0);
                let value = values.get(*index).cloned().ok_or_else(|| {
                    SignatureError::new(
                        SignatureErrorKind::MissingComponent,
                        format!("query parameter `{name}` has fewer values than covered"),
                    )
                })?;
                *index += 1;
                value
            } else {
                values.into_iter().next().ok_or_else(|| {
                    SignatureError::new(
                        SignatureErrorKind::MissingComponent,
                        format!("{component} resolved to no value"),
                    )
                })?
            };
            base.push_line(item.clone(), value);
        }
        let (signature_base, _) = base.render(params.raw())?;
        verifying_key.verify(signature_base.as_bytes(), &signature)?;
        Ok(params)
    }

    /// Picks the signature entry: by label, by application tag, or the sole
    /// entry when neither is configured. With both set, both must match.
    fn select_candidate<'a>(
        &self,
        input: &'a Dictionary,
    ) -> Result<(&'a Key, &'a InnerList), SignatureError> {
        let as_inner = |(key, entry): (&'a Key, &'a http_structured_fields::ListEntry)| {
            entry
                .as_inner_list()
                .map(|inner| (key, inner))
                .map_err(|err| {
                    SignatureError::invalid_structured(
                        "a Signature-Input entry must be an inner list",
                        err,
                    )
                })
        };
        let tag_matches = |inner: &InnerList, wanted: &str| {
            inner
                .params
                .get("tag")
                .and_then(|value| value.as_string().ok())
                == Some(wanted)
        };
        match (&self.label, &self.application_tag) {
            (Some(label), tag) => {
                let (key, entry) = input.get_key_value(label.as_str()).ok_or_else(|| {
                    SignatureError::new(
                        SignatureErrorKind::MissingSignature,
                        format!("no signature labelled `{label}`"),
                    )
                })?;
                let (key, inner) = as_inner((key, entry))?;
                if let Some(tag) = tag {
                    if !tag_matches(inner, tag) {
                        return Err(SignatureError::new(
                            SignatureErrorKind::MissingSignature,
                            format!("signature `{label}` does not carry tag `{tag}`"),
                        ));
                    }
                }
                Ok((key, inner))
            }
            (None, Some(tag)) => {
                for (key, entry) in input {
                    let (key, inner) = as_inner((key, entry))?;
                    if tag_matches(inner, tag) {
                        return Ok((key, inner));
                    }
                }
                Err(SignatureError::new(
                    SignatureErrorKind::MissingSignature,
                    format!("no signature carries tag `{tag}`"),
                ))
            }
            (None, None) => {
                if input.len() == 1 {
                    if let Some(entry) = input.iter().next() {
                        return as_inner(entry);
                    }
                }
                Err(SignatureError::new(
                    SignatureErrorKind::MissingSignature,
                    "specify a label or tag to select among the signatures",
                ))
            }
        }
    }
}

#[derive(Default)]
pub struct VerificationSpecBuilder {
    label: Option<String>,
    application_tag: Option<String>,
    required_parameters: Vec<String>,
    forbidden_parameters: Vec<String>,
    required_components: Vec<SignatureComponent>,
    required_if_present: Vec<SignatureComponent>,
    max_age: Option<i64>,
    max_skew: Option<i64>,
    key_getter: Option<PublicKeyGetter>,
    clock: Option<Box<dyn Fn() -> i64 + Send + Sync>>,
}

impl VerificationSpecBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Selects by the `tag` parameter; the first matching entry in
    /// dictionary order wins when no label is given.
    pub fn application_tag(mut self, tag: impl Into<String>) -> Self {
        self.application_tag = Some(tag.into());
        self
    }

    pub fn required_parameter(mut self, name: impl Into<String>) -> Self {
        self.required_parameters.push(name.into());
        self
    }

    pub fn forbidden_parameter(mut self, name: impl Into<String>) -> Self {
        self.forbidden_parameters.push(name.into());
        self
    }

    /// A component the signature must cover.
    pub fn required_component(mut self, component: SignatureComponent) -> Self {
        self.required_components.push(component);
        self
    }

    /// A component the signature must cover whenever the message can
    /// resolve it.
    pub fn required_if_present_component(mut self, component: SignatureComponent) -> Self {
        self.required_if_present.push(component);
        self
    }

    /// Rejects signatures whose `created` lies more than `seconds` in the
    /// past.
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Rejects signatures whose `created` lies more than `seconds` in the
    /// future.
    pub fn max_skew(mut self, seconds: i64) -> Self {
        self.max_skew = Some(seconds);
        self
    }

    pub fn key_getter(
        mut self,
        getter: impl Fn(&str) -> anyhow::Result<PublicKeyInfo> + Send + Sync + 'static,
    ) -> Self {
        self.key_getter = Some(Box::new(getter));
        self
    }

    pub fn clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> Result<VerificationSpec, SignatureError> {
        let key_getter = self.key_getter.ok_or_else(|| {
            SignatureError::new(
                SignatureErrorKind::Generic,
                "a public key getter is required",
            )
        })?;
        Ok(VerificationSpec {
            label: self.label,
            application_tag: self.application_tag,
            required_parameters: self.required_parameters,
            forbidden_parameters: self.forbidden_parameters,
            required_components: self.required_components,
            required_if_present: self.required_if_present,
            max_age: self.max_age,
            max_skew: self.max_skew,
            key_getter,
            clock: self.clock.unwrap_or_else(|| Box::new(unix_now)),
        })
    }
}
