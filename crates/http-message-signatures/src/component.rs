use std::fmt;

use http_structured_fields::{BareItem, Item, Key, Parameters, SerializeValue as _};

use crate::error::{SignatureError, SignatureErrorKind};

/// Derived (`@`-prefixed) components computed from the message rather than
/// read from a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DerivedComponent {
    Method,
    TargetUri,
    Authority,
    Scheme,
    RequestTarget,
    Path,
    Query,
    QueryParam(String),
    Status,
}

impl DerivedComponent {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            DerivedComponent::Method => "@method",
            DerivedComponent::TargetUri => "@target-uri",
            DerivedComponent::Authority => "@authority",
            DerivedComponent::Scheme => "@scheme",
            DerivedComponent::RequestTarget => "@request-target",
            DerivedComponent::Path => "@path",
            DerivedComponent::Query => "@query",
            DerivedComponent::QueryParam(_) => "@query-param",
            DerivedComponent::Status => "@status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ComponentKind {
    Derived(DerivedComponent),
    Header {
        name: String,
        key: Option<Key>,
        structured: bool,
        binary: bool,
    },
}

/// One covered component of a signature: a derived component or an HTTP
/// field, optionally taken from the related request.
///
/// Header names are stored lowercase; identifier parameters serialize in
/// the canonical order `key`, `sf`, `bs`, `req` (`name` before `req` for
/// `@query-param`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureComponent {
    kind: ComponentKind,
    from_related_request: bool,
}

impl SignatureComponent {
    fn derived(derived: DerivedComponent) -> Self {
        SignatureComponent {
            kind: ComponentKind::Derived(derived),
            from_related_request: false,
        }
    }

    pub fn method() -> Self {
        Self::derived(DerivedComponent::Method)
    }

    pub fn target_uri() -> Self {
        Self::derived(DerivedComponent::TargetUri)
    }

    pub fn authority() -> Self {
        Self::derived(DerivedComponent::Authority)
    }

    pub fn scheme() -> Self {
        Self::derived(DerivedComponent::Scheme)
    }

    pub fn request_target() -> Self {
        Self::derived(DerivedComponent::RequestTarget)
    }

    pub fn path() -> Self {
        Self::derived(DerivedComponent::Path)
    }

    pub fn query() -> Self {
        Self::derived(DerivedComponent::Query)
    }

    pub fn query_param(name: impl Into<String>) -> Self {
        Self::derived(DerivedComponent::QueryParam(name.into()))
    }

    pub fn status() -> Self {
        Self::derived(DerivedComponent::Status)
    }

    /// An HTTP field, covered by its sanitized joined value.
    pub fn header(name: impl AsRef<str>) -> Self {
        SignatureComponent {
            kind: ComponentKind::Header {
                name: name.as_ref().to_ascii_lowercase(),
                key: None,
                structured: false,
                binary: false,
            },
            from_related_request: false,
        }
    }

    /// An HTTP field re-serialized to its canonical structured form
    /// (the `sf` identifier flag).
    pub fn structured_header(name: impl AsRef<str>) -> Self {
        let mut component = Self::header(name);
        if let ComponentKind::Header { structured, .. } = &mut component.kind {
            *structured = true;
        }
        component
    }

    /// A single member of a dictionary-valued HTTP field (the `key`
    /// identifier parameter).
    pub fn dictionary_member(
        name: impl AsRef<str>,
        key: &str,
    ) -> Result<Self, http_structured_fields::Error> {
        let key = Key::new(key)?;
        let mut component = Self::header(name);
        if let ComponentKind::Header { key: slot, .. } = &mut component.kind {
            *slot = Some(key);
        }
        Ok(component)
    }

    /// An HTTP field covered as byte sequences of its raw values (the `bs`
    /// identifier flag).
    pub fn binary_header(name: impl AsRef<str>) -> Self {
        let mut component = Self::header(name);
        if let ComponentKind::Header { binary, .. } = &mut component.kind {
            *binary = true;
        }
        component
    }

    /// Marks the component as taken from the related request (the `req`
    /// identifier flag), for response signatures.
    pub fn from_related_request(mut self) -> Self {
        self.from_related_request = true;
        self
    }

    pub(crate) fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub(crate) fn is_from_related_request(&self) -> bool {
        self.from_related_request
    }

    pub(crate) fn query_param_name(&self) -> Option<&str> {
        match &self.kind {
            ComponentKind::Derived(DerivedComponent::QueryParam(name)) => Some(name),
            _ => None,
        }
    }

    /// The component identifier as a structured item: a string with the
    /// identifier parameters.
    pub(crate) fn identifier_item(&self) -> Item {
        let mut params = Parameters::new();
        let name = match &self.kind {
            ComponentKind::Derived(derived) => {
                if let DerivedComponent::QueryParam(param) = derived {
                    params.insert(Key::constant("name"), BareItem::String(param.clone()));
                }
                derived.name().to_owned()
            }
            ComponentKind::Header {
                name,
                key,
                structured,
                binary,
            } => {
                if let Some(key) = key {
                    params.insert(
                        Key::constant("key"),
                        BareItem::String(key.as_str().to_owned()),
                    );
                }
                if *structured {
                    params.insert(Key::constant("sf"), BareItem::Boolean(true));
                }
                if *binary {
                    params.insert(Key::constant("bs"), BareItem::Boolean(true));
                }
                name.clone()
            }
        };
        if self.from_related_request {
            params.insert(Key::constant("req"), BareItem::Boolean(true));
        }
        Item::with_params(BareItem::String(name), params)
    }

    /// The serialized identifier, e.g. `"content-type";key="a";req`.
    pub fn identifier(&self) -> Result<String, SignatureError> {
        self.identifier_item().serialize_value().map_err(|err| {
            SignatureError::with_source(
                SignatureErrorKind::Generic,
                "cannot serialize component identifier",
                Box::new(err),
            )
        })
    }

    /// Rebuilds a component from a parsed identifier item out of a
    /// `Signature-Input` inner list.
    pub(crate) fn from_identifier(item: &Item) -> Result<Self, SignatureError> {
        let name = item.bare_item.as_string().map_err(|err| {
            SignatureError::invalid_structured("component identifier must be a string", err)
        })?;
        let mut key = None;
        let mut structured = false;
        let mut binary = false;
        let mut req = false;
        let mut param_name = None;
        for (param_key, value) in &item.params {
            match param_key.as_str() {
                "key" => {
                    let value = value.as_string().map_err(|err| {
                        SignatureError::invalid_structured("`key` must be a string", err)
                    })?;
                    key = Some(Key::new(value).map_err(|err| {
                        SignatureError::invalid_structured("invalid `key` parameter", err)
                    })?);
                }
                "sf" => structured = flag_value(value, "sf")?,
                "bs" => binary = flag_value(value, "bs")?,
                "req" => req = flag_value(value, "req")?,
                "name" => {
                    param_name = Some(
                        value
                            .as_string()
                            .map_err(|err| {
                                SignatureError::invalid_structured("`name` must be a string", err)
                            })?
                            .to_owned(),
                    );
                }
                other => {
                    return Err(SignatureError::new(
                        SignatureErrorKind::InvalidStructuredHeader,
                        format!("unknown component parameter `{other}`"),
                    ))
                }
            }
        }

        let kind = if let Some(stripped) = name.strip_prefix('@') {
            if key.is_some() || structured || binary {
                return Err(SignatureError::new(
                    SignatureErrorKind::InvalidStructuredHeader,
                    format!("derived component `{name}` cannot carry field parameters"),
                ));
            }
            let derived = match stripped {
                "method" => DerivedComponent::Method,
                "target-uri" => DerivedComponent::TargetUri,
                "authority" => DerivedComponent::Authority,
                "scheme" => DerivedComponent::Scheme,
                "request-target" => DerivedComponent::RequestTarget,
                "path" => DerivedComponent::Path,
                "query" => DerivedComponent::Query,
                "query-param" => DerivedComponent::QueryParam(param_name.take().ok_or_else(
                    || {
                        SignatureError::new(
                            SignatureErrorKind::InvalidStructuredHeader,
                            "`@query-param` requires a `name` parameter",
                        )
                    },
                )?),
                "status" => DerivedComponent::Status,
                _ => {
                    return Err(SignatureError::new(
                        SignatureErrorKind::InvalidStructuredHeader,
                        format!("unknown derived component `{name}`"),
                    ))
                }
            };
            if param_name.is_some() {
                return Err(SignatureError::new(
                    SignatureErrorKind::InvalidStructuredHeader,
                    format!("`{name}` cannot carry a `name` parameter"),
                ));
            }
            ComponentKind::Derived(derived)
        } else {
            if param_name.is_some() {
                return Err(SignatureError::new(
                    SignatureErrorKind::InvalidStructuredHeader,
                    "only `@query-param` carries a `name` parameter",
                ));
            }
            if name.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(SignatureError::new(
                    SignatureErrorKind::InvalidStructuredHeader,
                    format!("field name `{name}` must be lowercase"),
                ));
            }
            if (key.is_some() as u8) + (structured as u8) + (binary as u8) > 1 {
                return Err(SignatureError::new(
                    SignatureErrorKind::InvalidStructuredHeader,
                    format!("conflicting parameters on component `{name}`"),
                ));
            }
            ComponentKind::Header {
                name: name.to_owned(),
                key,
                structured,
                binary,
            }
        };

        Ok(SignatureComponent {
            kind,
            from_related_request: req,
        })
    }
}

fn flag_value(value: &BareItem, name: &str) -> Result<bool, SignatureError> {
    match value.as_boolean() {
        Ok(true) => Ok(true),
        _ => Err(SignatureError::new(
            SignatureErrorKind::InvalidStructuredHeader,
            format!("component parameter `{name}` must be boolean true"),
        )),
    }
}

impl fmt::Display for SignatureComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identifier() {
            Ok(identifier) => f.write_str(&identifier),
            Err(_) => match &self.kind {
                ComponentKind::Derived(derived) => f.write_str(derived.name()),
                ComponentKind::Header { name, .. } => f.write_str(name),
            },
        }
    }
}
