use http_structured_fields::{
    BareItem, Item, List, ListEntry, Parser, SerializeValue as _,
};
use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::component::{ComponentKind, DerivedComponent, SignatureComponent};
use crate::error::{SignatureError, SignatureErrorKind};

// strict re-encoding set: everything except unreserved characters
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// An immutable bundle of the message facts the signature components are
/// resolved against: method, target URI, status, headers and, for response
/// signatures, the request that elicited the response.
#[derive(Debug, Clone)]
pub struct MessageContext {
    method: Option<String>,
    target: Option<Target>,
    status: Option<u16>,
    headers: IndexMap<String, Vec<String>>,
    related_request: Option<Box<MessageContext>>,
}

#[derive(Debug, Clone)]
struct Target {
    raw: String,
    url: Url,
}

impl MessageContext {
    /// A request context. The method is stored uppercase and the target URI
    /// must be absolute.
    pub fn request(method: &str, target_uri: &str) -> Result<Self, SignatureError> {
        let url = Url::parse(target_uri).map_err(|err| {
            SignatureError::with_source(
                SignatureErrorKind::Generic,
                format!("invalid target URI `{target_uri}`"),
                Box::new(err),
            )
        })?;
        Ok(MessageContext {
            method: Some(method.to_ascii_uppercase()),
            target: Some(Target {
                raw: target_uri.to_owned(),
                url,
            }),
            status: None,
            headers: IndexMap::new(),
            related_request: None,
        })
    }

    /// A response context.
    pub fn response(status: u16) -> Self {
        MessageContext {
            method: None,
            target: None,
            status: Some(status),
            headers: IndexMap::new(),
            related_request: None,
        }
    }

    /// Appends one field line. Names are lowercased; values are stripped of
    /// surrounding whitespace and line folds are collapsed to single spaces.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(sanitize_value(value));
        self
    }

    /// Attaches the request this response answers, for `req` components.
    pub fn with_related_request(mut self, request: MessageContext) -> Self {
        self.related_request = Some(Box::new(request));
        self
    }

    /// The combined value of a field: all lines joined with `", "`.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(|values| values.join(", "))
    }

    /// Resolves a component to its signature-base lines. All components
    /// yield exactly one line except `@query-param`, which yields one line
    /// per occurrence of the named parameter.
    pub fn resolve(
        &self,
        component: &SignatureComponent,
    ) -> Result<Vec<String>, SignatureError> {
        let context = if component.is_from_related_request() {
            self.related_request.as_deref().ok_or_else(|| {
                SignatureError::new(
                    SignatureErrorKind::MissingComponent,
                    format!("{component} requires a related request"),
                )
            })?
        } else {
            self
        };
        match component.kind() {
            ComponentKind::Derived(derived) => context.derived_values(derived),
            ComponentKind::Header {
                name,
                key,
                structured,
                binary,
            } => context
                .header_component_value(name, key.as_ref().map(|k| k.as_str()), *structured, *binary)
                .map(|value| vec![value]),
        }
    }

    fn derived_values(&self, derived: &DerivedComponent) -> Result<Vec<String>, SignatureError> {
        let value = match derived {
            DerivedComponent::Method => self.method.clone().ok_or_else(|| missing(derived))?,
            DerivedComponent::TargetUri => {
                self.target.as_ref().ok_or_else(|| missing(derived))?.raw.clone()
            }
            DerivedComponent::Authority => {
                let url = self.url(derived)?;
                let host = url.host_str().ok_or_else(|| missing(derived))?;
                match url.port() {
                    Some(port) => format!("{}:{port}", host.to_ascii_lowercase()),
                    None => host.to_ascii_lowercase(),
                }
            }
            DerivedComponent::Scheme => self.url(derived)?.scheme().to_ascii_lowercase(),
            DerivedComponent::RequestTarget => {
                let url = self.url(derived)?;
                match url.query() {
                    Some(query) => format!("{}?{query}", url.path()),
                    None => url.path().to_owned(),
                }
            }
            DerivedComponent::Path => {
                let path = self.url(derived)?.path();
                if path.is_empty() {
                    "/".to_owned()
                } else {
                    path.to_owned()
                }
            }
            DerivedComponent::Query => {
                format!("?{}", self.url(derived)?.query().unwrap_or(""))
            }
            DerivedComponent::QueryParam(name) => {
                return self.query_param_values(name);
            }
            DerivedComponent::Status => {
                self.status.ok_or_else(|| missing(derived))?.to_string()
            }
        };
        Ok(vec![value])
    }

    fn url(&self, derived: &DerivedComponent) -> Result<&Url, SignatureError> {
        self.target
            .as_ref()
            .map(|target| &target.url)
            .ok_or_else(|| missing(derived))
    }

    fn query_param_values(&self, name: &str) -> Result<Vec<String>, SignatureError> {
        let query = self
            .url(&DerivedComponent::QueryParam(name.to_owned()))?
            .query()
            .unwrap_or("");
        let mut values = Vec::new();
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            if percent_decode_str(raw_name).decode_utf8_lossy() != name {
                continue;
            }
            let decoded = percent_decode_str(raw_value).decode_utf8_lossy();
            values.push(utf8_percent_encode(&decoded, COMPONENT).to_string());
        }
        if values.is_empty() {
            Err(SignatureError::new(
                SignatureErrorKind::MissingComponent,
                format!("query parameter `{name}` is not present"),
            ))
        } else {
            Ok(values)
        }
    }

    fn header_component_value(
        &self,
        name: &str,
        key: Option<&str>,
        structured: bool,
        binary: bool,
    ) -> Result<String, SignatureError> {
        let values = self.headers.get(name).ok_or_else(|| {
            SignatureError::new(
                SignatureErrorKind::MissingHeader,
                format!("header `{name}` is not present"),
            )
        })?;
        if binary {
            // one byte sequence per original field line
            let list: List = values
                .iter()
                .map(|value| {
                    ListEntry::Item(Item::new(BareItem::ByteSequence(
                        value.as_bytes().to_vec(),
                    )))
                })
                .collect();
            return list.serialize_value().map_err(|err| {
                SignatureError::with_source(
                    SignatureErrorKind::Generic,
                    format!("cannot wrap header `{name}`"),
                    Box::new(err),
                )
            });
        }
        let joined = values.join(", ");
        if let Some(key) = key {
            let dictionary = Parser::new(&joined).parse_dictionary().map_err(|err| {
                SignatureError::invalid_structured(
                    &format!("header `{name}` is not a structured dictionary"),
                    err,
                )
            })?;
            let member = dictionary.get(key).ok_or_else(|| {
                SignatureError::new(
                    SignatureErrorKind::MissingDictionaryKey,
                    format!("header `{name}` has no member `{key}`"),
                )
            })?;
            member.serialize_value().map_err(|err| {
                SignatureError::with_source(
                    SignatureErrorKind::Generic,
                    format!("cannot serialize member `{key}` of header `{name}`"),
                    Box::new(err),
                )
            })
        } else if structured {
            let value = Parser::new(&joined).parse_any().map_err(|err| {
                SignatureError::invalid_structured(
                    &format!("header `{name}` is not a structured field"),
                    err,
                )
            })?;
            value.serialize_value().map_err(|err| {
                SignatureError::with_source(
                    SignatureErrorKind::Generic,
                    format!("cannot re-serialize header `{name}`"),
                    Box::new(err),
                )
            })
        } else {
            Ok(joined)
        }
    }
}

fn missing(derived: &DerivedComponent) -> SignatureError {
    SignatureError::new(
        SignatureErrorKind::MissingComponent,
        format!("`{}` cannot be resolved from this message", derived.name()),
    )
}

fn sanitize_value(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
