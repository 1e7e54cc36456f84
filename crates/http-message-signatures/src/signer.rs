use http_structured_fields::{
    BareItem, Dictionary, Item, Key, ListEntry, Parameters, SerializeValue as _,
};
use rand::RngCore as _;

use crate::base::SignatureBase;
use crate::component::SignatureComponent;
use crate::context::MessageContext;
use crate::error::{SignatureError, SignatureErrorKind};
use crate::key::SigningKey;
use crate::unix_now;

/// Everything needed to produce one signature: label, key, parameters and
/// the covered components. Built through [`SignatureSpec::builder`], which
/// validates the combination at `build()` time.
pub struct SignatureSpec {
    label: Key,
    key: SigningKey,
    visible_algorithm: bool,
    created: Created,
    expires: Expires,
    nonce: Nonce,
    keyid: Option<String>,
    tag: Option<String>,
    components: Vec<SignatureComponent>,
    optional_components: Vec<SignatureComponent>,
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl std::fmt::Debug for SignatureSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureSpec")
            .field("label", &self.label)
            .field("key", &self.key)
            .field("visible_algorithm", &self.visible_algorithm)
            .field("created", &self.created)
            .field("expires", &self.expires)
            .field("nonce", &self.nonce)
            .field("keyid", &self.keyid)
            .field("tag", &self.tag)
            .field("components", &self.components)
            .field("optional_components", &self.optional_components)
            .finish()
    }
}

#[derive(Debug)]
enum Created {
    Unset,
    At(i64),
    Now,
}

#[derive(Debug)]
enum Expires {
    Unset,
    At(i64),
    After(i64),
}

#[derive(Debug)]
enum Nonce {
    Unset,
    Fixed(String),
    Random,
}

/// The output of a signing operation: ready-to-send `Signature-Input` and
/// `Signature` field values, plus the signature base for debugging.
#[derive(Debug, Clone)]
pub struct SignatureResult {
    pub signature_input: String,
    pub signature: String,
    pub signature_base: String,
}

impl SignatureSpec {
    pub fn builder() -> SignatureSpecBuilder {
        SignatureSpecBuilder::default()
    }

    /// Signs `context`, resolving required components strictly and
    /// used-if-present components leniently.
    pub fn sign(&self, context: &MessageContext) -> Result<SignatureResult, SignatureError> {
        let mut covered: Vec<String> = Vec::new();
        let mut base = SignatureBase::new();

        for component in &self.components {
            self.cover(context, component, &mut covered, &mut base, true)?;
        }
        for component in &self.optional_components {
            self.cover(context, component, &mut covered, &mut base, false)?;
        }

        let params = self.parameters()?;
        let (signature_base, params_value) = base.render(&params)?;
        let signature = self.key.sign(signature_base.as_bytes())?;

        let signature_input = format!("{}={params_value}", self.label);
        let mut signature_dict = Dictionary::default();
        signature_dict.insert(
            self.label.clone(),
            ListEntry::Item(Item::new(BareItem::ByteSequence(signature))),
        );
        let signature = signature_dict.serialize_value().map_err(|err| {
            SignatureError::with_source(
                SignatureErrorKind::Generic,
                "cannot serialize the signature dictionary",
                Box::new(err),
            )
        })?;

        Ok(SignatureResult {
            signature_input,
            signature,
            signature_base,
        })
    }

    fn cover(
        &self,
        context: &MessageContext,
        component: &SignatureComponent,
        covered: &mut Vec<String>,
        base: &mut SignatureBase,
        required: bool,
    ) -> Result<(), SignatureError> {
        let identifier = component.identifier()?;
        if covered.contains(&identifier) {
            return Err(SignatureError::new(
                SignatureErrorKind::Generic,
                format!("component {identifier} is listed twice"),
            ));
        }
        match context.resolve(component) {
            Ok(values) => {
                covered.push(identifier);
                let item = component.identifier_item();
                for value in values {
                    base.push_line(item.clone(), value);
                }
                Ok(())
            }
            Err(err)
                if !required
                    && matches!(
                        err.kind(),
                        SignatureErrorKind::MissingHeader | SignatureErrorKind::MissingComponent
                    ) =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// The signature parameters in their serialization order: `created`,
    /// `expires`, `nonce`, `alg`, `keyid`, `tag`; unset ones are omitted.
    fn parameters(&self) -> Result<Parameters, SignatureError> {
        let mut params = Parameters::new();
        let created = match self.created {
            Created::Unset => None,
            Created::At(seconds) => Some(seconds),
            Created::Now => Some((self.clock)()),
        };
        if let Some(created) = created {
            params.insert(Key::constant("created"), BareItem::Integer(created));
        }
        let expires = match self.expires {
            Expires::Unset => None,
            Expires::At(seconds) => Some(seconds),
            Expires::After(seconds) => {
                // build() guarantees created is set alongside expires_after
                let created = created.ok_or_else(|| {
                    SignatureError::new(
                        SignatureErrorKind::Generic,
                        "expires_after requires created",
                    )
                })?;
                Some(created + seconds)
            }
        };
        if let Some(expires) = expires {
            params.insert(Key::constant("expires"), BareItem::Integer(expires));
        }
        match &self.nonce {
            Nonce::Unset => {}
            Nonce::Fixed(nonce) => {
                params.insert(Key::constant("nonce"), BareItem::String(nonce.clone()));
            }
            Nonce::Random => {
                params.insert(
                    Key::constant("nonce"),
                    BareItem::String(random_nonce()),
                );
            }
        }
        if self.visible_algorithm {
            params.insert(
                Key::constant("alg"),
                BareItem::String(self.key.algorithm().tag().to_owned()),
            );
        }
        if let Some(keyid) = &self.keyid {
            params.insert(Key::constant("keyid"), BareItem::String(keyid.clone()));
        }
        if let Some(tag) = &self.tag {
            params.insert(Key::constant("tag"), BareItem::String(tag.clone()));
        }
        Ok(params)
    }
}

/// 128 bits from the thread RNG, hex encoded.
fn random_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Default)]
pub struct SignatureSpecBuilder {
    label: Option<String>,
    key: Option<SigningKey>,
    visible_algorithm: bool,
    created: Option<i64>,
    created_now: bool,
    expires: Option<i64>,
    expires_after: Option<i64>,
    nonce: Option<String>,
    random_nonce: bool,
    keyid: Option<String>,
    tag: Option<String>,
    components: Vec<SignatureComponent>,
    optional_components: Vec<SignatureComponent>,
    clock: Option<Box<dyn Fn() -> i64 + Send + Sync>>,
}

impl SignatureSpecBuilder {
    /// The dictionary key this signature is filed under in both headers.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn key(mut self, key: SigningKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Emits the `alg` parameter; without this the algorithm stays implicit
    /// in the key.
    pub fn visible_algorithm(mut self) -> Self {
        self.visible_algorithm = true;
        self
    }

    pub fn created(mut self, unix_seconds: i64) -> Self {
        self.created = Some(unix_seconds);
        self
    }

    /// Stamps `created` with the clock reading at signing time.
    pub fn created_now(mut self) -> Self {
        self.created_now = true;
        self
    }

    pub fn expires(mut self, unix_seconds: i64) -> Self {
        self.expires = Some(unix_seconds);
        self
    }

    /// Sets `expires` relative to `created`; requires a created timestamp.
    pub fn expires_after(mut self, seconds: i64) -> Self {
        self.expires_after = Some(seconds);
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Generates a fresh 128-bit nonce at signing time.
    pub fn random_nonce(mut self) -> Self {
        self.random_nonce = true;
        self
    }

    pub fn keyid(mut self, keyid: impl Into<String>) -> Self {
        self.keyid = Some(keyid.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn component(mut self, component: SignatureComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn components(mut self, components: impl IntoIterator<Item = SignatureComponent>) -> Self {
        self.components.extend(components);
        self
    }

    /// A component that is covered only when it resolves; missing values
    /// are silently dropped at signing time.
    pub fn optional_component(mut self, component: SignatureComponent) -> Self {
        self.optional_components.push(component);
        self
    }

    pub fn clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> Result<SignatureSpec, SignatureError> {
        let label = self.label.ok_or_else(|| {
            SignatureError::new(SignatureErrorKind::Generic, "a signature label is required")
        })?;
        let label = Key::new(label).map_err(|err| {
            SignatureError::with_source(
                SignatureErrorKind::Generic,
                "the label must be a valid dictionary key",
                Box::new(err),
            )
        })?;
        let key = self.key.ok_or_else(|| {
            SignatureError::new(SignatureErrorKind::Generic, "a signing key is required")
        })?;
        if self.created.is_some() && self.created_now {
            return Err(SignatureError::new(
                SignatureErrorKind::Generic,
                "created and created_now are mutually exclusive",
            ));
        }
        if self.expires.is_some() && self.expires_after.is_some() {
            return Err(SignatureError::new(
                SignatureErrorKind::Generic,
                "expires and expires_after are mutually exclusive",
            ));
        }
        if self.expires_after.is_some() && self.created.is_none() && !self.created_now {
            return Err(SignatureError::new(
                SignatureErrorKind::Generic,
                "expires_after requires a created timestamp",
            ));
        }
        if self.nonce.is_some() && self.random_nonce {
            return Err(SignatureError::new(
                SignatureErrorKind::Generic,
                "nonce and random_nonce are mutually exclusive",
            ));
        }
        let created = match (self.created, self.created_now) {
            (Some(seconds), _) => Created::At(seconds),
            (None, true) => Created::Now,
            (None, false) => Created::Unset,
        };
        let expires = match (self.expires, self.expires_after) {
            (Some(seconds), _) => Expires::At(seconds),
            (None, Some(seconds)) => Expires::After(seconds),
            (None, None) => Expires::Unset,
        };
        let nonce = match (self.nonce, self.random_nonce) {
            (Some(nonce), _) => Nonce::Fixed(nonce),
            (None, true) => Nonce::Random,
            (None, false) => Nonce::Unset,
        };
        Ok(SignatureSpec {
            label,
            key,
            visible_algorithm: self.visible_algorithm,
            created,
            expires,
            nonce,
            keyid: self.keyid,
            tag: self.tag,
            components: self.components,
            optional_components: self.optional_components,
            clock: self.clock.unwrap_or_else(|| Box::new(unix_now)),
        })
    }
}
