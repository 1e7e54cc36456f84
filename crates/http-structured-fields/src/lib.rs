//! Strict codec for Structured Field Values for HTTP (RFC 8941).
//!
//! The parser is bit-exact with respect to the RFC 8941 grammar and the
//! serializer always produces the canonical form, so
//! `parse(serialize(v)) == v` for every legal value and
//! `serialize(parse(s))` is the canonical rendition of `s`.
//!
//! ```
//! use http_structured_fields::{Parser, SerializeValue};
//!
//! let dict = Parser::new("a=?0, b, c; foo=bar").parse_dictionary()?;
//! assert_eq!(dict.serialize_value()?, "a=?0, b, c;foo=bar");
//! ```

mod error;
mod parser;
mod serializer;

#[cfg(test)]
mod test_parser;
#[cfg(test)]
mod test_serializer;

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;

pub use rust_decimal::Decimal;

pub use error::{Error, ErrorKind};
pub use parser::Parser;
pub use serializer::SerializeValue;

/// `List` type structured field value.
// sf-list     = list-member *( OWS "," OWS list-member )
// list-member = sf-item / inner-list
pub type List = Vec<ListEntry>;

/// `Dictionary` type structured field value. Member order is preserved.
// sf-dictionary = dict-member *( OWS "," OWS dict-member )
// dict-member   = member-name [ "=" member-value ]
pub type Dictionary = IndexMap<Key, ListEntry>;

/// Parameters attached to an [`Item`] or [`InnerList`]. Key order is
/// preserved through parse/serialize round trips.
// parameters = *( ";" *SP parameter )
// parameter  = param-name [ "=" param-value ]
pub type Parameters = IndexMap<Key, BareItem>;

/// A dictionary, dictionary-member or parameter key, validated against the
/// RFC 8941 key grammar at construction.
// key = ( lcalpha / "*" ) *( lcalpha / DIGIT / "_" / "-" / "." / "*" )
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Validates and wraps a key, rejecting grammar violations with
    /// [`ErrorKind::InvalidKey`].
    pub fn new(key: impl Into<String>) -> Result<Self, Error> {
        let key = key.into();
        let mut bytes = key.bytes();
        let first_ok = matches!(bytes.next(), Some(c) if c.is_ascii_lowercase() || c == b'*');
        if first_ok && bytes.all(is_key_char) {
            Ok(Key(key))
        } else {
            Err(Error::new(
                ErrorKind::InvalidKey,
                format!("`{key}` is not a valid key"),
            ))
        }
    }

    /// Wraps a compile-time key constant.
    ///
    /// # Panics
    ///
    /// Panics when the constant violates the key grammar; only use this for
    /// literals that are known to be valid.
    pub fn constant(key: &'static str) -> Self {
        match Self::new(key) {
            Ok(key) => key,
            Err(err) => panic!("invalid constant key: {err}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_validated(key: String) -> Self {
        Key(key)
    }
}

fn is_key_char(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, b'_' | b'-' | b'.' | b'*')
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Key {
    type Error = Error;

    fn try_from(key: &str) -> Result<Self, Error> {
        Key::new(key)
    }
}

/// Bare value of an [`Item`] or of a parameter.
// bare-item = sf-integer / sf-decimal / sf-string / sf-token
//             / sf-binary / sf-boolean
#[derive(Debug, Clone, PartialEq)]
pub enum BareItem {
    // sf-integer = ["-"] 1*15DIGIT
    Integer(i64),
    // sf-decimal = ["-"] 1*12DIGIT "." 1*3DIGIT
    Decimal(Decimal),
    // sf-string = DQUOTE *chr DQUOTE
    String(String),
    // sf-token = ( ALPHA / "*" ) *( tchar / ":" / "/" )
    Token(String),
    // sf-binary = ":" *(base64) ":"
    ByteSequence(Vec<u8>),
    // sf-boolean = "?" boolean
    Boolean(bool),
}

impl BareItem {
    /// Builds a decimal bare item, rounding half-to-even at the third
    /// fractional digit and rejecting values with more than twelve integer
    /// digits.
    pub fn decimal(value: Decimal) -> Result<Self, Error> {
        let rounded = serializer::round_decimal(value)?;
        Ok(BareItem::Decimal(rounded))
    }

    pub fn as_integer(&self) -> Result<i64, Error> {
        match self {
            BareItem::Integer(value) => Ok(*value),
            other => Err(other.wrong_class("integer")),
        }
    }

    pub fn as_decimal(&self) -> Result<Decimal, Error> {
        match self {
            BareItem::Decimal(value) => Ok(*value),
            other => Err(other.wrong_class("decimal")),
        }
    }

    pub fn as_string(&self) -> Result<&str, Error> {
        match self {
            BareItem::String(value) => Ok(value),
            other => Err(other.wrong_class("string")),
        }
    }

    pub fn as_token(&self) -> Result<&str, Error> {
        match self {
            BareItem::Token(value) => Ok(value),
            other => Err(other.wrong_class("token")),
        }
    }

    pub fn as_byte_sequence(&self) -> Result<&[u8], Error> {
        match self {
            BareItem::ByteSequence(value) => Ok(value),
            other => Err(other.wrong_class("byte sequence")),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, Error> {
        match self {
            BareItem::Boolean(value) => Ok(*value),
            other => Err(other.wrong_class("boolean")),
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            BareItem::Integer(_) => "integer",
            BareItem::Decimal(_) => "decimal",
            BareItem::String(_) => "string",
            BareItem::Token(_) => "token",
            BareItem::ByteSequence(_) => "byte sequence",
            BareItem::Boolean(_) => "boolean",
        }
    }

    fn wrong_class(&self, wanted: &str) -> Error {
        Error::new(
            ErrorKind::WrongItemClass,
            format!("expected {wanted}, found {}", self.class_name()),
        )
    }
}

impl From<i64> for BareItem {
    fn from(value: i64) -> Self {
        BareItem::Integer(value)
    }
}

impl From<bool> for BareItem {
    fn from(value: bool) -> Self {
        BareItem::Boolean(value)
    }
}

impl From<Vec<u8>> for BareItem {
    fn from(value: Vec<u8>) -> Self {
        BareItem::ByteSequence(value)
    }
}

/// An item: a bare value plus its parameters.
// sf-item = bare-item parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub bare_item: BareItem,
    pub params: Parameters,
}

impl Item {
    pub fn new(bare_item: BareItem) -> Self {
        Item {
            bare_item,
            params: Parameters::new(),
        }
    }

    pub fn with_params(bare_item: BareItem, params: Parameters) -> Self {
        Item { bare_item, params }
    }
}

/// A parenthesised sequence of items with its own parameters.
// inner-list = "(" *SP [ sf-item *( 1*SP sf-item ) *SP ] ")" parameters
#[derive(Debug, Clone, PartialEq)]
pub struct InnerList {
    pub items: Vec<Item>,
    pub params: Parameters,
}

impl InnerList {
    pub fn new(items: Vec<Item>) -> Self {
        InnerList {
            items,
            params: Parameters::new(),
        }
    }

    pub fn with_params(items: Vec<Item>, params: Parameters) -> Self {
        InnerList { items, params }
    }
}

/// A member of a [`List`] or [`Dictionary`].
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Item(Item),
    InnerList(InnerList),
}

impl ListEntry {
    pub fn as_item(&self) -> Result<&Item, Error> {
        match self {
            ListEntry::Item(item) => Ok(item),
            ListEntry::InnerList(_) => Err(Error::new(
                ErrorKind::WrongItemClass,
                "expected item, found inner list",
            )),
        }
    }

    pub fn as_inner_list(&self) -> Result<&InnerList, Error> {
        match self {
            ListEntry::InnerList(inner) => Ok(inner),
            ListEntry::Item(_) => Err(Error::new(
                ErrorKind::WrongItemClass,
                "expected inner list, found item",
            )),
        }
    }
}

impl From<Item> for ListEntry {
    fn from(item: Item) -> Self {
        ListEntry::Item(item)
    }
}

impl From<InnerList> for ListEntry {
    fn from(inner: InnerList) -> Self {
        ListEntry::InnerList(inner)
    }
}

/// A whole field value of any of the three top-level types, as produced by
/// [`Parser::parse_any`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Item(Item),
    List(List),
    Dictionary(Dictionary),
}

/// Fail-fast accessors for dictionaries whose members are expected to be
/// homogeneous bare items.
pub trait DictionaryExt {
    /// Reads the dictionary as a map of integers.
    fn to_integer_map(&self) -> Result<IndexMap<Key, i64>, Error>;

    /// Reads the dictionary as a map of byte sequences.
    fn to_byte_sequence_map(&self) -> Result<IndexMap<Key, Vec<u8>>, Error>;
}

impl DictionaryExt for Dictionary {
    fn to_integer_map(&self) -> Result<IndexMap<Key, i64>, Error> {
        self.iter()
            .map(|(key, member)| Ok((key.clone(), member.as_item()?.bare_item.as_integer()?)))
            .collect()
    }

    fn to_byte_sequence_map(&self) -> Result<IndexMap<Key, Vec<u8>>, Error> {
        self.iter()
            .map(|(key, member)| {
                let bytes = member.as_item()?.bare_item.as_byte_sequence()?;
                Ok((key.clone(), bytes.to_vec()))
            })
            .collect()
    }
}

/// Fail-fast accessors for lists whose members are expected to be
/// homogeneous bare items.
pub trait ListExt {
    /// Reads the list as a vector of strings.
    fn to_string_list(&self) -> Result<Vec<String>, Error>;
}

impl ListExt for List {
    fn to_string_list(&self) -> Result<Vec<String>, Error> {
        self.iter()
            .map(|member| Ok(member.as_item()?.bare_item.as_string()?.to_owned()))
            .collect()
    }
}
