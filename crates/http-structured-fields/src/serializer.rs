use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Error, ErrorKind};
use crate::parser::is_tchar;
use crate::{BareItem, Dictionary, FieldValue, InnerList, Item, List, ListEntry, Parameters};

const INTEGER_LIMIT: i64 = 999_999_999_999_999;

/// Canonical RFC 8941 serialization.
///
/// Serialization is idempotent under `parse ∘ serialize` and always yields
/// the canonical form: single spaces after commas, no whitespace around `;`
/// or `=`, minimal decimals, `?0`/`?1` booleans.
pub trait SerializeValue {
    fn serialize_value(&self) -> Result<String, Error>;
}

impl SerializeValue for Item {
    fn serialize_value(&self) -> Result<String, Error> {
        let mut out = String::new();
        serialize_item(&mut out, self)?;
        Ok(out)
    }
}

impl SerializeValue for List {
    fn serialize_value(&self) -> Result<String, Error> {
        let mut out = String::new();
        for (index, member) in self.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            serialize_list_entry(&mut out, member)?;
        }
        Ok(out)
    }
}

impl SerializeValue for Dictionary {
    fn serialize_value(&self) -> Result<String, Error> {
        let mut out = String::new();
        for (index, (key, member)) in self.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            out.push_str(key.as_str());
            match member {
                // a boolean true member collapses to the bare key
                ListEntry::Item(item) if item.bare_item == BareItem::Boolean(true) => {
                    serialize_parameters(&mut out, &item.params)?;
                }
                _ => {
                    out.push('=');
                    serialize_list_entry(&mut out, member)?;
                }
            }
        }
        Ok(out)
    }
}

impl SerializeValue for ListEntry {
    fn serialize_value(&self) -> Result<String, Error> {
        let mut out = String::new();
        serialize_list_entry(&mut out, self)?;
        Ok(out)
    }
}

impl SerializeValue for FieldValue {
    fn serialize_value(&self) -> Result<String, Error> {
        match self {
            FieldValue::Item(item) => item.serialize_value(),
            FieldValue::List(list) => list.serialize_value(),
            FieldValue::Dictionary(dict) => dict.serialize_value(),
        }
    }
}

fn serialize_list_entry(out: &mut String, entry: &ListEntry) -> Result<(), Error> {
    match entry {
        ListEntry::Item(item) => serialize_item(out, item),
        ListEntry::InnerList(inner) => serialize_inner_list(out, inner),
    }
}

fn serialize_item(out: &mut String, item: &Item) -> Result<(), Error> {
    serialize_bare_item(out, &item.bare_item)?;
    serialize_parameters(out, &item.params)
}

fn serialize_inner_list(out: &mut String, inner: &InnerList) -> Result<(), Error> {
    out.push('(');
    for (index, item) in inner.items.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        serialize_item(out, item)?;
    }
    out.push(')');
    serialize_parameters(out, &inner.params)
}

fn serialize_parameters(out: &mut String, params: &Parameters) -> Result<(), Error> {
    for (key, value) in params {
        out.push(';');
        out.push_str(key.as_str());
        if *value != BareItem::Boolean(true) {
            out.push('=');
            serialize_bare_item(out, value)?;
        }
    }
    Ok(())
}

fn serialize_bare_item(out: &mut String, bare_item: &BareItem) -> Result<(), Error> {
    match bare_item {
        BareItem::Integer(value) => serialize_integer(out, *value),
        BareItem::Decimal(value) => serialize_decimal(out, *value),
        BareItem::String(value) => serialize_string(out, value),
        BareItem::Token(value) => serialize_token(out, value),
        BareItem::ByteSequence(value) => {
            let _ = write!(out, ":{}:", BASE64.encode(value));
            Ok(())
        }
        BareItem::Boolean(value) => {
            out.push_str(if *value { "?1" } else { "?0" });
            Ok(())
        }
    }
}

fn serialize_integer(out: &mut String, value: i64) -> Result<(), Error> {
    if !(-INTEGER_LIMIT..=INTEGER_LIMIT).contains(&value) {
        return Err(Error::new(
            ErrorKind::WrongNumber,
            format!("integer {value} is out of range"),
        ));
    }
    let _ = write!(out, "{value}");
    Ok(())
}

fn serialize_decimal(out: &mut String, value: Decimal) -> Result<(), Error> {
    let rounded = round_decimal(value)?;
    let normalized = rounded.normalize();
    if normalized.scale() == 0 {
        let _ = write!(out, "{normalized}.0");
    } else {
        let _ = write!(out, "{normalized}");
    }
    Ok(())
}

/// Rounds half-to-even at the third fractional digit and rejects values
/// with more than twelve integer digits.
pub(crate) fn round_decimal(value: Decimal) -> Result<Decimal, Error> {
    let rounded = value.round_dp_with_strategy(3, RoundingStrategy::MidpointNearestEven);
    if rounded.trunc().abs() > Decimal::from(999_999_999_999_i64) {
        return Err(Error::new(
            ErrorKind::WrongNumber,
            format!("decimal {value} is out of range"),
        ));
    }
    Ok(rounded)
}

fn serialize_string(out: &mut String, value: &str) -> Result<(), Error> {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => {
                return Err(Error::new(
                    ErrorKind::UnexpectedCharacter,
                    "string character outside the printable ASCII range",
                ))
            }
        }
    }
    out.push('"');
    Ok(())
}

fn serialize_token(out: &mut String, value: &str) -> Result<(), Error> {
    let bytes = value.as_bytes();
    let first_ok = matches!(bytes.first(), Some(&c) if c.is_ascii_alphabetic() || c == b'*');
    if !first_ok
        || !bytes[1..]
            .iter()
            .all(|&c| is_tchar(c) || c == b':' || c == b'/')
    {
        return Err(Error::new(
            ErrorKind::UnexpectedCharacter,
            format!("`{value}` is not a valid token"),
        ));
    }
    out.push_str(value);
    Ok(())
}
