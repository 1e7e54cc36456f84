use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rust_decimal::Decimal;

use crate::error::{Error, ErrorKind};
use crate::{BareItem, Dictionary, FieldValue, InnerList, Item, Key, List, ListEntry, Parameters};

/// Strict RFC 8941 parser over a single field line.
///
/// Each `parse_*` entry point consumes the whole input; trailing characters
/// other than spaces fail with [`ErrorKind::UnexpectedCharacter`]. Repeated
/// field lines can be fed through the `parse_*_lines` variants, which join
/// them with `", "` before parsing.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    /// Parses one item; empty input is [`ErrorKind::EmptyInput`].
    pub fn parse_item(mut self) -> Result<Item, Error> {
        self.skip_sp();
        if self.eof() {
            return Err(Error::new(
                ErrorKind::EmptyInput,
                "cannot parse an item from empty input",
            ));
        }
        let item = self.item()?;
        self.finish()?;
        Ok(item)
    }

    /// Parses a list; empty input yields the empty list.
    pub fn parse_list(mut self) -> Result<List, Error> {
        self.skip_sp();
        let mut members = List::new();
        if self.eof() {
            return Ok(members);
        }
        loop {
            members.push(self.item_or_inner_list()?);
            self.skip_ows();
            if self.eof() {
                return Ok(members);
            }
            self.expect(b',')?;
            self.skip_ows();
            if self.eof() {
                return Err(Error::new(
                    ErrorKind::UnexpectedCharacter,
                    "trailing comma at the end of a list",
                ));
            }
        }
    }

    /// Parses a dictionary; empty input yields the empty dictionary, a
    /// repeated key keeps its first position with the later value.
    pub fn parse_dictionary(mut self) -> Result<Dictionary, Error> {
        self.skip_sp();
        let mut members = Dictionary::default();
        if self.eof() {
            return Ok(members);
        }
        loop {
            let key = self.key()?;
            let member = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.item_or_inner_list()?
            } else {
                ListEntry::Item(Item::with_params(
                    BareItem::Boolean(true),
                    self.parameters()?,
                ))
            };
            members.insert(key, member);
            self.skip_ows();
            if self.eof() {
                return Ok(members);
            }
            self.expect(b',')?;
            self.skip_ows();
            if self.eof() {
                return Err(Error::new(
                    ErrorKind::UnexpectedCharacter,
                    "trailing comma at the end of a dictionary",
                ));
            }
        }
    }

    /// Parses whichever of the three top-level types consumes the whole
    /// input, preferring the simplest: item, then list, then dictionary.
    pub fn parse_any(self) -> Result<FieldValue, Error> {
        if let Ok(item) = self.parse_item() {
            return Ok(FieldValue::Item(item));
        }
        if let Ok(list) = self.parse_list() {
            return Ok(FieldValue::List(list));
        }
        self.parse_dictionary().map(FieldValue::Dictionary)
    }

    pub fn parse_item_lines<I, S>(lines: I) -> Result<Item, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_lines(lines);
        Parser::new(&joined).parse_item()
    }

    pub fn parse_list_lines<I, S>(lines: I) -> Result<List, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_lines(lines);
        Parser::new(&joined).parse_list()
    }

    pub fn parse_dictionary_lines<I, S>(lines: I) -> Result<Dictionary, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_lines(lines);
        Parser::new(&joined).parse_dictionary()
    }

    fn item(&mut self) -> Result<Item, Error> {
        let bare_item = self.bare_item()?;
        let params = self.parameters()?;
        Ok(Item { bare_item, params })
    }

    fn item_or_inner_list(&mut self) -> Result<ListEntry, Error> {
        if self.peek() == Some(b'(') {
            self.inner_list().map(ListEntry::InnerList)
        } else {
            self.item().map(ListEntry::Item)
        }
    }

    fn inner_list(&mut self) -> Result<InnerList, Error> {
        self.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.skip_sp();
            match self.peek() {
                None => {
                    return Err(Error::new(
                        ErrorKind::MissingCharacter,
                        "unterminated inner list",
                    ))
                }
                Some(b')') => {
                    self.pos += 1;
                    return Ok(InnerList {
                        items,
                        params: self.parameters()?,
                    });
                }
                Some(_) => {
                    items.push(self.item()?);
                    match self.peek() {
                        Some(b' ') | Some(b')') => {}
                        Some(_) => {
                            return Err(Error::new(
                                ErrorKind::UnexpectedCharacter,
                                "inner list items must be separated by spaces",
                            ))
                        }
                        None => {
                            return Err(Error::new(
                                ErrorKind::MissingCharacter,
                                "unterminated inner list",
                            ))
                        }
                    }
                }
            }
        }
    }

    fn parameters(&mut self) -> Result<Parameters, Error> {
        let mut params = Parameters::new();
        while self.peek() == Some(b';') {
            self.pos += 1;
            self.skip_sp();
            let key = self.key()?;
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.bare_item()?
            } else {
                BareItem::Boolean(true)
            };
            params.insert(key, value);
        }
        Ok(params)
    }

    fn key(&mut self) -> Result<Key, Error> {
        match self.peek() {
            Some(c) if c.is_ascii_lowercase() || c == b'*' => {}
            _ => {
                return Err(Error::new(
                    ErrorKind::UnexpectedCharacter,
                    "a key must start with a lowercase letter or `*`",
                ))
            }
        }
        let mut key = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, b'_' | b'-' | b'.' | b'*')
            {
                key.push(c as char);
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(Key::from_validated(key))
    }

    fn bare_item(&mut self) -> Result<BareItem, Error> {
        match self.peek() {
            Some(b'"') => self.string(),
            Some(b':') => self.byte_sequence(),
            Some(b'?') => self.boolean(),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == b'*' => self.token(),
            Some(_) => Err(Error::new(
                ErrorKind::UnexpectedCharacter,
                "expected a bare item",
            )),
            None => Err(Error::new(
                ErrorKind::UnexpectedCharacter,
                "input ended where a bare item was expected",
            )),
        }
    }

    fn number(&mut self) -> Result<BareItem, Error> {
        let negative = if self.peek() == Some(b'-') {
            self.pos += 1;
            true
        } else {
            false
        };
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(Error::new(
                ErrorKind::UnexpectedCharacter,
                "a number must start with a digit",
            ));
        }
        let start = self.pos;
        let mut dot_offset: Option<usize> = None;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == b'.' && dot_offset.is_none() {
                if self.pos - start > 12 {
                    return Err(Error::new(
                        ErrorKind::WrongNumber,
                        "more than 12 digits before the decimal point",
                    ));
                }
                dot_offset = Some(self.pos - start);
                self.pos += 1;
            } else {
                break;
            }
            let len = self.pos - start;
            match dot_offset {
                None if len > 15 => {
                    return Err(Error::new(
                        ErrorKind::WrongNumber,
                        "integer with more than 15 digits",
                    ))
                }
                Some(_) if len > 16 => {
                    return Err(Error::new(
                        ErrorKind::WrongNumber,
                        "decimal with more than 16 characters",
                    ))
                }
                _ => {}
            }
        }
        let text = self.slice_to_string(start);
        match dot_offset {
            Some(dot) => {
                let fractional = text.len() - dot - 1;
                if fractional == 0 {
                    return Err(Error::new(
                        ErrorKind::WrongNumber,
                        "decimal ends with the decimal point",
                    ));
                }
                if fractional > 3 {
                    return Err(Error::new(
                        ErrorKind::WrongNumber,
                        "more than 3 fractional digits",
                    ));
                }
                let mut value = Decimal::from_str(&text).map_err(|_| {
                    Error::new(ErrorKind::WrongNumber, format!("cannot parse `{text}`"))
                })?;
                if negative {
                    value.set_sign_negative(true);
                }
                Ok(BareItem::Decimal(value))
            }
            None => {
                let value: i64 = text.parse().map_err(|_| {
                    Error::new(ErrorKind::WrongNumber, format!("cannot parse `{text}`"))
                })?;
                Ok(BareItem::Integer(if negative { -value } else { value }))
            }
        }
    }

    fn string(&mut self) -> Result<BareItem, Error> {
        self.expect(b'"')?;
        let mut value = String::new();
        while let Some(c) = self.next_byte() {
            match c {
                b'\\' => match self.next_byte() {
                    Some(b'"') => value.push('"'),
                    Some(b'\\') => value.push('\\'),
                    Some(_) => {
                        return Err(Error::new(
                            ErrorKind::UnexpectedCharacter,
                            "only `\\\"` and `\\\\` escapes are allowed in strings",
                        ))
                    }
                    None => {
                        return Err(Error::new(
                            ErrorKind::MissingCharacter,
                            "unterminated string",
                        ))
                    }
                },
                b'"' => return Ok(BareItem::String(value)),
                0x20..=0x7e => value.push(c as char),
                _ => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedCharacter,
                        "string character outside the printable ASCII range",
                    ))
                }
            }
        }
        Err(Error::new(
            ErrorKind::MissingCharacter,
            "unterminated string",
        ))
    }

    fn token(&mut self) -> Result<BareItem, Error> {
        // the caller checked the first character is ALPHA or `*`
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            if is_tchar(c) || c == b':' || c == b'/' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(BareItem::Token(self.slice_to_string(start)))
    }

    fn byte_sequence(&mut self) -> Result<BareItem, Error> {
        self.expect(b':')?;
        let start = self.pos;
        loop {
            match self.next_byte() {
                Some(b':') => break,
                Some(c) if c.is_ascii_alphanumeric() || matches!(c, b'+' | b'/' | b'=') => {}
                Some(_) => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedCharacter,
                        "invalid character in byte sequence",
                    ))
                }
                None => {
                    return Err(Error::new(
                        ErrorKind::MissingCharacter,
                        "unterminated byte sequence",
                    ))
                }
            }
        }
        let encoded = &self.input[start..self.pos - 1];
        BASE64
            .decode(encoded)
            .map(BareItem::ByteSequence)
            .map_err(|_| Error::new(ErrorKind::InvalidBytes, "invalid base64 in byte sequence"))
    }

    fn boolean(&mut self) -> Result<BareItem, Error> {
        self.expect(b'?')?;
        match self.next_byte() {
            Some(b'1') => Ok(BareItem::Boolean(true)),
            Some(b'0') => Ok(BareItem::Boolean(false)),
            _ => Err(Error::new(
                ErrorKind::UnexpectedCharacter,
                "a boolean must be `?0` or `?1`",
            )),
        }
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.skip_sp();
        if self.eof() {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::UnexpectedCharacter,
                "trailing characters after the parsed value",
            ))
        }
    }

    fn expect(&mut self, wanted: u8) -> Result<(), Error> {
        if self.peek() == Some(wanted) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::UnexpectedCharacter,
                format!("expected `{}`", wanted as char),
            ))
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_sp(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn skip_ows(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn slice_to_string(&self, start: usize) -> String {
        // the scanners above only accept ASCII bytes
        self.input[start..self.pos]
            .iter()
            .map(|&c| c as char)
            .collect()
    }
}

pub(crate) fn is_tchar(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

fn join_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for line in lines {
        if !joined.is_empty() {
            joined.push_str(", ");
        }
        joined.push_str(line.as_ref());
    }
    joined
}
