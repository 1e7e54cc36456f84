use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{
    BareItem, Dictionary, ErrorKind, InnerList, Item, Key, ListEntry, Parameters, Parser,
    SerializeValue,
};

fn canonical_item(input: &str) -> String {
    Parser::new(input).parse_item().unwrap().serialize_value().unwrap()
}

fn canonical_list(input: &str) -> String {
    Parser::new(input).parse_list().unwrap().serialize_value().unwrap()
}

fn canonical_dict(input: &str) -> String {
    Parser::new(input)
        .parse_dictionary()
        .unwrap()
        .serialize_value()
        .unwrap()
}

#[test]
fn canonical_forms_strip_redundant_whitespace() {
    assert_eq!(canonical_list("a ,  b,   c"), "a, b, c");
    assert_eq!(canonical_dict("a=?0, b, c; foo=bar"), "a=?0, b, c;foo=bar");
    assert_eq!(canonical_item("  1;  a=2  "), "1;a=2");
    assert_eq!(canonical_list("(  1  2  );x"), "(1 2);x");
}

#[test]
fn integers_are_stripped_of_leading_zeros() {
    assert_eq!(canonical_item("042"), "42");
    assert_eq!(canonical_item("-042"), "-42");
    assert_eq!(canonical_item("00"), "0");
}

#[test]
fn integer_serialization_enforces_range() {
    let mut out = Item::new(BareItem::Integer(999_999_999_999_999));
    assert_eq!(out.serialize_value().unwrap(), "999999999999999");
    out.bare_item = BareItem::Integer(1_000_000_000_000_000);
    assert_eq!(
        out.serialize_value().unwrap_err().kind(),
        ErrorKind::WrongNumber
    );
    out.bare_item = BareItem::Integer(-1_000_000_000_000_000);
    assert_eq!(
        out.serialize_value().unwrap_err().kind(),
        ErrorKind::WrongNumber
    );
}

#[test]
fn decimals_serialize_minimally_with_one_fraction_digit() {
    assert_eq!(canonical_item("1.500"), "1.5");
    assert_eq!(canonical_item("2.000"), "2.0");
    assert_eq!(canonical_item("-0.050"), "-0.05");
    assert_eq!(canonical_item("100.0"), "100.0");
}

#[test]
fn decimal_rounding_is_half_to_even() {
    let rounds = [
        ("1.0015", "1.002"),
        ("1.0025", "1.002"),
        ("1.0035", "1.004"),
        ("-1.0015", "-1.002"),
        ("0.0001", "0.0"),
    ];
    for (input, expected) in rounds {
        let item = Item::new(
            BareItem::decimal(Decimal::from_str(input).unwrap()).unwrap(),
        );
        assert_eq!(item.serialize_value().unwrap(), expected, "for {input}");
    }
}

#[test]
fn decimal_construction_enforces_range() {
    assert!(BareItem::decimal(Decimal::from_str("999999999999.999").unwrap()).is_ok());
    assert_eq!(
        BareItem::decimal(Decimal::from_str("1000000000000.0").unwrap())
            .unwrap_err()
            .kind(),
        ErrorKind::WrongNumber
    );
}

#[test]
fn strings_escape_quotes_and_backslashes() {
    let item = Item::new(BareItem::String("a \"b\" \\c".into()));
    assert_eq!(item.serialize_value().unwrap(), "\"a \\\"b\\\" \\\\c\"");
}

#[test]
fn strings_reject_non_printable_characters() {
    for value in ["caf\u{e9}", "tab\there", "nl\nhere"] {
        let item = Item::new(BareItem::String(value.into()));
        assert_eq!(
            item.serialize_value().unwrap_err().kind(),
            ErrorKind::UnexpectedCharacter,
            "for {value:?}"
        );
    }
}

#[test]
fn tokens_are_validated_on_serialization() {
    assert!(Item::new(BareItem::Token("*a/b:c".into()))
        .serialize_value()
        .is_ok());
    for value in ["", "1abc", "a b", "\"quoted\""] {
        let item = Item::new(BareItem::Token(value.into()));
        assert_eq!(
            item.serialize_value().unwrap_err().kind(),
            ErrorKind::UnexpectedCharacter,
            "for {value:?}"
        );
    }
}

#[test]
fn byte_sequences_and_booleans() {
    assert_eq!(
        Item::new(BareItem::ByteSequence(b"hello".to_vec()))
            .serialize_value()
            .unwrap(),
        ":aGVsbG8=:"
    );
    assert_eq!(
        Item::new(BareItem::Boolean(true)).serialize_value().unwrap(),
        "?1"
    );
    assert_eq!(
        Item::new(BareItem::Boolean(false)).serialize_value().unwrap(),
        "?0"
    );
}

#[test]
fn boolean_true_parameters_collapse_to_bare_keys() {
    assert_eq!(canonical_item("a;x=?1;y=?0"), "a;x;y=?0");
    assert_eq!(canonical_dict("a=?1, b=?0"), "a, b=?0");
}

#[test]
fn dictionary_members_serialize_with_parameters() {
    let mut dict = Dictionary::default();
    let mut params = Parameters::new();
    params.insert(Key::constant("w"), BareItem::Integer(3));
    dict.insert(
        Key::constant("one"),
        ListEntry::Item(Item::with_params(BareItem::Token("v".into()), params)),
    );
    dict.insert(
        Key::constant("two"),
        ListEntry::InnerList(InnerList::new(vec![
            Item::new(BareItem::Integer(1)),
            Item::new(BareItem::Integer(2)),
        ])),
    );
    assert_eq!(dict.serialize_value().unwrap(), "one=v;w=3, two=(1 2)");
}

#[test]
fn empty_collections_serialize_to_the_empty_string() {
    assert_eq!(canonical_list(""), "");
    assert_eq!(canonical_dict(""), "");
}

#[test]
fn parse_serialize_round_trip_is_identity_on_canonical_forms() {
    let canonical = [
        "a, (b c;x);y=1, :aGVsbG8=:, \"str\";q=0.5",
        "key=\"value\", flag, nested=(1 2.5 tok);p",
        "42;a;b=?0",
        "sha-256=:aGVsbG8=:",
    ];
    for form in canonical {
        match Parser::new(form).parse_any() {
            Ok(value) => assert_eq!(value.serialize_value().unwrap(), form, "for {form}"),
            Err(err) => panic!("failed to parse {form}: {err}"),
        }
    }
}

#[test]
fn serialize_then_parse_preserves_values() {
    let input = "a=(1 2;x);y=?0, b=:aGVsbG8=:, c=\"q\";p=1.5, d";
    let dict = Parser::new(input).parse_dictionary().unwrap();
    let serialized = dict.serialize_value().unwrap();
    let reparsed = Parser::new(&serialized).parse_dictionary().unwrap();
    assert_eq!(dict, reparsed);
}
