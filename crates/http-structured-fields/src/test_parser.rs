use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{
    BareItem, DictionaryExt, ErrorKind, FieldValue, InnerList, Item, Key, ListEntry, ListExt,
    Parser,
};

fn item(input: &str) -> Item {
    Parser::new(input).parse_item().unwrap()
}

fn item_err(input: &str) -> ErrorKind {
    Parser::new(input).parse_item().unwrap_err().kind()
}

fn list_err(input: &str) -> ErrorKind {
    Parser::new(input).parse_list().unwrap_err().kind()
}

fn dict_err(input: &str) -> ErrorKind {
    Parser::new(input).parse_dictionary().unwrap_err().kind()
}

#[test]
fn parses_integers() {
    assert_eq!(item("42").bare_item, BareItem::Integer(42));
    assert_eq!(item("-42").bare_item, BareItem::Integer(-42));
    assert_eq!(item("0").bare_item, BareItem::Integer(0));
    assert_eq!(item("-0").bare_item, BareItem::Integer(0));
    // leading zeros are tolerated on input
    assert_eq!(item("042").bare_item, BareItem::Integer(42));
    assert_eq!(item("  42  ").bare_item, BareItem::Integer(42));
}

#[test]
fn integer_range_boundaries() {
    assert_eq!(
        item("999999999999999").bare_item,
        BareItem::Integer(999_999_999_999_999)
    );
    assert_eq!(
        item("-999999999999999").bare_item,
        BareItem::Integer(-999_999_999_999_999)
    );
    assert_eq!(item_err("1000000000000000"), ErrorKind::WrongNumber);
    assert_eq!(item_err("-1000000000000000"), ErrorKind::WrongNumber);
}

#[test]
fn parses_decimals() {
    assert_eq!(
        item("1.25").bare_item,
        BareItem::Decimal(Decimal::from_str("1.25").unwrap())
    );
    assert_eq!(
        item("-1.25").bare_item,
        BareItem::Decimal(Decimal::from_str("-1.25").unwrap())
    );
    assert_eq!(
        item("100.0").bare_item,
        BareItem::Decimal(Decimal::from_str("100.0").unwrap())
    );
    assert_eq!(
        item("-0.0").bare_item,
        BareItem::Decimal(Decimal::from_str("-0.0").unwrap())
    );
}

#[test]
fn rejects_malformed_numbers() {
    assert_eq!(item_err("1."), ErrorKind::WrongNumber);
    assert_eq!(item_err("1.2345"), ErrorKind::WrongNumber);
    assert_eq!(item_err("1234567890123.0"), ErrorKind::WrongNumber);
    assert_eq!(item_err("-"), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err("1.2.3"), ErrorKind::UnexpectedCharacter);
    // the longest legal decimal is 12 digits, the point and 3 digits
    assert!(Parser::new("999999999999.999").parse_item().is_ok());
    assert_eq!(item_err("9999999999999.99"), ErrorKind::WrongNumber);
}

#[test]
fn parses_strings() {
    assert_eq!(item("\"foo\"").bare_item, BareItem::String("foo".into()));
    assert_eq!(item("\"\"").bare_item, BareItem::String(String::new()));
    assert_eq!(
        item("\"a \\\"b\\\" \\\\c\"").bare_item,
        BareItem::String("a \"b\" \\c".into())
    );
}

#[test]
fn rejects_malformed_strings() {
    assert_eq!(item_err("\"foo"), ErrorKind::MissingCharacter);
    assert_eq!(item_err("\"foo\\"), ErrorKind::MissingCharacter);
    assert_eq!(item_err("\"fo\\o\""), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err("\"f\u{7f}o\""), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err("\"caf\u{e9}\""), ErrorKind::UnexpectedCharacter);
}

#[test]
fn parses_tokens() {
    assert_eq!(item("foo").bare_item, BareItem::Token("foo".into()));
    assert_eq!(item("*").bare_item, BareItem::Token("*".into()));
    assert_eq!(
        item("a/b:c!#$%&'*+-.^_`|~9").bare_item,
        BareItem::Token("a/b:c!#$%&'*+-.^_`|~9".into())
    );
}

#[test]
fn parses_byte_sequences() {
    assert_eq!(
        item(":aGVsbG8=:").bare_item,
        BareItem::ByteSequence(b"hello".to_vec())
    );
    assert_eq!(item("::").bare_item, BareItem::ByteSequence(Vec::new()));
}

#[test]
fn rejects_malformed_byte_sequences() {
    assert_eq!(item_err(":aGVsbG8="), ErrorKind::MissingCharacter);
    assert_eq!(item_err(":a GVsbG8=:"), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err(":a:"), ErrorKind::InvalidBytes);
}

#[test]
fn parses_booleans() {
    assert_eq!(item("?1").bare_item, BareItem::Boolean(true));
    assert_eq!(item("?0").bare_item, BareItem::Boolean(false));
    assert_eq!(item_err("?2"), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err("?"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn parses_item_parameters() {
    let parsed = item("text/html;q=1.0;charset=utf-8;x");
    assert_eq!(parsed.bare_item, BareItem::Token("text/html".into()));
    assert_eq!(
        parsed.params.get("q"),
        Some(&BareItem::Decimal(Decimal::from_str("1.0").unwrap()))
    );
    assert_eq!(
        parsed.params.get("charset"),
        Some(&BareItem::Token("utf-8".into()))
    );
    assert_eq!(parsed.params.get("x"), Some(&BareItem::Boolean(true)));
}

#[test]
fn parameter_spaces_only_after_semicolon() {
    // *SP is allowed after `;`, nowhere else
    assert_eq!(
        item("a;  b=1").params.get("b"),
        Some(&BareItem::Integer(1))
    );
    assert_eq!(item_err("a ;b=1"), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err("a;b =1"), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err("a;b= 1"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn duplicate_parameter_keeps_first_position_and_last_value() {
    let parsed = item("a;k=1;l=2;k=3");
    let keys: Vec<&str> = parsed.params.keys().map(Key::as_str).collect();
    assert_eq!(keys, ["k", "l"]);
    assert_eq!(parsed.params.get("k"), Some(&BareItem::Integer(3)));
}

#[test]
fn rejects_uppercase_keys() {
    assert_eq!(item_err("a;K=1"), ErrorKind::UnexpectedCharacter);
    assert_eq!(dict_err("Key=1"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn parses_lists() {
    let list = Parser::new("a, b,  c").parse_list().unwrap();
    assert_eq!(
        list,
        vec![
            ListEntry::Item(Item::new(BareItem::Token("a".into()))),
            ListEntry::Item(Item::new(BareItem::Token("b".into()))),
            ListEntry::Item(Item::new(BareItem::Token("c".into()))),
        ]
    );
    assert_eq!(Parser::new("").parse_list().unwrap(), vec![]);
    assert_eq!(Parser::new("   ").parse_list().unwrap(), vec![]);
}

#[test]
fn rejects_malformed_lists() {
    assert_eq!(list_err("a,,b"), ErrorKind::UnexpectedCharacter);
    assert_eq!(list_err("a, b,"), ErrorKind::UnexpectedCharacter);
    assert_eq!(list_err("a b"), ErrorKind::UnexpectedCharacter);
    assert_eq!(list_err("a, b, "), ErrorKind::UnexpectedCharacter);
}

#[test]
fn parses_inner_lists() {
    let list = Parser::new("(1 2), (\"x\" y;a=1);b=?0, ()")
        .parse_list()
        .unwrap();
    assert_eq!(list.len(), 3);
    let first = match &list[0] {
        ListEntry::InnerList(inner) => inner,
        other => panic!("expected inner list, got {other:?}"),
    };
    assert_eq!(first.items.len(), 2);
    let second = match &list[1] {
        ListEntry::InnerList(inner) => inner,
        other => panic!("expected inner list, got {other:?}"),
    };
    assert_eq!(second.items[1].params.get("a"), Some(&BareItem::Integer(1)));
    assert_eq!(second.params.get("b"), Some(&BareItem::Boolean(false)));
    assert_eq!(
        list[2],
        ListEntry::InnerList(InnerList::new(Vec::new()))
    );
}

#[test]
fn inner_list_space_handling() {
    assert!(Parser::new("(  1  2  )").parse_list().is_ok());
    assert_eq!(list_err("(1"), ErrorKind::MissingCharacter);
    assert_eq!(list_err("("), ErrorKind::MissingCharacter);
    assert_eq!(list_err("(1;a=2"), ErrorKind::MissingCharacter);
    // a nested inner list is not grammar
    assert_eq!(list_err("((1))"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn parses_dictionaries() {
    let dict = Parser::new("a=?0, b, c; foo=bar").parse_dictionary().unwrap();
    assert_eq!(dict.len(), 3);
    assert_eq!(
        dict.get("a"),
        Some(&ListEntry::Item(Item::new(BareItem::Boolean(false))))
    );
    assert_eq!(
        dict.get("b"),
        Some(&ListEntry::Item(Item::new(BareItem::Boolean(true))))
    );
    let c = dict.get("c").unwrap().as_item().unwrap();
    assert_eq!(c.bare_item, BareItem::Boolean(true));
    assert_eq!(c.params.get("foo"), Some(&BareItem::Token("bar".into())));
}

#[test]
fn dictionary_duplicate_keys_replace_in_place() {
    let dict = Parser::new("a=1, b=2, a=3").parse_dictionary().unwrap();
    let keys: Vec<&str> = dict.keys().map(Key::as_str).collect();
    assert_eq!(keys, ["a", "b"]);
    assert_eq!(
        dict.get("a"),
        Some(&ListEntry::Item(Item::new(BareItem::Integer(3))))
    );
}

#[test]
fn rejects_malformed_dictionaries() {
    assert_eq!(dict_err("a =1"), ErrorKind::UnexpectedCharacter);
    assert_eq!(dict_err("a= 1"), ErrorKind::UnexpectedCharacter);
    assert_eq!(dict_err("a=1,"), ErrorKind::UnexpectedCharacter);
    assert_eq!(dict_err("a=1,,b=2"), ErrorKind::UnexpectedCharacter);
    assert_eq!(dict_err("a=1 b=2"), ErrorKind::UnexpectedCharacter);
    assert_eq!(dict_err("=1"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn empty_input_per_type() {
    assert_eq!(item_err(""), ErrorKind::EmptyInput);
    assert_eq!(item_err("   "), ErrorKind::EmptyInput);
    assert!(Parser::new("").parse_list().unwrap().is_empty());
    assert!(Parser::new("").parse_dictionary().unwrap().is_empty());
}

#[test]
fn trailing_garbage_fails() {
    assert_eq!(item_err("1 2"), ErrorKind::UnexpectedCharacter);
    assert_eq!(item_err("\"a\" x"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn parse_any_prefers_the_simplest_type() {
    match Parser::new("foo").parse_any().unwrap() {
        FieldValue::Item(parsed) => {
            assert_eq!(parsed.bare_item, BareItem::Token("foo".into()))
        }
        other => panic!("expected item, got {other:?}"),
    }
    match Parser::new("a, b").parse_any().unwrap() {
        FieldValue::List(list) => assert_eq!(list.len(), 2),
        other => panic!("expected list, got {other:?}"),
    }
    match Parser::new("a=1").parse_any().unwrap() {
        FieldValue::Dictionary(dict) => assert_eq!(dict.len(), 1),
        other => panic!("expected dictionary, got {other:?}"),
    }
}

#[test]
fn multi_line_fields_are_joined_with_comma_space() {
    let list = Parser::parse_list_lines(["a, b", "c"]).unwrap();
    assert_eq!(list.len(), 3);
    let dict = Parser::parse_dictionary_lines(["a=1", "b=2", "a=3"]).unwrap();
    assert_eq!(
        dict.get("a"),
        Some(&ListEntry::Item(Item::new(BareItem::Integer(3))))
    );
    assert!(Parser::parse_item_lines(["1;a=2"]).is_ok());
}

#[test]
fn typed_accessors_reject_wrong_classes() {
    let parsed = item("42");
    assert_eq!(parsed.bare_item.as_integer().unwrap(), 42);
    assert_eq!(
        parsed.bare_item.as_string().unwrap_err().kind(),
        ErrorKind::WrongItemClass
    );
    assert_eq!(
        parsed.bare_item.as_boolean().unwrap_err().kind(),
        ErrorKind::WrongItemClass
    );

    let list = Parser::new("(1 2)").parse_list().unwrap();
    assert_eq!(
        list[0].as_item().unwrap_err().kind(),
        ErrorKind::WrongItemClass
    );
}

#[test]
fn homogeneous_collection_accessors() {
    let weights = Parser::new("sha-512=2, sha-256=1")
        .parse_dictionary()
        .unwrap()
        .to_integer_map()
        .unwrap();
    assert_eq!(weights.get("sha-512"), Some(&2));
    assert_eq!(weights.get("sha-256"), Some(&1));

    let digests = Parser::new("sha-256=:aGVsbG8=:")
        .parse_dictionary()
        .unwrap()
        .to_byte_sequence_map()
        .unwrap();
    assert_eq!(digests.get("sha-256"), Some(&b"hello".to_vec()));

    assert_eq!(
        Parser::new("a=1, b=\"x\"")
            .parse_dictionary()
            .unwrap()
            .to_integer_map()
            .unwrap_err()
            .kind(),
        ErrorKind::WrongItemClass
    );

    let strings = Parser::new("\"a\", \"b\"")
        .parse_list()
        .unwrap()
        .to_string_list()
        .unwrap();
    assert_eq!(strings, ["a", "b"]);
    assert_eq!(
        Parser::new("\"a\", b")
            .parse_list()
            .unwrap()
            .to_string_list()
            .unwrap_err()
            .kind(),
        ErrorKind::WrongItemClass
    );
}

#[test]
fn key_construction_validates_grammar() {
    assert!(Key::new("a1_-.*").is_ok());
    assert!(Key::new("*key").is_ok());
    assert_eq!(Key::new("").unwrap_err().kind(), ErrorKind::InvalidKey);
    assert_eq!(Key::new("1a").unwrap_err().kind(), ErrorKind::InvalidKey);
    assert_eq!(Key::new("A").unwrap_err().kind(), ErrorKind::InvalidKey);
    assert_eq!(Key::new("a b").unwrap_err().kind(), ErrorKind::InvalidKey);
}

#[test]
fn non_ascii_input_is_rejected() {
    assert_eq!(item_err("caf\u{e9}"), ErrorKind::UnexpectedCharacter);
    assert_eq!(dict_err("k=caf\u{e9}"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn parameters_on_empty_parse_results() {
    // parameters bind to members, so a lone `;` is not a valid start
    assert_eq!(item_err(";a=1"), ErrorKind::UnexpectedCharacter);
    assert_eq!(list_err(";a=1"), ErrorKind::UnexpectedCharacter);
}

#[test]
fn mixed_structures_round_trip_values() {
    let input = "a=(1 2;x);y=?0, b=:aGVsbG8=:, c=\"q\";p=1.5";
    let dict = Parser::new(input).parse_dictionary().unwrap();
    let inner = dict.get("a").unwrap().as_inner_list().unwrap();
    assert_eq!(inner.items[1].params.get("x"), Some(&BareItem::Boolean(true)));
    assert_eq!(inner.params.get("y"), Some(&BareItem::Boolean(false)));
    let c = dict.get("c").unwrap().as_item().unwrap();
    assert_eq!(
        c.params.get("p"),
        Some(&BareItem::Decimal(Decimal::from_str("1.5").unwrap()))
    );
}
