// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    absent = { FieldValue::Absent, "" },
    text = { FieldValue::Text("org/backend".to_string()), "org/backend" },
    whole_number = { FieldValue::Number(42.0), "42" },
    fraction_rounds = { FieldValue::Number(41.6), "42" },
)]
fn field_value_text(value: FieldValue, expected: &str) {
    assert_eq!(value.as_text(), expected);
}

#[parameterized(
    null = { "null", FieldValue::Absent },
    string = { r#""org/web""#, FieldValue::Text("org/web".to_string()) },
    number = { "7", FieldValue::Number(7.0) },
    boolean = { "true", FieldValue::Text("true".to_string()) },
    array = { r#"["a","b"]"#, FieldValue::Text(r#"["a","b"]"#.to_string()) },
)]
fn field_value_from_json(raw: &str, expected: FieldValue) {
    let value: FieldValue = serde_json::from_str(raw).unwrap();
    assert_eq!(value, expected);
}

#[test]
fn blank_detects_whitespace_text() {
    assert!(FieldValue::Absent.is_blank());
    assert!(FieldValue::Text("  ".to_string()).is_blank());
    assert!(!FieldValue::Text("org/web".to_string()).is_blank());
}

#[test]
fn missing_field_is_absent() {
    let item = Item::new(1, "subject").with_field(5, FieldValue::Text("x".to_string()));
    assert_eq!(item.field(5), FieldValue::Text("x".to_string()));
    assert_eq!(item.field(6), FieldValue::Absent);
}
