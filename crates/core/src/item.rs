// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Origin items and their custom field values

use crate::task::ItemId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a tracker custom field
///
/// Trackers report custom field values as strings, numbers, or nothing at
/// all. Anything else is carried as the text of its JSON rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Absent,
    Text(String),
    Number(f64),
}

impl FieldValue {
    /// Textual form used for comparisons and write-back
    ///
    /// Numbers are rendered without decimals.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format!("{:.0}", n),
        }
    }

    /// True when the field carries no usable value
    pub fn is_blank(&self) -> bool {
        self.as_text().trim().is_empty()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&serde_json::Value> for FieldValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Absent,
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => FieldValue::Number(f),
                None => FieldValue::Text(n.to_string()),
            },
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value.as_ref().map(FieldValue::from).unwrap_or_default())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Absent => serializer.serialize_none(),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

/// An item in the origin tracker that may need mirroring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub tracker: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub fields: BTreeMap<u32, FieldValue>,
}

impl Item {
    pub fn new(id: ItemId, subject: impl Into<String>) -> Self {
        Self {
            id,
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: u32, value: FieldValue) -> Self {
        self.fields.insert(field, value);
        self
    }

    /// Value of a custom field, `Absent` when the item does not carry it
    pub fn field(&self, field: u32) -> FieldValue {
        self.fields.get(&field).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
