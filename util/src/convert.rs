//! Structural conversion between [`Element`] trees and nested [`Value`]s.
//!
//! Decoding is driven by XSD type hints: any attribute whose name ends in
//! `type` names the scalar type of a leaf, or marks an element as an array
//! when its value ends in `array`. Encoding writes those same hints back.
//!
//! The mapping is lossy in a few places. Array items lose their tag names,
//! sibling elements sharing a tag collapse to the last one, and empty strings
//! or empty objects come back as [`Value::Null`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};

use crate::{error::Error, xml::Element};

pub const NAMESPACE_ATTRIBUTE: &str = "xmlns:optio";
pub const NAMESPACE: &str = "http://www.optio.com/schemas";
pub const ARRAY_TYPE: &str = "optio:array";
pub const ITEM_TAG: &str = "item";
pub const EMPTY_DOCUMENT_TAG: &str = "none";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const TYPE_ATTRIBUTE: &str = "type";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    DateTime,
    Integer,
    Float,
    Boolean,
}

impl ScalarKind {
    fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.to_lowercase();

        match hint.rsplit(':').next() {
            Some("datetime") => Some(Self::DateTime),
            Some("integer") => Some(Self::Integer),
            Some("float") => Some(Self::Float),
            Some("boolean") => Some(Self::Boolean),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::DateTime => "datetime",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }

    fn convert(self, text: &str) -> Result<Value, Error> {
        let trimmed = text.trim();

        let value = match self {
            Self::DateTime => parse_datetime(trimmed).map(Value::DateTime),
            Self::Integer => trimmed.parse().ok().map(Value::Integer),
            Self::Float => trimmed.parse().ok().map(Value::Float),
            Self::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
        };

        value.ok_or_else(|| Error::ScalarConversion {
            kind: self.name(),
            text: text.to_owned(),
        })
    }
}

/// Accepts `YYYY-MM-DD[T ]HH:MM:SS[.fff]`, or RFC 3339 with an offset, which
/// is shifted to UTC.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.naive_utc());
    }

    NaiveDateTime::parse_from_str(&text.replacen(' ', "T", 1), DATETIME_FORMAT).ok()
}

impl Value {
    /// XSD type name written on encode. `Boolean` must stay ahead of
    /// `Integer` here.
    pub fn xsd_type(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "xs:boolean",
            Value::Integer(_) => "xs:integer",
            Value::Float(_) => "xs:float",
            Value::DateTime(_) => "xs:dateTime",
            _ => "xs:string",
        }
    }

    fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(value) => value.clone(),
            Value::Integer(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Boolean(value) => value.to_string(),
            Value::DateTime(value) => value.format(DATETIME_FORMAT).to_string(),
            Value::Array(..) | Value::Object(..) => String::new(),
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Object(value)
    }
}

/// The last attribute whose name ends in `type`, in any case.
fn type_hint(element: &Element) -> Option<&str> {
    element
        .attributes
        .iter()
        .rev()
        .find(|(name, _)| name.to_lowercase().ends_with(TYPE_ATTRIBUTE))
        .map(|(_, value)| value.as_str())
}

fn is_array(element: &Element) -> bool {
    type_hint(element).map_or(false, |hint| hint.to_lowercase().ends_with("array"))
}

/// Decodes a leaf element from its text and type hint. Missing text is null;
/// unknown type hints leave the text as a string.
pub fn scalar_value(element: &Element) -> Result<Value, Error> {
    let text = match &element.text {
        Some(text) => text,
        None => return Ok(Value::Null),
    };

    match type_hint(element).and_then(ScalarKind::from_hint) {
        Some(kind) => kind.convert(text),
        None => Ok(Value::String(text.clone())),
    }
}

fn decode_object(element: &Element) -> Result<BTreeMap<String, Value>, Error> {
    let mut object = BTreeMap::new();

    for child in &element.children {
        object.insert(child.local_name().to_owned(), decode(child)?);
    }

    Ok(object)
}

fn decode_array(element: &Element) -> Result<Vec<Value>, Error> {
    element
        .children
        .iter()
        .map(|item| {
            if item.children.is_empty() {
                scalar_value(item)
            } else {
                decode_object(item).map(Value::Object)
            }
        })
        .collect()
}

/// Decodes one element without wrapping it in its tag.
pub fn decode(element: &Element) -> Result<Value, Error> {
    if element.children.is_empty() {
        scalar_value(element)
    } else if is_array(element) {
        decode_array(element).map(Value::Array)
    } else {
        decode_object(element).map(Value::Object)
    }
}

/// Decodes a document root into `{root_tag: value}`.
pub fn element_to_value(element: &Element) -> Result<Value, Error> {
    let mut document = BTreeMap::new();
    document.insert(element.local_name().to_owned(), decode(element)?);
    Ok(Value::Object(document))
}

/// Encodes `value` as an element named `tag`.
pub fn value_to_element(value: &Value, tag: &str) -> Element {
    let mut element = Element::new(tag);

    match value {
        Value::Null => (),

        Value::Object(object) => {
            for (key, value) in object {
                element.push(value_to_element(value, key));
            }
        }

        Value::Array(items) => {
            element.set(TYPE_ATTRIBUTE, ARRAY_TYPE);

            for item in items {
                element.push(value_to_element(item, ITEM_TAG));
            }
        }

        scalar => {
            element.text = Some(scalar.to_text());
            element.set(TYPE_ATTRIBUTE, scalar.xsd_type());
        }
    }

    element
}

/// Encodes a `{root_tag: value}` document, declaring the array-marker
/// namespace on the root.
pub fn document_to_element(document: &BTreeMap<String, Value>) -> Element {
    match document.iter().next() {
        Some((tag, value)) => {
            value_to_element(value, tag).with_attribute(NAMESPACE_ATTRIBUTE, NAMESPACE)
        }
        None => Element::new(EMPTY_DOCUMENT_TAG),
    }
}
