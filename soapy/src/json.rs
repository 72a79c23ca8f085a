//! JSON view of decoded documents. Timestamps become strings; JSON numbers
//! that fit an `i64` become integers, everything else a float.

use serde_json::{Map, Number, Value as Json};
use soapy_util::{convert::DATETIME_FORMAT, Value};

pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::String(value) => Json::String(value.clone()),
        Value::Integer(value) => Json::from(*value),
        Value::Float(value) => Number::from_f64(*value).map_or(Json::Null, Json::Number),
        Value::Boolean(value) => Json::Bool(*value),
        Value::DateTime(value) => Json::String(value.format(DATETIME_FORMAT).to_string()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Object(object) => Json::Object(
            object
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect::<Map<_, _>>(),
        ),
    }
}

pub fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(value) => Value::Boolean(*value),
        Json::Number(number) => match number.as_i64() {
            Some(value) => Value::Integer(value),
            None => number.as_f64().map_or(Value::Null, Value::Float),
        },
        Json::String(value) => Value::String(value.clone()),
        Json::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        Json::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (key.clone(), from_json(value)))
                .collect(),
        ),
    }
}
