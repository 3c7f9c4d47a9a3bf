//! JSON bytes to and from a [`Value`] tree.
//!
//! The plain form is ordinary JSON; a number is written as the first kind it
//! holds out of bool, integer and double. The typed form is the serde encoding of
//! the tree itself and keeps every numeric kind of every number. JSON has no
//! form for NaN or infinity, so the typed form refuses trees holding them.

use std::collections::HashMap;

use serde_json::{Map, Number as JsonNumber, Value as Json};

use crate::config::Settings;
use crate::error::{MapperError, Result};
use crate::mapping::{Mappable, Mapper};
use crate::value::{Number, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pretty: settings.json.pretty,
        }
    }

    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        let json = to_json(value);
        Ok(if self.pretty {
            serde_json::to_vec_pretty(&json)?
        } else {
            serde_json::to_vec(&json)?
        })
    }
    pub fn deserialize(&self, data: &[u8]) -> Result<Value> {
        let json: Json = serde_json::from_slice(data)?;
        Ok(from_json(json))
    }

    pub fn typed_serialize(&self, value: &Value) -> Result<Vec<u8>> {
        if let Some(d) = non_finite(value) {
            return Err(MapperError::Serialization(format!(
                "{d} cannot be written in the typed form"
            )));
        }
        Ok(if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        })
    }
    pub fn typed_deserialize(&self, data: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn serialize_object<T: Mappable>(&self, mapper: &Mapper, object: &T) -> Result<Vec<u8>> {
        self.serialize(&mapper.write(object))
    }
    pub fn deserialize_object<T: Mappable>(&self, mapper: &Mapper, data: &[u8]) -> Result<T> {
        mapper.read(&self.deserialize(data)?)
    }
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Text(s) => Json::String(s.clone()),
        Value::Number(n) => match n.parts() {
            (Some(b), _, _) => Json::Bool(b),
            (None, Some(i), _) => Json::Number(JsonNumber::from(i)),
            // non-finite doubles have no JSON form
            (None, None, Some(d)) => JsonNumber::from_f64(d).map(Json::Number).unwrap_or(Json::Null),
            (None, None, None) => Json::Null,
        },
        Value::Sequence(values) => Json::Array(values.iter().map(to_json).collect()),
        Value::Mapping(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect::<Map<String, Json>>(),
        ),
    }
}

fn non_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.parts().2.filter(|d| !d.is_finite()),
        Value::Sequence(values) => values.iter().find_map(non_finite),
        Value::Mapping(map) => map.values().find_map(non_finite),
        Value::Null | Value::Text(_) => None,
    }
}

fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::from(b),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Number(Number::from(i)),
            (None, Some(d)) => Value::Number(Number::from(d)),
            (None, None) => Value::Null,
        },
        Json::String(s) => Value::Text(s),
        Json::Array(values) => Value::Sequence(values.into_iter().map(from_json).collect()),
        Json::Object(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect::<HashMap<String, Value>>(),
        ),
    }
}
