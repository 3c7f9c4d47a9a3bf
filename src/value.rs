// used to store the mapping variant
use std::collections::HashMap;
// used to print out readable forms of a value
use std::fmt;

// used for the typed wire form of a tree
use serde::{Deserialize, Serialize};

// ------------- Number -------------
// A number remembers which kinds it was created from, so that a boolean
// and the integer 1 stay distinguishable after a round trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Number {
    boolean: Option<bool>,
    integer: Option<i64>,
    double: Option<f64>,
}

impl Number {
    pub fn new(boolean: Option<bool>, integer: Option<i64>, double: Option<f64>) -> Self {
        Self { boolean, integer, double }
    }
    /// Only a number of boolean origin answers as a bool.
    pub fn as_bool(&self) -> Option<bool> {
        self.boolean
    }
    pub fn as_i64(&self) -> Option<i64> {
        self.integer.or_else(|| {
            self.double
                .filter(|d| d.fract() == 0.0 && *d >= i64::MIN as f64 && *d < i64::MAX as f64)
                .map(|d| d as i64)
        })
    }
    pub fn as_f64(&self) -> Option<f64> {
        self.double.or_else(|| self.integer.map(|i| i as f64))
    }
    pub fn is_bool(&self) -> bool {
        self.boolean.is_some()
    }
    /// The raw (bool, integer, double) slots, without any widening.
    pub fn parts(&self) -> (Option<bool>, Option<i64>, Option<f64>) {
        (self.boolean, self.integer, self.double)
    }
}
impl From<bool> for Number {
    fn from(b: bool) -> Self {
        Self { boolean: Some(b), integer: Some(b as i64), double: Some(if b { 1.0 } else { 0.0 }) }
    }
}
impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Self { boolean: None, integer: Some(i), double: Some(i as f64) }
    }
}
impl From<f64> for Number {
    fn from(d: f64) -> Self {
        Self { boolean: None, integer: None, double: Some(d) }
    }
}
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.boolean, self.integer, self.double) {
            (Some(b), _, _) => write!(f, "{}", b),
            (None, Some(i), _) => write!(f, "{}", i),
            (None, None, Some(d)) => write!(f, "{:?}", d),
            (None, None, None) => write!(f, "NaN"),
        }
    }
}

// ------------- Value -------------
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Number(Number),
    Sequence(Vec<Value>),
    Mapping(HashMap<String, Value>),
}

impl Value {
    pub fn mapping() -> Self {
        Value::Mapping(HashMap::new())
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(values) => Some(values),
            _ => None,
        }
    }
    pub fn as_mapping(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }
    /// Looks up a key, treating anything that is not a mapping as empty.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|map| map.get(key))
    }
    /// Inserts a key. A value that is not a mapping is discarded and replaced
    /// by a mapping holding only the new entry.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        match self {
            Value::Mapping(map) => {
                map.insert(key.into(), value);
            }
            other => {
                let mut map = HashMap::new();
                map.insert(key.into(), value);
                *other = Value::Mapping(map);
            }
        }
    }
    /// Variant name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Sequence(values) => {
                let mut s = String::new();
                for v in values {
                    s += &(v.to_string() + ",");
                }
                s.pop();
                write!(f, "[{}]", s)
            }
            Value::Mapping(map) => {
                // sorted so that the output is stable
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut s = String::new();
                for k in keys {
                    s += &format!("{:?}:{},", k, map[k]);
                }
                s.pop();
                write!(f, "{{{}}}", s)
            }
        }
    }
}

// ------------- Conversions -------------
impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(Number::from(b))
    }
}
impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Number(Number::from(d))
    }
}
impl From<f32> for Value {
    fn from(d: f32) -> Self {
        Value::Number(Number::from(d as f64))
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Sequence(values)
    }
}
impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Mapping(map)
    }
}

macro_rules! integer_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Number(Number::from(i as i64))
                }
            }
        )*
    };
}
integer_into_value!(i8, i16, i32, i64, u8, u16, u32);
