//! One field description, two directions.
//!
//! A [`Mappable`] type describes its fields once against a [`MappingData`] cursor.
//! Run against a [`WriteCursor`] the description produces a [`Value`] tree; run
//! against a [`ReadCursor`] it populates a fresh instance from a tree.
//!
//! ```
//! use treemapper::{Mappable, MappingData, Mapper, Result};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Point { x: i64, y: i64 }
//!
//! impl Mappable for Point {
//!     fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()> {
//!         data.map("x", &mut self.x)?;
//!         data.map("y", &mut self.y)
//!     }
//! }
//!
//! let mapper = Mapper::new();
//! let tree = mapper.write(&Point { x: 1, y: 2 });
//! assert_eq!(mapper.read::<Point>(&tree).unwrap(), Point { x: 1, y: 2 });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::trace;

use crate::config::Settings;
use crate::error::{MapperError, Result};
use crate::polymorph::PolymorphRegistry;
use crate::transform::Transformation;
use crate::value::Value;

pub trait Mappable: Default + Clone {
    fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()>;
}

/// The field-level surface shared by both cursors.
pub trait MappingData {
    fn is_reading(&self) -> bool;
    fn map<T: FieldValue>(&mut self, key: &str, field: &mut T) -> Result<()>;
    /// Like `map`, but an absent or null key reads as `default`.
    fn map_or<T: FieldValue>(&mut self, key: &str, field: &mut T, default: T) -> Result<()>;
    fn map_with<T, R: Transformation<T>>(&mut self, key: &str, field: &mut T, transformation: &R) -> Result<()>;
    fn map_optional_with<T, R: Transformation<T>>(
        &mut self,
        key: &str,
        field: &mut Option<T>,
        transformation: &R,
    ) -> Result<()>;
}

/// Converts a field type to and from a [`Value`].
pub trait FieldValue: Sized {
    fn write_value(&self, registry: &PolymorphRegistry) -> Value;
    fn read_value(value: &Value, registry: &PolymorphRegistry) -> Result<Self>;
    /// What a reader gets for an absent key, `None` when absence is an error.
    fn absent() -> Option<Self> {
        None
    }
}

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> MapperError {
    MapperError::TypeMismatch {
        field: String::new(),
        expected,
        found: found.kind(),
    }
}

// ------------- Write mode -------------
pub struct WriteCursor<'r> {
    registry: &'r PolymorphRegistry,
    tree: Value,
}
impl<'r> WriteCursor<'r> {
    pub fn new(registry: &'r PolymorphRegistry) -> Self {
        Self {
            registry,
            tree: Value::mapping(),
        }
    }
    pub fn into_value(self) -> Value {
        self.tree
    }
}
impl MappingData for WriteCursor<'_> {
    fn is_reading(&self) -> bool {
        false
    }
    fn map<T: FieldValue>(&mut self, key: &str, field: &mut T) -> Result<()> {
        let value = field.write_value(self.registry);
        self.tree.insert(key, value);
        Ok(())
    }
    fn map_or<T: FieldValue>(&mut self, key: &str, field: &mut T, _default: T) -> Result<()> {
        self.map(key, field)
    }
    fn map_with<T, R: Transformation<T>>(&mut self, key: &str, field: &mut T, transformation: &R) -> Result<()> {
        self.tree.insert(key, transformation.transform_to(Some(&*field)));
        Ok(())
    }
    fn map_optional_with<T, R: Transformation<T>>(
        &mut self,
        key: &str,
        field: &mut Option<T>,
        transformation: &R,
    ) -> Result<()> {
        self.tree.insert(key, transformation.transform_to(field.as_ref()));
        Ok(())
    }
}

// ------------- Read mode -------------
pub struct ReadCursor<'r> {
    registry: &'r PolymorphRegistry,
    tree: &'r Value,
}
impl<'r> ReadCursor<'r> {
    pub fn new(tree: &'r Value, registry: &'r PolymorphRegistry) -> Self {
        Self { registry, tree }
    }
    pub fn tree(&self) -> &Value {
        self.tree
    }
}
impl MappingData for ReadCursor<'_> {
    fn is_reading(&self) -> bool {
        true
    }
    fn map<T: FieldValue>(&mut self, key: &str, field: &mut T) -> Result<()> {
        *field = match self.tree.get(key) {
            Some(value) => T::read_value(value, self.registry).map_err(|e| e.at(key))?,
            None => T::absent().ok_or_else(|| MapperError::MissingField { field: key.to_string() })?,
        };
        Ok(())
    }
    fn map_or<T: FieldValue>(&mut self, key: &str, field: &mut T, default: T) -> Result<()> {
        *field = match self.tree.get(key) {
            None | Some(Value::Null) => default,
            Some(value) => T::read_value(value, self.registry).map_err(|e| e.at(key))?,
        };
        Ok(())
    }
    fn map_with<T, R: Transformation<T>>(&mut self, key: &str, field: &mut T, transformation: &R) -> Result<()> {
        let value = self
            .tree
            .get(key)
            .ok_or_else(|| MapperError::MissingField { field: key.to_string() })?;
        *field = transformation
            .transform_from(value)
            .ok_or_else(|| mismatch(std::any::type_name::<T>(), value).at(key))?;
        Ok(())
    }
    fn map_optional_with<T, R: Transformation<T>>(
        &mut self,
        key: &str,
        field: &mut Option<T>,
        transformation: &R,
    ) -> Result<()> {
        *field = match self.tree.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                transformation
                    .transform_from(value)
                    .ok_or_else(|| mismatch(std::any::type_name::<T>(), value).at(key))?,
            ),
        };
        Ok(())
    }
}

// ------------- Entry points -------------
/// Runs the description of a copy of `value` in write mode.
pub(crate) fn write_tree<T: Mappable>(value: &T, registry: &PolymorphRegistry) -> Value {
    let mut cursor = WriteCursor::new(registry);
    let mut copy = value.clone();
    if let Err(e) = copy.mapping(&mut cursor) {
        panic!("Mapping called for serialization cannot fail: {e}");
    }
    cursor.into_value()
}

/// Runs the description of a fresh `T` in read mode; the instance only
/// escapes once every field was read.
pub(crate) fn read_tree<T: Mappable>(tree: &Value, registry: &PolymorphRegistry) -> Result<T> {
    if tree.as_mapping().is_none() {
        return Err(mismatch("mapping", tree));
    }
    let mut cursor = ReadCursor::new(tree, registry);
    let mut value = T::default();
    value.mapping(&mut cursor)?;
    Ok(value)
}

// ------------- Mapper -------------
/// A mapping session. Owns the registry consulted for polymorphic fields.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    registry: Arc<PolymorphRegistry>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_registry(registry: Arc<PolymorphRegistry>) -> Self {
        Self { registry }
    }
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_registry(Arc::new(PolymorphRegistry::with_policy(settings.identity_policy)))
    }
    pub fn registry(&self) -> Arc<PolymorphRegistry> {
        Arc::clone(&self.registry)
    }
    pub fn write<T: Mappable>(&self, value: &T) -> Value {
        trace!(type_name = std::any::type_name::<T>(), "Writing");
        write_tree(value, &self.registry)
    }
    pub fn read<T: Mappable>(&self, tree: &Value) -> Result<T> {
        trace!(type_name = std::any::type_name::<T>(), "Reading");
        read_tree(tree, &self.registry).map_err(MapperError::at_root)
    }
    /// Like `write`, for roots that are not `Mappable` (sequences, maps, polymorphs).
    pub fn encode<T: FieldValue>(&self, value: &T) -> Value {
        value.write_value(&self.registry)
    }
    pub fn decode<T: FieldValue>(&self, tree: &Value) -> Result<T> {
        T::read_value(tree, &self.registry).map_err(MapperError::at_root)
    }
}

// ------------- Field values -------------
impl<T: Mappable> FieldValue for T {
    fn write_value(&self, registry: &PolymorphRegistry) -> Value {
        write_tree(self, registry)
    }
    fn read_value(value: &Value, registry: &PolymorphRegistry) -> Result<Self> {
        read_tree(value, registry)
    }
}

impl FieldValue for Value {
    fn write_value(&self, _registry: &PolymorphRegistry) -> Value {
        self.clone()
    }
    fn read_value(value: &Value, _registry: &PolymorphRegistry) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FieldValue for String {
    fn write_value(&self, _registry: &PolymorphRegistry) -> Value {
        Value::Text(self.clone())
    }
    fn read_value(value: &Value, _registry: &PolymorphRegistry) -> Result<Self> {
        value.as_text().map(str::to_string).ok_or_else(|| mismatch("text", value))
    }
}

impl FieldValue for bool {
    fn write_value(&self, _registry: &PolymorphRegistry) -> Value {
        Value::from(*self)
    }
    fn read_value(value: &Value, _registry: &PolymorphRegistry) -> Result<Self> {
        value.as_number().and_then(|n| n.as_bool()).ok_or_else(|| mismatch("bool", value))
    }
}

impl FieldValue for f64 {
    fn write_value(&self, _registry: &PolymorphRegistry) -> Value {
        Value::from(*self)
    }
    fn read_value(value: &Value, _registry: &PolymorphRegistry) -> Result<Self> {
        value.as_number().and_then(|n| n.as_f64()).ok_or_else(|| mismatch("f64", value))
    }
}

impl FieldValue for f32 {
    fn write_value(&self, _registry: &PolymorphRegistry) -> Value {
        Value::from(*self)
    }
    fn read_value(value: &Value, _registry: &PolymorphRegistry) -> Result<Self> {
        value
            .as_number()
            .and_then(|n| n.as_f64())
            .and_then(|d| {
                let narrowed = d as f32;
                // a finite double out of f32 range would become infinite
                (narrowed.is_finite() || !d.is_finite()).then_some(narrowed)
            })
            .ok_or_else(|| mismatch("f32", value))
    }
}

macro_rules! integer_field_value {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn write_value(&self, _registry: &PolymorphRegistry) -> Value {
                    // only huge unsigned values fall outside i64
                    match i64::try_from(*self) {
                        Ok(i) => Value::from(i),
                        Err(_) => panic!(
                            "Mapping called for serialization cannot fail: {} does not fit a number",
                            self
                        ),
                    }
                }
                fn read_value(value: &Value, _registry: &PolymorphRegistry) -> Result<Self> {
                    value
                        .as_number()
                        .and_then(|n| n.as_i64())
                        .and_then(|i| <$t>::try_from(i).ok())
                        .ok_or_else(|| mismatch(stringify!($t), value))
                }
            }
        )*
    };
}
integer_field_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: FieldValue> FieldValue for Option<T> {
    fn write_value(&self, registry: &PolymorphRegistry) -> Value {
        match self {
            Some(value) => value.write_value(registry),
            None => Value::Null,
        }
    }
    fn read_value(value: &Value, registry: &PolymorphRegistry) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::read_value(other, registry).map(Some),
        }
    }
    fn absent() -> Option<Self> {
        Some(None)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn write_value(&self, registry: &PolymorphRegistry) -> Value {
        Value::Sequence(self.iter().map(|v| v.write_value(registry)).collect())
    }
    fn read_value(value: &Value, registry: &PolymorphRegistry) -> Result<Self> {
        let values = value.as_sequence().ok_or_else(|| mismatch("sequence", value))?;
        values
            .iter()
            .enumerate()
            .map(|(i, v)| T::read_value(v, registry).map_err(|e| e.at(&format!("[{i}]"))))
            .collect()
    }
}

impl<T: FieldValue> FieldValue for HashMap<String, T> {
    fn write_value(&self, registry: &PolymorphRegistry) -> Value {
        Value::Mapping(self.iter().map(|(k, v)| (k.clone(), v.write_value(registry))).collect())
    }
    fn read_value(value: &Value, registry: &PolymorphRegistry) -> Result<Self> {
        let map = value.as_mapping().ok_or_else(|| mismatch("mapping", value))?;
        map.iter()
            .map(|(k, v)| T::read_value(v, registry).map(|v| (k.clone(), v)).map_err(|e| e.at(k)))
            .collect()
    }
}

impl<T: FieldValue> FieldValue for BTreeMap<String, T> {
    fn write_value(&self, registry: &PolymorphRegistry) -> Value {
        Value::Mapping(self.iter().map(|(k, v)| (k.clone(), v.write_value(registry))).collect())
    }
    fn read_value(value: &Value, registry: &PolymorphRegistry) -> Result<Self> {
        let map = value.as_mapping().ok_or_else(|| mismatch("mapping", value))?;
        map.iter()
            .map(|(k, v)| T::read_value(v, registry).map(|v| (k.clone(), v)).map_err(|e| e.at(k)))
            .collect()
    }
}
