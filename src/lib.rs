//! Treemapper – a bidirectional mapping between typed values and a format-agnostic tree.
//!
//! Treemapper centers on the *value tree*: a closed, recursive tagged union
//! ([`value::Value`]) of
//! * `Null`,
//! * `Text`,
//! * `Number`, a [`value::Number`] that remembers whether it came from a bool,
//!   an integer or a double,
//! * `Sequence`, an ordered list of values,
//! * `Mapping`, an unordered map from string keys to values.
//!
//! Concrete wire formats only ever see the tree. Application types never see the
//! wire format.
//!
//! ## Modules
//! * [`value`] – The tree and its soft (never failing) accessors.
//! * [`mapping`] – The [`mapping::Mappable`] contract, the two cursors and the
//!   [`mapping::Mapper`] session.
//! * [`polymorph`] – Polymorphic hierarchies and the [`polymorph::PolymorphRegistry`]
//!   resolving a concrete subtype from a discriminator.
//! * [`transform`] – Field-level transformations (dates).
//! * [`json`] – JSON bytes to and from a tree.
//! * [`config`] – Settings and logging setup.
//!
//! ## Mapping
//! A type implements [`mapping::Mappable`] once, describing each of its fields
//! against a [`mapping::MappingData`] cursor. Writing runs the description on a copy
//! of the value against a cursor that only accumulates, and cannot fail. Reading runs
//! it on a fresh default instance against a cursor that looks fields up, and stops at
//! the first field that is missing or has the wrong shape. A partially read value is
//! never handed out.
//!
//! ## Polymorphism
//! A field declared as [`polymorph::Polymorph<B>`] holds any registered subtype of
//! `B`. Writing adds the concrete type's discriminator `(name, key)` to its fields.
//! Reading looks for a discriminator among the keys of `B`'s hierarchy and asks the
//! registry which concrete type it names. The registry builds its caches per base
//! type on first use under one lock, and rejects hierarchies where two types share
//! a `(name, key)` pair.
//!
//! ## Quick Start
//! ```
//! use treemapper::{Mappable, MappingData, Mapper, Result, json::JsonSerializer};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Person { name: String, age: u32 }
//!
//! impl Mappable for Person {
//!     fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()> {
//!         data.map("name", &mut self.name)?;
//!         data.map("age", &mut self.age)
//!     }
//! }
//!
//! let mapper = Mapper::new();
//! let json = JsonSerializer::new();
//! let alice = Person { name: "Alice".into(), age: 30 };
//! let bytes = json.serialize_object(&mapper, &alice).unwrap();
//! let back: Person = json.deserialize_object(&mapper, &bytes).unwrap();
//! assert_eq!(back, alice);
//! ```

pub mod config;
pub mod error;
pub mod json;
pub mod mapping;
pub mod polymorph;
pub mod transform;
pub mod value;

pub use error::{MapperError, Result};
pub use mapping::{FieldValue, Mappable, Mapper, MappingData, ReadCursor, WriteCursor};
pub use polymorph::{
    IdentityPolicy, Polymorph, PolymorphRegistry, PolymorphType, Polymorphic, PolymorphicInfo, PolymorphicValue,
};
pub use transform::Transformation;
pub use value::{Number, Value};
