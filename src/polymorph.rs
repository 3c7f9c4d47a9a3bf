//! Polymorphic hierarchies and the registry that resolves them.
//!
//! A type takes part in polymorphic resolution by implementing [`Polymorphic`].
//! Every such type has a discriminator *name* (the value expected in the data) and
//! a discriminator *key* (the field holding that value). A type that overrides
//! [`Polymorphic::polymorphic_info`] declares its own name and may register
//! subtypes, which makes it the root of a hierarchy. Types that do not override it
//! fall back to their short Rust type name and have no subtypes.
//!
//! The [`PolymorphRegistry`] caches, per type, its own `(name, key)`, the set of
//! keys reachable in its hierarchy, and a `name -> key -> type` lookup. The caches
//! are built on first query, never shrink, and are guarded by a single mutex held
//! for the whole query, including any recursive population it triggers.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Mutex;

use seahash::SeaHasher;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::error::{MapperError, Result};
use crate::mapping::{FieldValue, Mappable, mismatch, read_tree, write_tree};
use crate::value::Value;

pub const DEFAULT_POLYMORPHIC_KEY: &str = "type";

// the caches are keyed by TypeId, so a fast non-cryptographic hasher will do
pub type TypeHasher = BuildHasherDefault<SeaHasher>;

pub trait Polymorphic: Mappable + fmt::Debug + Send + Sync + 'static {
    /// Field holding the discriminator.
    fn polymorphic_key() -> &'static str {
        DEFAULT_POLYMORPHIC_KEY
    }
    /// `None` means the type does not override its polymorphic identity.
    fn polymorphic_info() -> Option<PolymorphicInfo> {
        None
    }
    fn default_name() -> String {
        short_type_name(std::any::type_name::<Self>())
    }
}

fn short_type_name(full: &'static str) -> String {
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path).to_string()
}

// ------------- PolymorphicInfo -------------
#[derive(Clone, Debug)]
pub struct PolymorphicInfo {
    name: String,
    subtypes: Vec<PolymorphType>,
}
impl PolymorphicInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subtypes: Vec::new(),
        }
    }
    pub fn register<S: Polymorphic>(mut self) -> Self {
        self.subtypes.push(PolymorphType::of::<S>());
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn subtypes(&self) -> &[PolymorphType] {
        &self.subtypes
    }
}

// ------------- PolymorphType -------------
type Decoder = fn(&Value, &PolymorphRegistry) -> Result<Box<dyn PolymorphicValue>>;

/// A stable handle for a registered type. Identity is the `TypeId`; the
/// remaining fields are the type's static hooks captured at registration.
#[derive(Clone, Copy)]
pub struct PolymorphType {
    id: TypeId,
    type_name: &'static str,
    key: fn() -> &'static str,
    info: fn() -> Option<PolymorphicInfo>,
    default_name: fn() -> String,
    decode: Decoder,
}
impl PolymorphType {
    pub fn of<T: Polymorphic>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            key: T::polymorphic_key,
            info: T::polymorphic_info,
            default_name: T::default_name,
            decode: decode_boxed::<T>,
        }
    }
    pub fn id(&self) -> TypeId {
        self.id
    }
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
    pub fn key(&self) -> &'static str {
        (self.key)()
    }
    pub fn info(&self) -> Option<PolymorphicInfo> {
        (self.info)()
    }
    pub fn default_name(&self) -> String {
        (self.default_name)()
    }
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
    pub(crate) fn decode(&self, tree: &Value, registry: &PolymorphRegistry) -> Result<Box<dyn PolymorphicValue>> {
        (self.decode)(tree, registry)
    }
}
impl PartialEq for PolymorphType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for PolymorphType {}
impl Hash for PolymorphType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl fmt::Debug for PolymorphType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PolymorphType({})", self.type_name)
    }
}
impl fmt::Display for PolymorphType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

fn decode_boxed<T: Polymorphic>(tree: &Value, registry: &PolymorphRegistry) -> Result<Box<dyn PolymorphicValue>> {
    Ok(Box::new(read_tree::<T>(tree, registry)?))
}

// ------------- PolymorphicValue -------------
/// Object-safe view of any polymorphic value, used to hold a concrete subtype
/// behind its declared base.
pub trait PolymorphicValue: Any + fmt::Debug + Send + Sync {
    fn polymorph_type(&self) -> PolymorphType;
    fn write_fields(&self, registry: &PolymorphRegistry) -> Value;
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn PolymorphicValue>;
}
impl<T: Polymorphic> PolymorphicValue for T {
    fn polymorph_type(&self) -> PolymorphType {
        PolymorphType::of::<T>()
    }
    fn write_fields(&self, registry: &PolymorphRegistry) -> Value {
        write_tree(self, registry)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn clone_boxed(&self) -> Box<dyn PolymorphicValue> {
        Box::new(self.clone())
    }
}

// ------------- Polymorph -------------
/// A field declared as the polymorphic base `B`, holding whichever concrete
/// subtype was written or resolved.
pub struct Polymorph<B: Polymorphic> {
    value: Box<dyn PolymorphicValue>,
    base: PhantomData<fn() -> B>,
}
impl<B: Polymorphic> Polymorph<B> {
    pub fn new<T: Polymorphic>(value: T) -> Self {
        Self {
            value: Box::new(value),
            base: PhantomData,
        }
    }
    pub fn polymorph_type(&self) -> PolymorphType {
        self.value.polymorph_type()
    }
    pub fn is<T: Polymorphic>(&self) -> bool {
        self.polymorph_type().is::<T>()
    }
    pub fn downcast_ref<T: Polymorphic>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }
    pub fn into_inner(self) -> Box<dyn PolymorphicValue> {
        self.value
    }
}
impl<B: Polymorphic> Default for Polymorph<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}
impl<B: Polymorphic> Clone for Polymorph<B> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone_boxed(),
            base: PhantomData,
        }
    }
}
impl<B: Polymorphic> fmt::Debug for Polymorph<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

impl<B: Polymorphic> FieldValue for Polymorph<B> {
    fn write_value(&self, registry: &PolymorphRegistry) -> Value {
        let ty = self.value.polymorph_type();
        let (name, key) = registry
            .name_and_key(ty)
            .unwrap_or_else(|e| panic!("Mapping called for serialization cannot fail: {e}"));
        let mut tree = self.value.write_fields(registry);
        tree.insert(key, Value::Text(name));
        tree
    }
    fn read_value(tree: &Value, registry: &PolymorphRegistry) -> Result<Self> {
        let base = PolymorphType::of::<B>();
        let map = tree.as_mapping().ok_or_else(|| mismatch("mapping", tree))?;
        let (_, base_key) = registry.name_and_key(base)?;
        let keys = registry.keys(base)?;
        // the base's own key is the most likely discriminator, so it goes first
        let candidates = std::iter::once(base_key.clone()).chain(keys.into_iter().filter(|k| *k != base_key));
        let mut discriminator = None;
        for key in candidates {
            let Some(name) = map.get(&key).and_then(Value::as_text) else {
                continue;
            };
            if let Some(ty) = registry.type_for(base, name, &key)? {
                debug!(base = base.type_name(), resolved = ty.type_name(), name, key = %key, "Resolved polymorphic type");
                return Ok(Self {
                    value: ty.decode(tree, registry)?,
                    base: PhantomData,
                });
            }
            discriminator.get_or_insert_with(|| name.to_string());
        }
        Err(MapperError::UnresolvablePolymorphicType {
            base: base.type_name(),
            key: base_key,
            name: discriminator,
        })
    }
}

// ------------- Registry -------------
/// What to do when a type that never overrode its identity is queried as the
/// root of a hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityPolicy {
    #[default]
    Warn,
    Deny,
}

type NameKeyLookup = HashMap<String, HashMap<String, PolymorphType>>;

#[derive(Debug, Default)]
struct Caches {
    name_and_key: HashMap<TypeId, (String, String), TypeHasher>,
    keys: HashMap<TypeId, BTreeSet<String>, TypeHasher>,
    lookup: HashMap<TypeId, NameKeyLookup, TypeHasher>,
}
impl Caches {
    fn contains(&self, id: &TypeId) -> bool {
        self.name_and_key.contains_key(id)
    }
    fn extend(&mut self, other: Caches) {
        self.name_and_key.extend(other.name_and_key);
        self.keys.extend(other.keys);
        self.lookup.extend(other.lookup);
    }
}

#[derive(Debug, Default)]
pub struct PolymorphRegistry {
    caches: Mutex<Caches>,
    policy: IdentityPolicy,
}

impl PolymorphRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_policy(policy: IdentityPolicy) -> Self {
        Self {
            caches: Mutex::new(Caches::default()),
            policy,
        }
    }
    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// The discriminator of `ty` itself. Also used while writing, where `ty` is
    /// a concrete value's type and need not be a root.
    pub fn name_and_key(&self, ty: PolymorphType) -> Result<(String, String)> {
        let mut caches = self.caches.lock()?;
        self.cache(&mut caches, ty, false)?;
        caches
            .name_and_key
            .get(&ty.id())
            .cloned()
            .ok_or_else(|| MapperError::Invariant(format!("no cached name and key for {}", ty)))
    }

    /// Every discriminator key reachable from `ty`.
    pub fn keys(&self, ty: PolymorphType) -> Result<BTreeSet<String>> {
        let mut caches = self.caches.lock()?;
        self.cache(&mut caches, ty, true)?;
        caches
            .keys
            .get(&ty.id())
            .cloned()
            .ok_or_else(|| MapperError::Invariant(format!("no cached keys for {}", ty)))
    }

    pub fn type_for(&self, base: PolymorphType, name: &str, key: &str) -> Result<Option<PolymorphType>> {
        let mut caches = self.caches.lock()?;
        self.cache(&mut caches, base, true)?;
        Ok(caches
            .lookup
            .get(&base.id())
            .and_then(|by_name| by_name.get(name))
            .and_then(|by_key| by_key.get(key))
            .copied())
    }

    pub fn name_and_key_of<T: Polymorphic>(&self) -> Result<(String, String)> {
        self.name_and_key(PolymorphType::of::<T>())
    }
    pub fn keys_of<T: Polymorphic>(&self) -> Result<BTreeSet<String>> {
        self.keys(PolymorphType::of::<T>())
    }
    pub fn type_for_of<B: Polymorphic>(&self, name: &str, key: &str) -> Result<Option<PolymorphType>> {
        self.type_for(PolymorphType::of::<B>(), name, key)
    }

    fn cache(&self, caches: &mut Caches, ty: PolymorphType, as_root: bool) -> Result<()> {
        if as_root && ty.info().is_none() {
            match self.policy {
                IdentityPolicy::Warn => warn!(
                    type_name = ty.type_name(),
                    "Type does not override its polymorphic info, using it as a base type is in most cases a programming error"
                ),
                IdentityPolicy::Deny => {
                    return Err(MapperError::NonPolymorphicRoot { type_name: ty.type_name() });
                }
            }
        }
        if caches.contains(&ty.id()) {
            return Ok(());
        }
        // nothing is committed unless the whole hierarchy merged cleanly
        let mut staged = Caches::default();
        if let Err(e) = build(caches, &mut staged, ty) {
            error!(base = ty.type_name(), error = %e, "Polymorphic registration is inconsistent");
            return Err(e);
        }
        debug!(base = ty.type_name(), types = staged.name_and_key.len(), "Cached polymorphic hierarchy");
        caches.extend(staged);
        Ok(())
    }
}

fn build(committed: &Caches, staged: &mut Caches, ty: PolymorphType) -> Result<()> {
    let id = ty.id();
    let info = ty.info();
    let name = match &info {
        Some(info) => info.name().to_string(),
        None => ty.default_name(),
    };
    let key = ty.key().to_string();

    // staged before recursing, so registration cycles terminate
    staged.name_and_key.insert(id, (name.clone(), key.clone()));
    staged.keys.insert(id, BTreeSet::from([key.clone()]));
    staged.lookup.insert(id, HashMap::from([(name, HashMap::from([(key, ty)]))]));

    if let Some(info) = info {
        for subtype in info.subtypes() {
            if !committed.contains(&subtype.id()) && !staged.contains(&subtype.id()) {
                build(committed, staged, *subtype)?;
            }
            merge(committed, staged, ty, *subtype)?;
        }
    }
    Ok(())
}

fn merge(committed: &Caches, staged: &mut Caches, ty: PolymorphType, subtype: PolymorphType) -> Result<()> {
    let sub_id = subtype.id();
    let sub_keys = staged
        .keys
        .get(&sub_id)
        .or_else(|| committed.keys.get(&sub_id))
        .cloned()
        .unwrap_or_default();
    let sub_lookup = staged
        .lookup
        .get(&sub_id)
        .or_else(|| committed.lookup.get(&sub_id))
        .cloned()
        .unwrap_or_default();

    staged.keys.entry(ty.id()).or_default().extend(sub_keys);
    let lookup = staged.lookup.entry(ty.id()).or_default();
    for (name, by_key) in sub_lookup {
        let entry = lookup.entry(name.clone()).or_default();
        for (key, castable) in by_key {
            match entry.get(&key) {
                Some(existing) if *existing != castable => {
                    return Err(MapperError::AmbiguousDiscriminator {
                        base: ty.type_name(),
                        name,
                        key,
                        first: existing.type_name(),
                        second: castable.type_name(),
                    });
                }
                Some(_) => {}
                None => {
                    entry.insert(key, castable);
                }
            }
        }
    }
    Ok(())
}
