use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Missing field: {field}")]
    MissingField { field: String },
    #[error("Type mismatch at {field}: expected {expected}, found {found}")]
    TypeMismatch { field: String, expected: &'static str, found: &'static str },
    #[error("Unresolvable polymorphic type for {base}: no subtype named {name:?} under key {key:?}")]
    UnresolvablePolymorphicType { base: &'static str, key: String, name: Option<String> },
    #[error("Ambiguous discriminator in {base}: {first} and {second} cannot share name {name:?} and key {key:?}")]
    AmbiguousDiscriminator {
        base: &'static str,
        name: String,
        key: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("Failed to decode {path}: {source}")]
    NestedDecodeFailure { path: String, #[source] source: Box<MapperError> },
    #[error("{type_name} does not override its polymorphic info and cannot be used as a base type")]
    NonPolymorphicRoot { type_name: &'static str },
    #[error("Config error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;

// path of the tree handed to a read
pub const ROOT: &str = "$";

impl MapperError {
    /// Attaches a field name to an error coming out of a field decoder.
    ///
    /// Leaf errors that were raised without knowing their field get it filled in,
    /// everything else is wrapped so the path to the failing field is preserved.
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            Self::TypeMismatch { field, expected, found } if field.is_empty() => {
                Self::TypeMismatch { field: segment.to_string(), expected, found }
            }
            Self::MissingField { field } if field.is_empty() => {
                Self::MissingField { field: segment.to_string() }
            }
            other => Self::NestedDecodeFailure { path: segment.to_string(), source: Box::new(other) },
        }
    }

    /// Names the root of a read for errors raised before any field was entered.
    pub(crate) fn at_root(self) -> Self {
        match self {
            Self::TypeMismatch { field, expected, found } if field.is_empty() => {
                Self::TypeMismatch { field: ROOT.to_string(), expected, found }
            }
            other => other,
        }
    }

    /// Dotted path from the root of the read to the failing field, if known.
    pub fn path(&self) -> Option<String> {
        match self {
            Self::NestedDecodeFailure { path, source } => Some(match source.path() {
                Some(rest) if rest.starts_with('[') => format!("{path}{rest}"),
                Some(rest) => format!("{path}.{rest}"),
                None => path.clone(),
            }),
            Self::MissingField { field } | Self::TypeMismatch { field, .. } if !field.is_empty() => {
                Some(field.clone())
            }
            _ => None,
        }
    }

    /// The innermost error once every `NestedDecodeFailure` layer is peeled off.
    pub fn root_cause(&self) -> &MapperError {
        match self {
            Self::NestedDecodeFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

// Helper conversions
impl From<::config::ConfigError> for MapperError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for MapperError {
    fn from(e: serde_json::Error) -> Self { Self::Serialization(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for MapperError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_are_joined() {
        let leaf = MapperError::MissingField { field: String::new() }.at("name");
        let err = leaf.at("[2]").at("owners").at("pet");
        assert_eq!(err.path().as_deref(), Some("pet.owners[2].name"));
        assert!(matches!(err.root_cause(), MapperError::MissingField { field } if field == "name"));
    }

    #[test]
    fn leaf_errors_take_the_field_name() {
        let err = MapperError::TypeMismatch { field: String::new(), expected: "text", found: "null" }.at("x");
        assert!(matches!(err, MapperError::TypeMismatch { ref field, .. } if field == "x"));
        assert_eq!(err.path().as_deref(), Some("x"));
    }
}
