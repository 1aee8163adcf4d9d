//! # testwire
//!
//! A compact, self-describing, text-based serialization format for moving
//! structured test metadata (test cases, classes, traits, exceptions) across
//! process and isolation boundaries with full type fidelity.
//!
//! - Every serialized value is a single line of text: `<tag>[?][[]]:<payload>`,
//!   where the tag is a stable integer from a closed catalogue, `?` marks a
//!   nullable declared type, `[]` marks an array, and a missing payload is a
//!   null value
//! - Arbitrary payload text (embedded colons, newlines, any Unicode) is made
//!   envelope-safe with base64, so no escaping grammar is needed
//! - Floating-point values travel as their IEEE-754 bit pattern and
//!   round-trip bit for bit, including NaN payloads and signed zero
//! - Arrays of any rank round-trip their per-dimension lengths and non-zero
//!   lower bounds exactly
//! - Composite objects serialize themselves as named field bags through the
//!   [`Serializable`] contract and recurse through the same pipeline
//! - Type identities travel as structured names (`Base,origin`, nested
//!   generic arguments, array rank groups) and are resolved on the far side
//!   through an injected [`TypeResolver`]
//!
//! ## Derive
//!
//! The companion derive macro generates the field-bag contract for structs
//! with named fields:
//!
//! - `#[testwire(name = "...")]` — overrides the serialized type name
//!   (defaults to the struct name)
//! - `#[testwire(origin = "...")]` — overrides the origin (defaults to the
//!   deriving crate's package name)
//! - `#[testwire(rename = "...")]` — stores a field under a different name
//! - `#[testwire(skip)]` — leaves a field out of serialization; it is reset
//!   to its default on deserialization
//!
//! Derived types must also be `Default`, `Clone`, and `Debug`.
//!
//! ## Feature flags
//!
//! - `uuid` — enables the `Uuid` kind backed by `uuid::Uuid`. The wire tag
//!   stays reserved either way: decoding a Uuid value without the feature
//!   fails with [`Error::KindNotEnabled`] rather than a parse error.
//!
//! ## Example
//!
//! ```rust
//! let text = testwire::serialize(&42i32).unwrap();
//! assert_eq!(text, "6:42");
//!
//! let value: i32 = testwire::deserialize(&text).unwrap();
//! assert_eq!(value, 42);
//!
//! // Null and empty string are distinct, and both round-trip.
//! let null = testwire::serialize(&None::<String>).unwrap();
//! let empty = testwire::serialize(&String::new()).unwrap();
//! assert_eq!(null, "0");
//! assert_eq!(empty, "0:");
//! ```

mod array;
mod escape;
mod index;
mod info;
mod registry;
mod serializer;
mod typename;
mod value;

use std::sync::OnceLock;

pub use testwire_derive::Serializable;

pub use crate::array::{ArrayValue, ElementType};
pub use crate::escape::{escape, unescape};
pub use crate::index::TypeIndex;
pub use crate::info::{Serializable, SerializableType, SerializationInfo};
pub use crate::registry::{
    IntKind, ResolvedType, TypeRegistry, TypeRegistryBuilder, TypeResolver,
};
pub use crate::serializer::Serializer;
pub use crate::typename::TypeName;
pub use crate::value::{
    EnumRepr, EnumValue, FromValue, Timestamp, ToValue, TraitMap, Value,
};

/// Errors raised while serializing or deserializing values.
///
/// Every message names the offending type or tag, so that mismatches
/// between differently configured processes can be root-caused from the
/// error text alone.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The declared type has no registry entry, no field-bag contract, and
    /// is not a type identity or enum.
    #[error("cannot serialize a value of type '{0}': unsupported type for serialization")]
    UnsupportedType(String),

    /// The type belongs to an origin that is not local to this process, so
    /// its identity cannot be assumed stable on the far side.
    #[error("cannot serialize type '{type_name}' because its origin '{origin}' is not local to this process")]
    NonPortableType { type_name: String, origin: String },

    /// The envelope's tag text is not a known type index.
    #[error("tried to deserialize unknown type index '{0}'")]
    UnknownTypeIndex(String),

    /// The tag is valid but support for its kind is not compiled into this
    /// build.
    #[error("cannot deserialize a value of kind '{0}': support is not enabled in this build")]
    KindNotEnabled(&'static str),

    /// A composite type resolved but has no registered constructor.
    #[error("could not deserialize type '{0}' because it lacks a parameterless constructor")]
    MissingConstructor(String),

    /// An embedded type name could not be resolved to a known type.
    #[error("serialized type name '{0}' could not be resolved to a known type")]
    UnresolvedType(String),

    /// A null value was serialized under a non-nullable declared type.
    #[error("cannot serialize a null value as type '{0}' because it's type-incompatible")]
    NullValueForType(String),

    /// The value's runtime type is not assignable to the declared type.
    #[error("cannot serialize a value of type '{actual}' as type '{declared}' because it's type-incompatible")]
    IncompatibleValue { actual: String, declared: String },

    /// The untyped kind carries only null values and arrays.
    #[error("cannot serialize a non-null value of type 'Object'")]
    UntypedValue,

    /// An enum value's supplied representation does not match its
    /// registered underlying storage kind.
    #[error("cannot serialize enum '{0}' because its underlying storage kind does not match the supplied value")]
    EnumReprMismatch(String),

    /// A structural violation in the serialized text: bad payload encoding,
    /// unparsable payloads, inconsistent array layout, malformed field
    /// entries.
    #[error("malformed serialized value: {0}")]
    Malformed(String),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Serializes a value through a shared serializer with no registered types.
///
/// Sufficient for the built-in kinds; values involving registered composite
/// or enum types need a [`Serializer`] built over a configured
/// [`TypeRegistry`].
pub fn serialize<T: ToValue>(value: &T) -> Result<String> {
    default_serializer().serialize_value(value)
}

/// Deserializes a value through a shared serializer with no registered
/// types.
///
/// See [`serialize`] for the limits of the shared serializer.
pub fn deserialize<T: FromValue>(text: &str) -> Result<T> {
    default_serializer().deserialize_as(text)
}

fn default_serializer() -> &'static Serializer {
    static INSTANCE: OnceLock<Serializer> = OnceLock::new();
    INSTANCE.get_or_init(Serializer::default)
}
