use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use rust_decimal::Decimal;
#[cfg(feature = "uuid")]
use uuid::Uuid;

use crate::array::{ArrayValue, ElementType};
use crate::index::TypeIndex;
use crate::info::Serializable;
use crate::typename::TypeName;
use crate::{Error, Result};

/// A dynamically typed value moving through the codec.
///
/// There is one variant per built-in kind plus the four special kinds.
/// Null is represented as `Option<Value>` at every API boundary, never as a
/// variant of its own.
#[derive(Debug)]
pub enum Value {
    String(String),
    Char(char),
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Bool(bool),
    DateTime(Timestamp),
    DateTimeOffset(DateTime<FixedOffset>),
    Duration(chrono::Duration),
    BigInt(BigInt),
    Date(NaiveDate),
    Time(NaiveTime),
    #[cfg(feature = "uuid")]
    Uuid(Uuid),
    /// A type identity.
    Type(TypeName),
    /// A constant of a registered enum type.
    Enum(EnumValue),
    /// A composite object speaking the field-bag contract.
    Object(Box<dyn Serializable>),
    /// The trait dictionary used for test metadata tagging.
    TraitMap(TraitMap),
    /// An array of any rank, possibly with non-zero lower bounds.
    Array(ArrayValue),
}

impl Value {
    /// Human-readable kind name, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self.scalar_index() {
            Some(idx) => idx.kind_name(),
            None => "array",
        }
    }

    /// The type index of a non-array value; arrays have no scalar index of
    /// their own (their kind lives on the element type).
    pub(crate) fn scalar_index(&self) -> Option<TypeIndex> {
        let idx = match self {
            Value::String(_) => TypeIndex::String,
            Value::Char(_) => TypeIndex::Char,
            Value::U8(_) => TypeIndex::U8,
            Value::I8(_) => TypeIndex::I8,
            Value::I16(_) => TypeIndex::I16,
            Value::U16(_) => TypeIndex::U16,
            Value::I32(_) => TypeIndex::I32,
            Value::U32(_) => TypeIndex::U32,
            Value::I64(_) => TypeIndex::I64,
            Value::U64(_) => TypeIndex::U64,
            Value::F32(_) => TypeIndex::F32,
            Value::F64(_) => TypeIndex::F64,
            Value::Decimal(_) => TypeIndex::Decimal,
            Value::Bool(_) => TypeIndex::Bool,
            Value::DateTime(_) => TypeIndex::DateTime,
            Value::DateTimeOffset(_) => TypeIndex::DateTimeOffset,
            Value::Duration(_) => TypeIndex::Duration,
            Value::BigInt(_) => TypeIndex::BigInt,
            Value::Date(_) => TypeIndex::Date,
            Value::Time(_) => TypeIndex::Time,
            #[cfg(feature = "uuid")]
            Value::Uuid(_) => TypeIndex::Uuid,
            Value::Type(_) => TypeIndex::Type,
            Value::Enum(_) => TypeIndex::Enum,
            Value::Object(_) => TypeIndex::Serializable,
            Value::TraitMap(_) => TypeIndex::TraitMap,
            Value::Array(_) => return None,
        };
        Some(idx)
    }
}

/// A point in time as carried by the `DateTime` kind.
///
/// The wire text is ISO-8601; a trailing `Z` is the only signal that the
/// value is UTC, and its absence means the value carries no zone at all.
/// Offset-bearing values belong to the `DateTimeOffset` kind instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Utc(DateTime<Utc>),
    Unzoned(NaiveDateTime),
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::Unzoned(NaiveDateTime::default())
    }
}

/// A constant of an enum type, carried as the type identity plus the
/// underlying integer representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    ty: TypeName,
    repr: EnumRepr,
}

/// The underlying integer of an [`EnumValue`], widened to 64 bits with the
/// signedness of the enum's storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumRepr {
    Signed(i64),
    Unsigned(u64),
}

impl EnumValue {
    /// A constant of an enum with a signed storage type.
    pub fn signed(ty: TypeName, value: i64) -> EnumValue {
        EnumValue {
            ty,
            repr: EnumRepr::Signed(value),
        }
    }

    /// A constant of an enum with an unsigned storage type.
    pub fn unsigned(ty: TypeName, value: u64) -> EnumValue {
        EnumValue {
            ty,
            repr: EnumRepr::Unsigned(value),
        }
    }

    pub fn ty(&self) -> &TypeName {
        &self.ty
    }

    pub fn repr(&self) -> EnumRepr {
        self.repr
    }
}

/// An insertion-ordered, case-insensitive multimap from trait names to
/// ordered sets of values.
///
/// Lookup ignores key casing; the casing of the first insertion is the one
/// preserved on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraitMap {
    entries: IndexMap<String, IndexSet<String>>,
}

impl TraitMap {
    pub fn new() -> TraitMap {
        TraitMap::default()
    }

    /// Adds a value under the given trait name.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.canonical_key(&key) {
            Some(existing) => {
                let existing = existing.to_owned();
                self.entries
                    .entry(existing)
                    .or_default()
                    .insert(value.into());
            }
            None => {
                self.entries.entry(key).or_default().insert(value.into());
            }
        }
    }

    /// The values recorded under a trait name, ignoring case.
    pub fn get(&self, key: &str) -> Option<&IndexSet<String>> {
        let key = self.canonical_key(key)?;
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.canonical_key(key).is_some()
    }

    /// Trait names in insertion order, with their original casing.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexSet<String>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn canonical_key(&self, key: &str) -> Option<&str> {
        self.entries
            .keys()
            .find(|candidate| caseless_eq(candidate, key))
            .map(String::as_str)
    }
}

fn caseless_eq(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Conversion of a typed Rust value into the dynamic [`Value`] model,
/// together with its statically declared type.
///
/// Implemented for every built-in kind, `Option<T>`, `Vec<T>` (rank-1
/// arrays), and generated for composite types by
/// `#[derive(Serializable)]`.
pub trait ToValue {
    /// The dynamic value, or `None` for null.
    fn to_value(&self) -> Option<Value>;

    /// The declared type used when serializing values of this Rust type.
    fn declared_type() -> TypeName;

    /// The element descriptor used when values of this Rust type appear as
    /// array elements.
    fn element_kind() -> ElementType;
}

/// Conversion of a dynamic [`Value`] back into a typed Rust value.
pub trait FromValue: Sized {
    /// Converts a present value; fails when the kinds do not line up.
    fn from_value(value: Value) -> Result<Self>;

    /// The result of reading a null or absent field.
    fn missing() -> Result<Self>;
}

pub(crate) fn kind_mismatch(expected: &str, got: &Value) -> Error {
    Error::Malformed(format!(
        "expected a value of kind '{}', got '{}'",
        expected,
        got.kind_name()
    ))
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident;)*) => {$(
        impl ToValue for $ty {
            fn to_value(&self) -> Option<Value> {
                Some(Value::$variant(self.clone()))
            }

            fn declared_type() -> TypeName {
                TypeName::intrinsic(TypeIndex::$variant.intrinsic_name())
            }

            fn element_kind() -> ElementType {
                ElementType::of(TypeIndex::$variant)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(kind_mismatch(TypeIndex::$variant.kind_name(), &other)),
                }
            }

            fn missing() -> Result<Self> {
                Ok(Default::default())
            }
        }
    )*};
}

impl_value_conversions! {
    String => String;
    char => Char;
    u8 => U8;
    i8 => I8;
    i16 => I16;
    u16 => U16;
    i32 => I32;
    u32 => U32;
    i64 => I64;
    u64 => U64;
    f32 => F32;
    f64 => F64;
    Decimal => Decimal;
    bool => Bool;
    Timestamp => DateTime;
    BigInt => BigInt;
    NaiveDate => Date;
    NaiveTime => Time;
    TraitMap => TraitMap;
}

impl ToValue for chrono::Duration {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Duration(*self))
    }

    fn declared_type() -> TypeName {
        TypeName::intrinsic(TypeIndex::Duration.intrinsic_name())
    }

    fn element_kind() -> ElementType {
        ElementType::of(TypeIndex::Duration)
    }
}

impl FromValue for chrono::Duration {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Duration(d) => Ok(d),
            other => Err(kind_mismatch("Duration", &other)),
        }
    }

    fn missing() -> Result<Self> {
        Ok(chrono::Duration::zero())
    }
}

impl ToValue for TypeName {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Type(self.clone()))
    }

    fn declared_type() -> TypeName {
        TypeName::intrinsic(TypeIndex::Type.intrinsic_name())
    }

    fn element_kind() -> ElementType {
        ElementType::of(TypeIndex::Type)
    }
}

impl FromValue for TypeName {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Type(name) => Ok(name),
            other => Err(kind_mismatch("Type", &other)),
        }
    }

    fn missing() -> Result<Self> {
        Ok(TypeName::intrinsic(TypeIndex::Object.intrinsic_name()))
    }
}

#[cfg(feature = "uuid")]
impl_value_conversions! {
    Uuid => Uuid;
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Option<Value> {
        Some(Value::DateTime(Timestamp::Utc(*self)))
    }

    fn declared_type() -> TypeName {
        TypeName::intrinsic(TypeIndex::DateTime.intrinsic_name())
    }

    fn element_kind() -> ElementType {
        ElementType::of(TypeIndex::DateTime)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(Timestamp::Utc(dt)) => Ok(dt),
            other => Err(kind_mismatch("DateTime (UTC)", &other)),
        }
    }

    fn missing() -> Result<Self> {
        Ok(Default::default())
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Option<Value> {
        Some(Value::DateTime(Timestamp::Unzoned(*self)))
    }

    fn declared_type() -> TypeName {
        TypeName::intrinsic(TypeIndex::DateTime.intrinsic_name())
    }

    fn element_kind() -> ElementType {
        ElementType::of(TypeIndex::DateTime)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(Timestamp::Unzoned(dt)) => Ok(dt),
            other => Err(kind_mismatch("DateTime (unzoned)", &other)),
        }
    }

    fn missing() -> Result<Self> {
        Ok(Default::default())
    }
}

impl ToValue for DateTime<FixedOffset> {
    fn to_value(&self) -> Option<Value> {
        Some(Value::DateTimeOffset(*self))
    }

    fn declared_type() -> TypeName {
        TypeName::intrinsic(TypeIndex::DateTimeOffset.intrinsic_name())
    }

    fn element_kind() -> ElementType {
        ElementType::of(TypeIndex::DateTimeOffset)
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTimeOffset(dt) => Ok(dt),
            other => Err(kind_mismatch("DateTimeOffset", &other)),
        }
    }

    fn missing() -> Result<Self> {
        use chrono::Offset as _;
        Ok(DateTime::from_naive_utc_and_offset(
            NaiveDateTime::default(),
            Utc.fix(),
        ))
    }
}

/// An `Option<T>` declares the nullable wrapper only for value kinds; the
/// reference kinds admit null as they are.
impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Option<Value> {
        self.as_ref().and_then(T::to_value)
    }

    fn declared_type() -> TypeName {
        let inner = T::declared_type();
        if T::element_kind().index().is_reference_kind() || inner.is_array() {
            inner
        } else {
            TypeName::optional(inner)
        }
    }

    fn element_kind() -> ElementType {
        let kind = T::element_kind();
        if kind.index().is_reference_kind() {
            kind
        } else {
            kind.nullable()
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Some)
    }

    fn missing() -> Result<Self> {
        Ok(None)
    }
}

/// A `Vec<T>` maps to a rank-1, zero-based array of `T`'s kind. A vector of
/// vectors declares itself as an array of untyped elements, since a typed
/// declared array of arrays is not expressible on the wire.
impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Option<Value> {
        let elements = self.iter().map(T::to_value).collect();
        Some(Value::Array(ArrayValue::vector_unchecked(
            T::element_kind(),
            elements,
        )))
    }

    fn declared_type() -> TypeName {
        let inner = T::declared_type();
        if inner.is_array() {
            TypeName::intrinsic(TypeIndex::Object.intrinsic_name()).array_of(1)
        } else {
            inner.array_of(1)
        }
    }

    fn element_kind() -> ElementType {
        ElementType::of(TypeIndex::Object)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        let array = match value {
            Value::Array(array) => array,
            other => Err(kind_mismatch("array", &other))?,
        };
        if array.rank() != 1 {
            return Err(Error::Malformed(format!(
                "expected a rank-1 array, got rank {}",
                array.rank()
            )));
        }
        array
            .into_elements()
            .into_iter()
            .map(|element| match element {
                Some(value) => T::from_value(value),
                None => T::missing(),
            })
            .collect()
    }

    fn missing() -> Result<Self> {
        Ok(Vec::new())
    }
}
