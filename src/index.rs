/// Type indices used in the envelope format.
///
/// Every serialized value starts with one of these tags, written as its
/// decimal integer. The assignments are stable and part of the wire format:
/// two processes exchanging serialized values must agree on them exactly.
///
/// Negative tags are the special kinds (type identities, composite objects,
/// enum constants, trait maps, and the untyped null/array-only marker);
/// non-negative tags are the built-in value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum TypeIndex {
    /// A type identity, carried as its serialized type name.
    Type = -5,
    /// Any value implementing the [`Serializable`](crate::Serializable)
    /// field-bag contract.
    Serializable = -4,
    /// A constant of a registered enum type.
    Enum = -3,
    /// The trait dictionary used for test metadata tagging.
    TraitMap = -2,
    /// Untyped values: only null and arrays.
    Object = -1,

    String = 0,
    Char = 1,
    U8 = 2,
    I8 = 3,
    I16 = 4,
    U16 = 5,
    I32 = 6,
    U32 = 7,
    I64 = 8,
    U64 = 9,
    F32 = 10,
    F64 = 11,
    Decimal = 12,
    Bool = 13,
    DateTime = 14,
    DateTimeOffset = 15,
    Duration = 16,
    BigInt = 17,
    Date = 18,
    Time = 19,
    /// Requires the `uuid` cargo feature; the tag itself is always valid.
    Uuid = 20,
}

impl TypeIndex {
    /// Smallest valid wire tag.
    pub const MIN: i32 = -5;
    /// Largest valid wire tag.
    pub const MAX: i32 = 20;

    /// Looks up the index for a wire tag, or `None` when the tag is outside
    /// the valid range.
    pub fn from_wire(tag: i32) -> Option<TypeIndex> {
        let idx = match tag {
            -5 => TypeIndex::Type,
            -4 => TypeIndex::Serializable,
            -3 => TypeIndex::Enum,
            -2 => TypeIndex::TraitMap,
            -1 => TypeIndex::Object,
            0 => TypeIndex::String,
            1 => TypeIndex::Char,
            2 => TypeIndex::U8,
            3 => TypeIndex::I8,
            4 => TypeIndex::I16,
            5 => TypeIndex::U16,
            6 => TypeIndex::I32,
            7 => TypeIndex::U32,
            8 => TypeIndex::I64,
            9 => TypeIndex::U64,
            10 => TypeIndex::F32,
            11 => TypeIndex::F64,
            12 => TypeIndex::Decimal,
            13 => TypeIndex::Bool,
            14 => TypeIndex::DateTime,
            15 => TypeIndex::DateTimeOffset,
            16 => TypeIndex::Duration,
            17 => TypeIndex::BigInt,
            18 => TypeIndex::Date,
            19 => TypeIndex::Time,
            20 => TypeIndex::Uuid,
            _ => return None,
        };
        Some(idx)
    }

    /// The integer written on the wire.
    pub fn as_wire(self) -> i32 {
        self as i8 as i32
    }

    /// Whether the kind admits null without an explicit nullable marker.
    pub fn is_reference_kind(self) -> bool {
        matches!(
            self,
            TypeIndex::String
                | TypeIndex::Type
                | TypeIndex::Serializable
                | TypeIndex::TraitMap
                | TypeIndex::Object
        )
    }

    /// Human-readable kind name, used in error messages.
    pub fn kind_name(self) -> &'static str {
        match self {
            TypeIndex::Type => "Type",
            TypeIndex::Serializable => "Serializable",
            TypeIndex::Enum => "Enum",
            TypeIndex::TraitMap => "TraitMap",
            TypeIndex::Object => "Object",
            TypeIndex::String => "String",
            TypeIndex::Char => "char",
            TypeIndex::U8 => "u8",
            TypeIndex::I8 => "i8",
            TypeIndex::I16 => "i16",
            TypeIndex::U16 => "u16",
            TypeIndex::I32 => "i32",
            TypeIndex::U32 => "u32",
            TypeIndex::I64 => "i64",
            TypeIndex::U64 => "u64",
            TypeIndex::F32 => "f32",
            TypeIndex::F64 => "f64",
            TypeIndex::Decimal => "Decimal",
            TypeIndex::Bool => "bool",
            TypeIndex::DateTime => "DateTime",
            TypeIndex::DateTimeOffset => "DateTimeOffset",
            TypeIndex::Duration => "Duration",
            TypeIndex::BigInt => "BigInt",
            TypeIndex::Date => "Date",
            TypeIndex::Time => "Time",
            TypeIndex::Uuid => "Uuid",
        }
    }

    /// The intrinsic type name reserved for this kind.
    ///
    /// Intrinsic names carry no origin suffix and are resolvable in every
    /// process without registration.
    pub fn intrinsic_name(self) -> &'static str {
        self.kind_name()
    }

    /// Reverse lookup of [`intrinsic_name`](Self::intrinsic_name).
    ///
    /// A kind whose support is compiled out is not recognized here, so
    /// serializing under its name fails as an unsupported type while the
    /// wire tag itself stays valid for range checks.
    pub fn from_intrinsic_name(name: &str) -> Option<TypeIndex> {
        let idx = match name {
            "Type" => TypeIndex::Type,
            "Serializable" => TypeIndex::Serializable,
            "Enum" => TypeIndex::Enum,
            "TraitMap" => TypeIndex::TraitMap,
            "Object" => TypeIndex::Object,
            "String" => TypeIndex::String,
            "char" => TypeIndex::Char,
            "u8" => TypeIndex::U8,
            "i8" => TypeIndex::I8,
            "i16" => TypeIndex::I16,
            "u16" => TypeIndex::U16,
            "i32" => TypeIndex::I32,
            "u32" => TypeIndex::U32,
            "i64" => TypeIndex::I64,
            "u64" => TypeIndex::U64,
            "f32" => TypeIndex::F32,
            "f64" => TypeIndex::F64,
            "Decimal" => TypeIndex::Decimal,
            "bool" => TypeIndex::Bool,
            "DateTime" => TypeIndex::DateTime,
            "DateTimeOffset" => TypeIndex::DateTimeOffset,
            "Duration" => TypeIndex::Duration,
            "BigInt" => TypeIndex::BigInt,
            "Date" => TypeIndex::Date,
            "Time" => TypeIndex::Time,
            #[cfg(feature = "uuid")]
            "Uuid" => TypeIndex::Uuid,
            _ => return None,
        };
        Some(idx)
    }
}
