use std::collections::{HashMap, HashSet};

use crate::index::TypeIndex;
use crate::info::{Serializable, SerializableType};
use crate::typename::TypeName;
use crate::{Error, Result};

/// What a type name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedType {
    /// One of the built-in kinds.
    Builtin(TypeIndex),
    /// A registered composite type speaking the field-bag contract.
    Composite,
    /// A registered enum type with the given underlying storage kind.
    Enum(IntKind),
    /// A known name with no codec role of its own (resolvable as a type
    /// identity only).
    Opaque,
}

/// The underlying storage kind of a registered enum type. Only the eight
/// integer kinds are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    U8,
    I8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl IntKind {
    pub fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64)
    }
}

/// Type resolution as the codec consumes it.
///
/// The codec itself never inspects host-runtime type machinery; everything
/// it needs to know about live types is asked through this trait, so the
/// "loaded-type set" of a process is whatever the resolver says it is.
pub trait TypeResolver: Send + Sync {
    /// Locates a type by its serialized identity; `None` when the type is
    /// unknown here, which callers treat as recoverable.
    fn resolve(&self, name: &TypeName) -> Option<ResolvedType>;

    /// Default-constructs an instance of a registered composite type.
    fn create(&self, name: &TypeName) -> Result<Box<dyn Serializable>>;

    /// The portability oracle: whether an origin belongs to this process's
    /// own code. Types from origins that are not local are rejected at
    /// serialize time.
    fn is_local(&self, origin: &str) -> bool;
}

enum Entry {
    Composite {
        factory: Option<Box<dyn Fn() -> Box<dyn Serializable> + Send + Sync>>,
    },
    Enum {
        underlying: IntKind,
    },
    Opaque,
}

/// The standard [`TypeResolver`]: an immutable table of registered types,
/// built once through [`TypeRegistryBuilder`] and never mutated afterwards.
///
/// Intrinsic names for the built-in kinds resolve without registration.
pub struct TypeRegistry {
    local_origins: HashSet<String>,
    types: HashMap<String, Entry>,
    generics: HashSet<String>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry::builder().build()
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, name: &TypeName) -> Option<ResolvedType> {
        if name.is_array() {
            let element = name.strip_outer_rank()?;
            return self.resolve(&element);
        }
        let (core, optional) = name.unwrap_optional();
        if optional {
            return self.resolve(core);
        }
        if !core.args().is_empty() {
            let definition = match core.origin() {
                Some(origin) => format!("{},{}", core.base(), origin),
                None => core.base().to_owned(),
            };
            if !self.generics.contains(&definition) {
                return None;
            }
            if core.args().iter().all(|arg| self.resolve(arg).is_some()) {
                return Some(ResolvedType::Opaque);
            }
            return None;
        }
        if core.origin().is_none() {
            if let Some(idx) = TypeIndex::from_intrinsic_name(core.base()) {
                return Some(ResolvedType::Builtin(idx));
            }
        }
        match self.types.get(&core.render())? {
            Entry::Composite { .. } => Some(ResolvedType::Composite),
            Entry::Enum { underlying } => Some(ResolvedType::Enum(*underlying)),
            Entry::Opaque => Some(ResolvedType::Opaque),
        }
    }

    fn create(&self, name: &TypeName) -> Result<Box<dyn Serializable>> {
        let rendered = name.render();
        match self.types.get(&rendered) {
            Some(Entry::Composite {
                factory: Some(factory),
            }) => Ok(factory()),
            Some(Entry::Composite { factory: None }) => {
                Err(Error::MissingConstructor(rendered))
            }
            _ => Err(Error::UnresolvedType(rendered)),
        }
    }

    fn is_local(&self, origin: &str) -> bool {
        self.local_origins.contains(origin)
    }
}

/// Builder for [`TypeRegistry`]. Registration happens once at startup; the
/// built registry is immutable and shareable.
#[derive(Default)]
pub struct TypeRegistryBuilder {
    local_origins: HashSet<String>,
    types: HashMap<String, Entry>,
    generics: HashSet<String>,
}

impl TypeRegistryBuilder {
    /// Marks an origin as local to this process, allowing types from it to
    /// be serialized.
    pub fn local_origin(mut self, origin: impl Into<String>) -> Self {
        self.local_origins.insert(origin.into());
        self
    }

    /// Registers a composite type for serialization and deserialization.
    /// Its origin is implicitly marked local.
    pub fn serializable<T: SerializableType>(mut self) -> Self {
        let name = T::serialized_type_name();
        if let Some(origin) = name.origin() {
            self.local_origins.insert(origin.to_owned());
        }
        self.types.insert(
            name.render(),
            Entry::Composite {
                factory: Some(Box::new(|| Box::new(T::default()) as Box<dyn Serializable>)),
            },
        );
        self
    }

    /// Registers a composite type name without a constructor. The name
    /// resolves, but deserializing an instance fails with the
    /// missing-constructor error.
    pub fn composite_name(mut self, name: TypeName) -> Self {
        self.types
            .insert(name.render(), Entry::Composite { factory: None });
        self
    }

    /// Registers an enum type and its underlying storage kind.
    pub fn enum_type(mut self, name: TypeName, underlying: IntKind) -> Self {
        self.types
            .insert(name.render(), Entry::Enum { underlying });
        self
    }

    /// Registers a name that resolves as a type identity only.
    pub fn opaque(mut self, name: TypeName) -> Self {
        self.types.insert(name.render(), Entry::Opaque);
        self
    }

    /// Registers a generic type definition, making closed instantiations of
    /// it resolvable when all their arguments resolve.
    pub fn generic(mut self, base: impl Into<String>, origin: Option<&str>) -> Self {
        let base = base.into();
        let key = match origin {
            Some(origin) => format!("{base},{origin}"),
            None => base,
        };
        self.generics.insert(key);
        self
    }

    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            local_origins: self.local_origins,
            types: self.types,
            generics: self.generics,
        }
    }
}
