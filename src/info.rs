use std::any::Any;
use std::fmt::Debug;

use indexmap::IndexMap;

use crate::escape::{escape, unescape};
use crate::serializer::Serializer;
use crate::typename::TypeName;
use crate::value::{FromValue, ToValue, Value};
use crate::{Error, Result};

/// The field-bag contract for composite objects.
///
/// A composite type contributes a named bag of fields on serialization and
/// reads them back by name on deserialization, which always starts from a
/// registry-constructed default instance. Field values pass back through
/// the full envelope pipeline, so fields may themselves be composite
/// objects, arrays, or primitives.
///
/// Object graphs must be acyclic: recursion depth is bounded only by the
/// graph's depth and a self-referential graph will not terminate.
///
/// Most types should use `#[derive(Serializable)]` from the companion
/// derive crate instead of implementing this by hand.
pub trait Serializable: Debug + Send + Sync {
    /// Writes this object's fields into the bag.
    fn serialize(&self, info: &mut SerializationInfo<'_>) -> Result<()>;

    /// Reads this object's fields back from the bag.
    fn deserialize(&mut self, info: &SerializationInfo<'_>) -> Result<()>;

    /// The serialized identity of this object's concrete type.
    fn type_name(&self) -> TypeName;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A [`Serializable`] type that can be registered for deserialization:
/// it is default-constructible and knows its own serialized identity.
pub trait SerializableType: Serializable + Default + Sized + 'static {
    /// The serialized identity of this type.
    fn serialized_type_name() -> TypeName;
}

/// The named field bag a composite object serializes into and
/// deserializes from.
///
/// Fields keep insertion order, which is preserved across round-trip. The
/// wire form is one `name:<envelope>` line per field, newline-joined, then
/// escaped as a single payload unit; a bag with zero fields produces an
/// empty payload.
pub struct SerializationInfo<'a> {
    codec: &'a Serializer,
    entries: IndexMap<String, String>,
}

impl<'a> SerializationInfo<'a> {
    pub(crate) fn new(codec: &'a Serializer) -> SerializationInfo<'a> {
        SerializationInfo {
            codec,
            entries: IndexMap::new(),
        }
    }

    /// Adds a field, serializing it immediately under its statically
    /// declared type. Re-adding a name overwrites the earlier value while
    /// keeping its position.
    pub fn add<T: ToValue>(&mut self, key: &str, value: &T) -> Result<()> {
        let declared = T::declared_type();
        self.add_value(key, value.to_value().as_ref(), Some(&declared))
    }

    /// Adds a field from a dynamic value and an optional declared type.
    /// With no declared type, the value's runtime type is used; a null
    /// value then serializes as untyped null.
    pub fn add_value(
        &mut self,
        key: &str,
        value: Option<&Value>,
        declared: Option<&TypeName>,
    ) -> Result<()> {
        let envelope = self.codec.serialize(value, declared)?;
        self.entries.insert(key.to_owned(), envelope);
        Ok(())
    }

    /// Reads a field back as a typed value. A missing or null field yields
    /// the type's missing-value result (`None` for `Option`, the default
    /// for built-in kinds).
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        match self.get_value(key)? {
            Some(value) => T::from_value(value),
            None => T::missing(),
        }
    }

    /// Reads a field back as a dynamic value; `None` for missing or null.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        match self.entries.get(key) {
            Some(envelope) => self.codec.deserialize(envelope),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn to_wire(&self) -> String {
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|(key, envelope)| format!("{key}:{envelope}"))
            .collect();
        escape(&lines.join("\n"))
    }

    pub(crate) fn from_wire(codec: &'a Serializer, payload: &str) -> Result<SerializationInfo<'a>> {
        let mut info = SerializationInfo::new(codec);
        if payload.is_empty() {
            return Ok(info);
        }
        let body = unescape(payload)?;
        for line in body.split('\n') {
            let (key, envelope) = line.split_once(':').ok_or_else(|| {
                Error::Malformed(format!(
                    "field entry '{line}' is not in name:value form"
                ))
            })?;
            info.entries.insert(key.to_owned(), envelope.to_owned());
        }
        Ok(info)
    }
}
