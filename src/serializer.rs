use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::array::{ArrayValue, ElementType};
use crate::escape::{escape, unescape};
use crate::index::TypeIndex;
use crate::info::SerializationInfo;
use crate::registry::{ResolvedType, TypeRegistry, TypeResolver};
use crate::typename::TypeName;
use crate::value::{EnumRepr, EnumValue, FromValue, Timestamp, ToValue, TraitMap, Value};
use crate::{Error, Result};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_TIME_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Ticks are the 100-nanosecond units used by the Duration and Time kinds.
const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_DAY: i64 = 86_400 * TICKS_PER_SECOND;

/// Serializes and deserializes values through the envelope format.
///
/// The serializer holds no mutable state: it is a pure function of its
/// inputs plus the injected [`TypeResolver`], and is safe to share across
/// threads without locking.
pub struct Serializer {
    resolver: Arc<dyn TypeResolver>,
}

impl Serializer {
    pub fn new(resolver: Arc<dyn TypeResolver>) -> Serializer {
        Serializer { resolver }
    }

    pub fn with_registry(registry: TypeRegistry) -> Serializer {
        Serializer::new(Arc::new(registry))
    }

    pub fn resolver(&self) -> &dyn TypeResolver {
        &*self.resolver
    }

    /// Serializes a value under a declared type.
    ///
    /// With no declared type, the value's runtime type is used; a null
    /// value then serializes as untyped null. Null values are rejected for
    /// non-nullable declared types, and values are rejected when their
    /// runtime kind is not compatible with the declared type.
    pub fn serialize(&self, value: Option<&Value>, declared: Option<&TypeName>) -> Result<String> {
        let declared = match declared {
            Some(ty) => ty.clone(),
            None => match value {
                Some(v) => self.runtime_type_name(v),
                None => TypeName::intrinsic(TypeIndex::Object.intrinsic_name()),
            },
        };

        let (element, is_array) = match declared.strip_outer_rank() {
            Some(element) => (element, true),
            None => (declared.clone(), false),
        };
        if element.is_array() {
            // A declared array-of-arrays has no expressible element tag.
            return Err(Error::UnsupportedType(declared.render()));
        }
        let (core, nullable) = {
            let (core, nullable) = element.unwrap_optional();
            (core.clone(), nullable)
        };
        let idx = self.type_index_of(&core, value)?;

        if value.is_none() && !is_array && !nullable && !idx.is_reference_kind() {
            return Err(Error::NullValueForType(declared.render()));
        }

        let mut marker = idx.as_wire().to_string();
        if nullable {
            marker.push('?');
        }
        if is_array {
            marker.push_str("[]");
        }

        let Some(value) = value else {
            return Ok(marker);
        };

        let payload = if is_array {
            let array = match value {
                Value::Array(array) => array,
                other => return Err(self.incompatible(other, &declared)),
            };
            let element = array.element();
            if element.index() != idx || element.is_nullable() != nullable {
                return Err(self.incompatible(value, &declared));
            }
            self.serialize_array(array)?
        } else {
            self.encode_payload(idx, &core, value, &declared)?
        };

        Ok(format!("{marker}:{payload}"))
    }

    /// Serializes a typed value under its statically declared type.
    pub fn serialize_value<T: ToValue>(&self, value: &T) -> Result<String> {
        self.serialize(value.to_value().as_ref(), Some(&T::declared_type()))
    }

    /// Deserializes an envelope back into a value; `Ok(None)` is a null
    /// value or an unresolvable type identity.
    pub fn deserialize(&self, text: &str) -> Result<Option<Value>> {
        let (marker, payload) = match text.split_once(':') {
            Some((marker, payload)) => (marker, Some(payload)),
            None => (text, None),
        };

        let mut tag_text = marker;
        let is_array = tag_text.ends_with("[]");
        if is_array {
            tag_text = &tag_text[..tag_text.len() - 2];
        }
        let nullable = tag_text.ends_with('?');
        if nullable {
            tag_text = &tag_text[..tag_text.len() - 1];
        }

        let idx = tag_text
            .parse::<i32>()
            .ok()
            .and_then(TypeIndex::from_wire)
            .ok_or_else(|| Error::UnknownTypeIndex(tag_text.to_owned()))?;

        #[cfg(not(feature = "uuid"))]
        if idx == TypeIndex::Uuid {
            return Err(Error::KindNotEnabled("Uuid"));
        }

        let Some(payload) = payload else {
            return Ok(None);
        };

        if is_array {
            let mut element = ElementType::of(idx);
            if nullable {
                element = element.nullable();
            }
            let array = self.deserialize_array(element, payload)?;
            return Ok(Some(Value::Array(array)));
        }

        self.decode_payload(idx, payload)
    }

    /// Deserializes an envelope into a typed value. Null decodes to the
    /// type's missing-value result (`None` for `Option`).
    pub fn deserialize_as<T: FromValue>(&self, text: &str) -> Result<T> {
        match self.deserialize(text)? {
            Some(value) => T::from_value(value),
            None => T::missing(),
        }
    }

    /// Whether the value would serialize successfully under its runtime
    /// type. Null is always serializable.
    pub fn is_serializable(&self, value: Option<&Value>) -> bool {
        match value {
            None => true,
            Some(v) => {
                let ty = self.runtime_type_name(v);
                self.is_serializable_as(Some(v), Some(&ty))
            }
        }
    }

    /// Whether the value would serialize successfully under the given
    /// declared type. Callers such as a message bus can use this to fail
    /// fast instead of throwing mid-pipeline.
    pub fn is_serializable_as(&self, value: Option<&Value>, ty: Option<&TypeName>) -> bool {
        let Some(ty) = ty else {
            return value.is_none();
        };
        if ty.is_array() {
            let Some(element) = ty.strip_outer_rank() else {
                return false;
            };
            if element.is_array() || !self.is_serializable_as(None, Some(&element)) {
                return false;
            }
            return match value {
                None => true,
                Some(Value::Array(array)) => array
                    .iter()
                    .flatten()
                    .all(|item| self.is_serializable(Some(item))),
                Some(_) => false,
            };
        }
        let (core, _) = ty.unwrap_optional();
        let Ok(idx) = self.type_index_of(core, value) else {
            return false;
        };
        match idx {
            TypeIndex::Object => value.is_none(),
            TypeIndex::Enum => {
                core.origin().is_none() || core.origin().is_some_and(|o| self.resolver.is_local(o))
            }
            _ => true,
        }
    }

    /// The serialized identity of a value's runtime type.
    pub fn runtime_type_name(&self, value: &Value) -> TypeName {
        match value {
            Value::Object(object) => object.type_name(),
            Value::Enum(ev) => ev.ty().clone(),
            Value::Array(array) => array
                .element()
                .to_type_name()
                .array_of(array.rank() as u32),
            other => match other.scalar_index() {
                Some(idx) => TypeName::intrinsic(idx.intrinsic_name()),
                None => TypeName::intrinsic(TypeIndex::Object.intrinsic_name()),
            },
        }
    }

    /// Picks the type index for a declared core type (non-array,
    /// non-nullable).
    ///
    /// An object speaking the field-bag contract serializes even when its
    /// type is not registered; registration is only needed to deserialize
    /// it again.
    fn type_index_of(&self, core: &TypeName, value: Option<&Value>) -> Result<TypeIndex> {
        if core.origin().is_none() && core.args().is_empty() && !core.is_array() {
            if let Some(idx) = TypeIndex::from_intrinsic_name(core.base()) {
                return Ok(idx);
            }
        }
        match self.resolver.resolve(core) {
            Some(ResolvedType::Composite) => Ok(TypeIndex::Serializable),
            Some(ResolvedType::Enum(_)) => Ok(TypeIndex::Enum),
            Some(ResolvedType::Builtin(idx)) => Ok(idx),
            Some(ResolvedType::Opaque) | None => match value {
                Some(Value::Object(object)) if object.type_name() == *core => {
                    Ok(TypeIndex::Serializable)
                }
                _ => Err(Error::UnsupportedType(core.render())),
            },
        }
    }

    fn incompatible(&self, value: &Value, declared: &TypeName) -> Error {
        Error::IncompatibleValue {
            actual: self.runtime_type_name(value).render(),
            declared: declared.render(),
        }
    }

    /// Renders a type name after verifying every origin it mentions is
    /// local to this process.
    fn render_portable(&self, name: &TypeName) -> Result<String> {
        self.check_portable(name)?;
        Ok(name.render())
    }

    fn check_portable(&self, name: &TypeName) -> Result<()> {
        if let Some(origin) = name.origin() {
            if !self.resolver.is_local(origin) {
                return Err(Error::NonPortableType {
                    type_name: name.render(),
                    origin: origin.to_owned(),
                });
            }
        }
        for arg in name.args() {
            self.check_portable(arg)?;
        }
        Ok(())
    }

    fn encode_payload(
        &self,
        idx: TypeIndex,
        core: &TypeName,
        value: &Value,
        declared: &TypeName,
    ) -> Result<String> {
        macro_rules! expect_value {
            ($variant:ident) => {
                match value {
                    Value::$variant(inner) => inner,
                    other => return Err(self.incompatible(other, declared)),
                }
            };
        }

        let payload = match idx {
            TypeIndex::Object => return Err(Error::UntypedValue),
            TypeIndex::Type => {
                let name = expect_value!(Type);
                self.render_portable(name)?
            }
            TypeIndex::Enum => {
                let ev = expect_value!(Enum);
                if core.base() != TypeIndex::Enum.intrinsic_name() && ev.ty() != core {
                    return Err(self.incompatible(value, declared));
                }
                self.serialize_enum(ev)?
            }
            TypeIndex::Serializable => {
                let object = expect_value!(Object);
                let name = object.type_name();
                if core.base() != TypeIndex::Serializable.intrinsic_name() && &name != core {
                    return Err(self.incompatible(value, declared));
                }
                let rendered = self.render_portable(&name)?;
                let mut info = SerializationInfo::new(self);
                object.serialize(&mut info)?;
                format!("{}:{}", escape(&rendered), info.to_wire())
            }
            TypeIndex::TraitMap => {
                let map = expect_value!(TraitMap);
                serialize_traits(map)
            }
            TypeIndex::String => escape(expect_value!(String)),
            TypeIndex::Char => (*expect_value!(Char) as u32).to_string(),
            TypeIndex::U8 => expect_value!(U8).to_string(),
            TypeIndex::I8 => expect_value!(I8).to_string(),
            TypeIndex::I16 => expect_value!(I16).to_string(),
            TypeIndex::U16 => expect_value!(U16).to_string(),
            TypeIndex::I32 => expect_value!(I32).to_string(),
            TypeIndex::U32 => expect_value!(U32).to_string(),
            TypeIndex::I64 => expect_value!(I64).to_string(),
            TypeIndex::U64 => expect_value!(U64).to_string(),
            TypeIndex::F32 => {
                let bits = expect_value!(F32).to_le_bytes();
                self.serialize_bit_pattern(&bits)?
            }
            TypeIndex::F64 => {
                let bits = expect_value!(F64).to_le_bytes();
                self.serialize_bit_pattern(&bits)?
            }
            TypeIndex::Decimal => expect_value!(Decimal).to_string(),
            TypeIndex::Bool => {
                if *expect_value!(Bool) {
                    "True".to_owned()
                } else {
                    "False".to_owned()
                }
            }
            TypeIndex::DateTime => match expect_value!(DateTime) {
                Timestamp::Utc(dt) => format!("{}Z", dt.format(DATE_TIME_FORMAT)),
                Timestamp::Unzoned(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
            },
            TypeIndex::DateTimeOffset => expect_value!(DateTimeOffset)
                .format(DATE_TIME_OFFSET_FORMAT)
                .to_string(),
            TypeIndex::Duration => format_duration(expect_value!(Duration)),
            TypeIndex::BigInt => expect_value!(BigInt).to_string(),
            TypeIndex::Date => date_to_day_number(expect_value!(Date)).to_string(),
            TypeIndex::Time => time_to_ticks(expect_value!(Time)).to_string(),
            #[cfg(feature = "uuid")]
            TypeIndex::Uuid => expect_value!(Uuid).simple().to_string(),
            #[cfg(not(feature = "uuid"))]
            TypeIndex::Uuid => return Err(Error::KindNotEnabled("Uuid")),
        };
        Ok(payload)
    }

    fn decode_payload(&self, idx: TypeIndex, payload: &str) -> Result<Option<Value>> {
        let value = match idx {
            TypeIndex::Object => return Ok(None),
            TypeIndex::Type => {
                let Some(name) = TypeName::parse(payload) else {
                    return Ok(None);
                };
                if self.resolver.resolve(&name).is_none() {
                    return Ok(None);
                }
                Value::Type(name)
            }
            TypeIndex::Enum => return self.decode_enum(payload),
            TypeIndex::Serializable => return self.decode_serializable(payload),
            TypeIndex::TraitMap => Value::TraitMap(deserialize_traits(payload)?),
            TypeIndex::String => Value::String(unescape(payload)?),
            TypeIndex::Char => {
                let scalar: u32 = parse_num("char", payload)?;
                let ch = char::from_u32(scalar).ok_or_else(|| {
                    Error::Malformed(format!("'{payload}' is not a valid char scalar value"))
                })?;
                Value::Char(ch)
            }
            TypeIndex::U8 => Value::U8(parse_num("u8", payload)?),
            TypeIndex::I8 => Value::I8(parse_num("i8", payload)?),
            TypeIndex::I16 => Value::I16(parse_num("i16", payload)?),
            TypeIndex::U16 => Value::U16(parse_num("u16", payload)?),
            TypeIndex::I32 => Value::I32(parse_num("i32", payload)?),
            TypeIndex::U32 => Value::U32(parse_num("u32", payload)?),
            TypeIndex::I64 => Value::I64(parse_num("i64", payload)?),
            TypeIndex::U64 => Value::U64(parse_num("u64", payload)?),
            TypeIndex::F32 => {
                let bytes = self.deserialize_bit_pattern(payload)?;
                let bits: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    Error::Malformed(format!(
                        "expected 4 bytes for an f32 bit pattern, got {}",
                        bytes.len()
                    ))
                })?;
                Value::F32(f32::from_le_bytes(bits))
            }
            TypeIndex::F64 => {
                let bytes = self.deserialize_bit_pattern(payload)?;
                let bits: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    Error::Malformed(format!(
                        "expected 8 bytes for an f64 bit pattern, got {}",
                        bytes.len()
                    ))
                })?;
                Value::F64(f64::from_le_bytes(bits))
            }
            TypeIndex::Decimal => Value::Decimal(parse_num("Decimal", payload)?),
            TypeIndex::Bool => {
                if payload.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if payload.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    return Err(Error::Malformed(format!(
                        "invalid bool payload '{payload}'"
                    )));
                }
            }
            TypeIndex::DateTime => {
                let ts = match payload.strip_suffix('Z') {
                    Some(trimmed) => Timestamp::Utc(parse_naive(trimmed)?.and_utc()),
                    None => Timestamp::Unzoned(parse_naive(payload)?),
                };
                Value::DateTime(ts)
            }
            TypeIndex::DateTimeOffset => {
                let dt = match payload.strip_suffix('Z') {
                    Some(trimmed) => parse_naive(trimmed)?.and_utc().fixed_offset(),
                    None => DateTime::parse_from_str(payload, DATE_TIME_OFFSET_FORMAT).map_err(
                        |err| {
                            Error::Malformed(format!(
                                "invalid DateTimeOffset payload '{payload}': {err}"
                            ))
                        },
                    )?,
                };
                Value::DateTimeOffset(dt)
            }
            TypeIndex::Duration => Value::Duration(parse_duration(payload)?),
            TypeIndex::BigInt => Value::BigInt(parse_num("BigInt", payload)?),
            TypeIndex::Date => {
                let day: i32 = parse_num("Date", payload)?;
                let date = day
                    .checked_add(1)
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .ok_or_else(|| {
                        Error::Malformed(format!("'{payload}' is not a valid day number"))
                    })?;
                Value::Date(date)
            }
            TypeIndex::Time => {
                let ticks: i64 = parse_num("Time", payload)?;
                if !(0..TICKS_PER_DAY).contains(&ticks) {
                    return Err(Error::Malformed(format!(
                        "'{payload}' is not a valid time-of-day tick count"
                    )));
                }
                let seconds = (ticks / TICKS_PER_SECOND) as u32;
                let nanos = ((ticks % TICKS_PER_SECOND) * 100) as u32;
                let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
                    .ok_or_else(|| {
                        Error::Malformed(format!(
                            "'{payload}' is not a valid time-of-day tick count"
                        ))
                    })?;
                Value::Time(time)
            }
            #[cfg(feature = "uuid")]
            TypeIndex::Uuid => {
                let id = uuid::Uuid::try_parse(payload).map_err(|err| {
                    Error::Malformed(format!("invalid Uuid payload '{payload}': {err}"))
                })?;
                Value::Uuid(id)
            }
            #[cfg(not(feature = "uuid"))]
            TypeIndex::Uuid => return Err(Error::KindNotEnabled("Uuid")),
        };
        Ok(Some(value))
    }

    fn serialize_enum(&self, ev: &EnumValue) -> Result<String> {
        let rendered = self.render_portable(ev.ty())?;
        let Some(ResolvedType::Enum(kind)) = self.resolver.resolve(ev.ty()) else {
            return Err(Error::UnresolvedType(rendered));
        };
        let text = match (ev.repr(), kind.is_signed()) {
            (EnumRepr::Signed(v), true) => v.to_string(),
            (EnumRepr::Unsigned(v), false) => v.to_string(),
            _ => return Err(Error::EnumReprMismatch(rendered)),
        };
        Ok(format!("{}:{}", escape(&rendered), text))
    }

    fn decode_enum(&self, payload: &str) -> Result<Option<Value>> {
        let Some((name_text, int_text)) = payload.split_once(':') else {
            return Ok(None);
        };
        let rendered = unescape(name_text)?;
        let ty = TypeName::parse(&rendered)
            .ok_or_else(|| Error::UnresolvedType(rendered.clone()))?;
        let Some(resolved) = self.resolver.resolve(&ty) else {
            return Err(Error::UnresolvedType(rendered));
        };
        let ResolvedType::Enum(kind) = resolved else {
            return Err(Error::Malformed(format!(
                "attempted to deserialize type '{rendered}' which is not an enum"
            )));
        };
        let value = if kind.is_signed() {
            EnumValue::signed(ty, parse_num("enum", int_text)?)
        } else {
            EnumValue::unsigned(ty, parse_num("enum", int_text)?)
        };
        Ok(Some(Value::Enum(value)))
    }

    fn decode_serializable(&self, payload: &str) -> Result<Option<Value>> {
        let Some((name_text, bag)) = payload.split_once(':') else {
            return Ok(None);
        };
        let rendered = unescape(name_text)?;
        let ty = TypeName::parse(&rendered)
            .ok_or_else(|| Error::UnresolvedType(rendered.clone()))?;
        match self.resolver.resolve(&ty) {
            Some(ResolvedType::Composite) => {}
            Some(_) => {
                return Err(Error::Malformed(format!(
                    "attempted to deserialize type '{rendered}' which does not implement \
                     the serializable contract"
                )))
            }
            None => return Err(Error::UnresolvedType(rendered)),
        }
        let mut object = self.resolver.create(&ty)?;
        let info = SerializationInfo::from_wire(self, bag)?;
        object.deserialize(&info)?;
        Ok(Some(Value::Object(object)))
    }

    /// Wraps a floating-point bit pattern as a complete nested byte-array
    /// envelope, so the value round-trips bit for bit.
    fn serialize_bit_pattern(&self, bytes: &[u8]) -> Result<String> {
        let array = ArrayValue::from_bytes(bytes);
        Ok(format!(
            "{}[]:{}",
            TypeIndex::U8.as_wire(),
            self.serialize_array(&array)?
        ))
    }

    fn deserialize_bit_pattern(&self, payload: &str) -> Result<Vec<u8>> {
        let inner = payload
            .split_once(':')
            .map(|(_, rest)| rest)
            .unwrap_or(payload);
        self.deserialize_array(ElementType::of(TypeIndex::U8), inner)?
            .to_bytes()
    }

    fn serialize_array(&self, array: &ArrayValue) -> Result<String> {
        let mut info = SerializationInfo::new(self);
        info.add("r", &(array.rank() as i32))?;
        info.add("tl", &(array.len() as i32))?;
        for (dim, length) in array.lengths().iter().enumerate() {
            info.add(&format!("l{dim}"), length)?;
        }
        for (dim, bound) in array.lower_bounds().iter().enumerate() {
            info.add(&format!("lb{dim}"), bound)?;
        }
        let element_type = array.element().to_type_name();
        for (i, item) in array.iter().enumerate() {
            let key = format!("i{i}");
            match item {
                Some(value) => {
                    let runtime = self.runtime_type_name(value);
                    info.add_value(&key, Some(value), Some(&runtime))?;
                }
                None => info.add_value(&key, None, Some(&element_type))?,
            }
        }
        Ok(info.to_wire())
    }

    fn deserialize_array(&self, element: ElementType, payload: &str) -> Result<ArrayValue> {
        let info = SerializationInfo::from_wire(self, payload)?;
        let rank: i32 = info.get("r")?;
        if !(1..=32).contains(&rank) {
            return Err(Error::Malformed(format!("array rank {rank} out of range")));
        }
        let total: i32 = info.get("tl")?;
        if total < 0 {
            return Err(Error::Malformed(format!(
                "array element count {total} out of range"
            )));
        }
        let mut lengths = Vec::with_capacity(rank as usize);
        let mut lower_bounds = Vec::with_capacity(rank as usize);
        for dim in 0..rank {
            lengths.push(info.get::<i32>(&format!("l{dim}"))?);
            lower_bounds.push(info.get::<i32>(&format!("lb{dim}"))?);
        }
        let mut elements = Vec::with_capacity(total as usize);
        for i in 0..total {
            elements.push(info.get_value(&format!("i{i}"))?);
        }
        ArrayValue::with_layout(element, lengths, lower_bounds, elements)
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Serializer::with_registry(TypeRegistry::default())
    }
}

fn parse_num<T: FromStr>(kind: &str, payload: &str) -> Result<T>
where
    T::Err: Display,
{
    payload
        .parse()
        .map_err(|err| Error::Malformed(format!("invalid {kind} payload '{payload}': {err}")))
}

fn parse_naive(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .map_err(|err| Error::Malformed(format!("invalid DateTime payload '{text}': {err}")))
}

fn date_to_day_number(date: &NaiveDate) -> i32 {
    date.num_days_from_ce() - 1
}

fn time_to_ticks(time: &NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * TICKS_PER_SECOND + (time.nanosecond() / 100) as i64
}

/// Renders a duration as `[-][d.]hh:mm:ss[.fffffff]`, the invariant
/// constant format.
fn format_duration(duration: &chrono::Duration) -> String {
    let ticks = duration.num_seconds() as i128 * TICKS_PER_SECOND as i128
        + (duration.subsec_nanos() / 100) as i128;
    let negative = ticks < 0;
    let ticks = ticks.unsigned_abs();

    let frac = (ticks % TICKS_PER_SECOND as u128) as u32;
    let total_seconds = ticks / TICKS_PER_SECOND as u128;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = (total_seconds / 3600) % 24;
    let days = total_seconds / 86_400;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if frac > 0 {
        out.push_str(&format!(".{frac:07}"));
    }
    out
}

fn parse_duration(text: &str) -> Result<chrono::Duration> {
    let malformed = || Error::Malformed(format!("invalid Duration payload '{text}'"));

    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut sections = body.split(':');
    let (first, minutes_text, seconds_text) =
        match (sections.next(), sections.next(), sections.next(), sections.next()) {
            (Some(first), Some(minutes), Some(seconds), None) => (first, minutes, seconds),
            _ => return Err(malformed()),
        };

    let (days, hours_text) = match first.split_once('.') {
        Some((days, hours)) => (parse_num::<u64>("Duration", days)?, hours),
        None => (0, first),
    };
    if days > 10_675_199 {
        return Err(malformed());
    }

    let (seconds_text, frac_ticks) = match seconds_text.split_once('.') {
        Some((seconds, frac)) => {
            if frac.is_empty() || frac.len() > 7 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            let scale = 10u32.pow(7 - frac.len() as u32);
            (seconds, parse_num::<u32>("Duration", frac)? * scale)
        }
        None => (seconds_text, 0),
    };

    let hours: u32 = parse_num("Duration", hours_text)?;
    let minutes: u32 = parse_num("Duration", minutes_text)?;
    let seconds: u32 = parse_num("Duration", seconds_text)?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(malformed());
    }

    let total_seconds =
        (days * 86_400 + hours as u64 * 3600 + minutes as u64 * 60 + seconds as u64) as i64;
    let mut duration = chrono::Duration::seconds(total_seconds)
        + chrono::Duration::nanoseconds(frac_ticks as i64 * 100);
    if negative {
        duration = -duration;
    }
    Ok(duration)
}

fn serialize_traits(map: &TraitMap) -> String {
    if map.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = map.keys().map(escape).collect();
    let mut lines = vec![escape(&keys.join("\n"))];
    for (_, values) in map.iter() {
        let values: Vec<String> = values.iter().map(|v| escape(v)).collect();
        lines.push(escape(&values.join("\n")));
    }
    escape(&lines.join("\n"))
}

fn deserialize_traits(payload: &str) -> Result<TraitMap> {
    let mut map = TraitMap::new();
    if payload.is_empty() {
        return Ok(map);
    }
    let body = unescape(payload)?;
    let pieces: Vec<&str> = body.split('\n').collect();
    let keys_blob = unescape(pieces[0])?;
    let keys: Vec<&str> = keys_blob.split('\n').collect();

    // Mismatched counts mean missing data; decode to an empty map.
    if pieces.len() == keys.len() + 1 {
        for (i, key) in keys.iter().enumerate() {
            let key = unescape(key)?;
            let values_blob = unescape(pieces[i + 1])?;
            for value in values_blob.split('\n') {
                map.add(&key, unescape(value)?);
            }
        }
    }
    Ok(map)
}
