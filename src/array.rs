use crate::index::TypeIndex;
use crate::typename::TypeName;
use crate::value::Value;
use crate::{Error, Result};

/// The element descriptor of an [`ArrayValue`]: the element's type index
/// plus whether the element type is nullable.
///
/// The descriptor travels on the envelope (`<tag>[?][]`), not inside the
/// array payload, so it is all a decoder has to reconstruct element typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementType {
    index: TypeIndex,
    nullable: bool,
}

impl ElementType {
    /// A non-nullable element of the given kind.
    pub fn of(index: TypeIndex) -> ElementType {
        ElementType {
            index,
            nullable: false,
        }
    }

    /// Marks the element type as nullable.
    pub fn nullable(mut self) -> ElementType {
        self.nullable = true;
        self
    }

    pub fn index(&self) -> TypeIndex {
        self.index
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether a null element is storable: explicitly nullable types and the
    /// reference kinds.
    pub(crate) fn accepts_null(&self) -> bool {
        self.nullable || self.index.is_reference_kind()
    }

    /// The declared type of a single element, used for null elements whose
    /// envelope cannot be derived from a runtime value.
    pub(crate) fn to_type_name(self) -> TypeName {
        let name = TypeName::intrinsic(self.index.intrinsic_name());
        if self.nullable {
            TypeName::optional(name)
        } else {
            name
        }
    }
}

/// An array of any rank with per-dimension lengths and lower bounds,
/// stored as a flat row-major element sequence.
///
/// Elements are visited in row-major order starting at each dimension's
/// lower bound; non-zero lower bounds are preserved exactly across
/// round-trip. Elements may be null only when the element type accepts it.
#[derive(Debug)]
pub struct ArrayValue {
    element: ElementType,
    lengths: Vec<i32>,
    lower_bounds: Vec<i32>,
    elements: Vec<Option<Value>>,
}

impl ArrayValue {
    /// A rank-1, zero-based array.
    pub fn vector(element: ElementType, elements: Vec<Option<Value>>) -> Result<ArrayValue> {
        let length = elements.len() as i32;
        ArrayValue::with_layout(element, vec![length], vec![0], elements)
    }

    /// An array with explicit per-dimension lengths and lower bounds.
    ///
    /// The element sequence is row-major. Fails when the dimension counts
    /// disagree, a length is negative, the element count does not match the
    /// product of the lengths, or an element does not fit the element type.
    pub fn with_layout(
        element: ElementType,
        lengths: Vec<i32>,
        lower_bounds: Vec<i32>,
        elements: Vec<Option<Value>>,
    ) -> Result<ArrayValue> {
        if lengths.is_empty() || lengths.len() != lower_bounds.len() {
            return Err(Error::Malformed(format!(
                "array has {} dimension lengths but {} lower bounds",
                lengths.len(),
                lower_bounds.len()
            )));
        }
        if lengths.iter().any(|&len| len < 0) {
            return Err(Error::Malformed(
                "array dimension lengths must be non-negative".into(),
            ));
        }
        let expected: i64 = lengths.iter().map(|&len| len as i64).product();
        if expected != elements.len() as i64 {
            return Err(Error::Malformed(format!(
                "array holds {} elements but its dimension lengths require {}",
                elements.len(),
                expected
            )));
        }
        for item in &elements {
            match item {
                None if !element.accepts_null() => {
                    return Err(Error::Malformed(format!(
                        "a null element cannot be stored in an array of non-nullable '{}'",
                        element.index().kind_name()
                    )));
                }
                Some(value) if !element_fits(&element, value) => {
                    return Err(Error::Malformed(format!(
                        "an element of kind '{}' cannot be stored in an array of '{}'",
                        value.kind_name(),
                        element.index().kind_name()
                    )));
                }
                _ => {}
            }
        }
        Ok(ArrayValue {
            element,
            lengths,
            lower_bounds,
            elements,
        })
    }

    /// Builds a rank-1 `u8` array; used for the bit-pattern encoding of
    /// floating-point values.
    pub(crate) fn from_bytes(bytes: &[u8]) -> ArrayValue {
        let elements = bytes.iter().map(|&b| Some(Value::U8(b))).collect();
        ArrayValue::vector_unchecked(ElementType::of(TypeIndex::U8), elements)
    }

    /// Internal constructor for element sequences that are valid by
    /// construction (uniformly typed conversions).
    pub(crate) fn vector_unchecked(
        element: ElementType,
        elements: Vec<Option<Value>>,
    ) -> ArrayValue {
        let length = elements.len() as i32;
        ArrayValue {
            element,
            lengths: vec![length],
            lower_bounds: vec![0],
            elements,
        }
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    /// The number of dimensions.
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Total element count across all dimensions.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn lengths(&self) -> &[i32] {
        &self.lengths
    }

    pub fn lower_bounds(&self) -> &[i32] {
        &self.lower_bounds
    }

    /// Elements in row-major order; `None` entries are null elements.
    pub fn iter(&self) -> impl Iterator<Item = &Option<Value>> {
        self.elements.iter()
    }

    pub(crate) fn into_elements(self) -> Vec<Option<Value>> {
        self.elements
    }

    /// The element at the given logical indices, which are interpreted
    /// relative to each dimension's lower bound. Out-of-range indices yield
    /// `None`; a present-but-null element yields `Some(&None)`.
    pub fn get(&self, indices: &[i32]) -> Option<&Option<Value>> {
        if indices.len() != self.rank() {
            return None;
        }
        let mut offset = 0usize;
        for (dim, &index) in indices.iter().enumerate() {
            let relative = index.checked_sub(self.lower_bounds[dim])?;
            if relative < 0 || relative >= self.lengths[dim] {
                return None;
            }
            offset = offset * self.lengths[dim] as usize + relative as usize;
        }
        self.elements.get(offset)
    }

    /// Collects a rank-1 `u8` array back into raw bytes; used when decoding
    /// floating-point bit patterns.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        self.elements
            .iter()
            .map(|item| match item {
                Some(Value::U8(b)) => Ok(*b),
                Some(other) => Err(Error::Malformed(format!(
                    "expected a byte element, got '{}'",
                    other.kind_name()
                ))),
                None => Err(Error::Malformed("expected a byte element, got null".into())),
            })
            .collect()
    }
}

fn element_fits(element: &ElementType, value: &Value) -> bool {
    match value.scalar_index() {
        Some(idx) => element.index() == TypeIndex::Object || element.index() == idx,
        // Nested arrays only fit under untyped elements.
        None => element.index() == TypeIndex::Object,
    }
}
