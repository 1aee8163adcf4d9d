use std::fmt;

/// A portable type descriptor, round-tripped through its serialized name.
///
/// The serialized form is `Base` for intrinsic types and `Base,origin`
/// otherwise, where `origin` names the crate/package that owns the type.
/// A closed generic type renders its arguments as a bracket-delimited,
/// comma-separated list of bracket-wrapped names
/// (`Map[[String],[Vec[[i32]]]]`), and array types append one bracket group
/// per dimension block (`[]` rank 1, `[,]` rank 2, ...), listed
/// element-first: the last group is the outermost dimension block.
/// Nullability is spelled with the intrinsic `Option` wrapper
/// (`Option[[i32]]`).
///
/// Parsing is total and never panics; malformed input yields `None` so that
/// callers can treat "could not resolve type" as a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    base: String,
    origin: Option<String>,
    args: Vec<TypeName>,
    ranks: Vec<u32>,
}

impl TypeName {
    /// A type from the intrinsic namespace; no origin suffix is rendered.
    pub fn intrinsic(base: impl Into<String>) -> TypeName {
        TypeName {
            base: base.into(),
            origin: None,
            args: Vec::new(),
            ranks: Vec::new(),
        }
    }

    /// A type owned by the given origin.
    pub fn new(base: impl Into<String>, origin: impl Into<String>) -> TypeName {
        TypeName {
            base: base.into(),
            origin: Some(origin.into()),
            args: Vec::new(),
            ranks: Vec::new(),
        }
    }

    /// A closed generic type with the given arguments.
    pub fn generic(
        base: impl Into<String>,
        origin: Option<&str>,
        args: Vec<TypeName>,
    ) -> TypeName {
        TypeName {
            base: base.into(),
            origin: origin.map(str::to_owned),
            args,
            ranks: Vec::new(),
        }
    }

    /// Wraps a type in the intrinsic nullable wrapper.
    pub fn optional(inner: TypeName) -> TypeName {
        TypeName {
            base: "Option".to_owned(),
            origin: None,
            args: vec![inner],
            ranks: Vec::new(),
        }
    }

    /// Wraps this type in an array dimension block of the given rank.
    ///
    /// The new block is the outermost one. Rank 0 is not a valid array rank
    /// and is ignored.
    pub fn array_of(mut self, rank: u32) -> TypeName {
        if rank > 0 {
            self.ranks.push(rank);
        }
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn args(&self) -> &[TypeName] {
        &self.args
    }

    /// Array dimension blocks, element-first.
    pub fn ranks(&self) -> &[u32] {
        &self.ranks
    }

    pub fn is_array(&self) -> bool {
        !self.ranks.is_empty()
    }

    /// Whether this is the intrinsic nullable wrapper around another type.
    pub fn is_optional(&self) -> bool {
        self.origin.is_none()
            && self.ranks.is_empty()
            && self.base == "Option"
            && self.args.len() == 1
    }

    /// Strips one level of the nullable wrapper, if present.
    pub fn unwrap_optional(&self) -> (&TypeName, bool) {
        if self.is_optional() {
            (&self.args[0], true)
        } else {
            (self, false)
        }
    }

    /// Removes the outermost array dimension block, yielding the element
    /// type, or `None` when this is not an array.
    pub(crate) fn strip_outer_rank(&self) -> Option<TypeName> {
        if self.ranks.is_empty() {
            return None;
        }
        let mut element = self.clone();
        element.ranks.pop();
        Some(element)
    }

    /// Renders the serialized name.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.base.len() + 8);
        out.push_str(&self.base);
        if !self.args.is_empty() {
            out.push('[');
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('[');
                out.push_str(&arg.render());
                out.push(']');
            }
            out.push(']');
        }
        for &rank in &self.ranks {
            out.push('[');
            for _ in 1..rank {
                out.push(',');
            }
            out.push(']');
        }
        if let Some(origin) = &self.origin {
            out.push(',');
            out.push_str(origin);
        }
        out
    }

    /// Parses a serialized name back into a descriptor.
    ///
    /// Returns `None` for malformed input: unbalanced brackets, an empty base
    /// name, an invalid rank group, or an origin that is itself bracketed.
    pub fn parse(text: &str) -> Option<TypeName> {
        let parts = split_outer_commas(text)?;
        let (type_part, origin) = match parts.as_slice() {
            [type_part] => (*type_part, None),
            [type_part, origin] => {
                let origin = origin.trim();
                if origin.is_empty() || origin.contains(['[', ']']) {
                    return None;
                }
                (*type_part, Some(origin.to_owned()))
            }
            _ => return None,
        };

        let mut name = parse_type_part(type_part.trim())?;
        name.origin = origin;
        Some(name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Parses the portion of a name before any origin suffix.
fn parse_type_part(text: &str) -> Option<TypeName> {
    let Some(first_open) = text.find('[') else {
        if text.is_empty() || text.contains([']', ',']) {
            return None;
        }
        return Some(TypeName::intrinsic(text));
    };
    if first_open == 0 {
        return None;
    }
    let base = &text[..first_open];

    // Walk to the close that matches the first bracket. A group containing
    // any character other than brackets and commas is a generic-argument
    // list; a group of commas only is array-rank syntax.
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut close = None;
    let mut saw_non_designator = false;
    for (pos, &b) in bytes.iter().enumerate().skip(first_open) {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(pos);
                    break;
                }
            }
            b',' => {}
            _ => saw_non_designator = true,
        }
    }
    let close = close?;

    if saw_non_designator {
        let arg_list = &text[first_open + 1..close];
        let mut args = Vec::new();
        for piece in split_outer_commas(arg_list)? {
            let piece = piece.trim();
            if !(piece.starts_with('[') && piece.ends_with(']') && piece.len() >= 2) {
                return None;
            }
            args.push(TypeName::parse(&piece[1..piece.len() - 1])?);
        }
        let ranks = parse_rank_groups(&text[close + 1..])?;
        Some(TypeName {
            base: base.to_owned(),
            origin: None,
            args,
            ranks,
        })
    } else {
        let ranks = parse_rank_groups(&text[first_open..])?;
        Some(TypeName {
            base: base.to_owned(),
            origin: None,
            args: Vec::new(),
            ranks,
        })
    }
}

/// Parses a run of array dimension blocks (`[]`, `[,]`, ...); the whole
/// input must be consumed. The empty string parses to no blocks.
fn parse_rank_groups(text: &str) -> Option<Vec<u32>> {
    let mut ranks = Vec::new();
    let mut chars = text.chars();
    loop {
        match chars.next() {
            None => return Some(ranks),
            Some('[') => {
                let mut rank = 1u32;
                loop {
                    match chars.next() {
                        Some(',') => rank += 1,
                        Some(']') => break,
                        _ => return None,
                    }
                }
                ranks.push(rank);
            }
            Some(_) => return None,
        }
    }
}

/// Splits at commas that sit outside any bracket group.
///
/// Returns `None` when brackets are unbalanced or a segment is empty, so
/// that a malformed name fails as a whole rather than resolving partially.
fn split_outer_commas(text: &str) -> Option<Vec<&str>> {
    let mut results = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (pos, b) in text.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            b',' if depth == 0 => {
                results.push(&text[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || start >= text.len() {
        return None;
    }
    results.push(&text[start..]);
    Some(results)
}
