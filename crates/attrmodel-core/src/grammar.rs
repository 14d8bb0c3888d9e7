//! The attribute type mini-language.
//!
//! ```text
//! decl  := ident ( "[" ident "]" )? "?"?
//! ident := word ( "::" word )*
//! word  := ( alphanumeric | "_" )+
//! ```
//!
//! `Set[Integer]?` is a nullable `Set` whose elements are `Integer`.

/// A parsed type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec<'a> {
    /// The outer type name.
    pub type_name: &'a str,
    /// The bracketed element type, if any.
    pub each: Option<&'a str>,
    /// Whether a trailing `?` was present.
    pub nullable: bool,
}

/// Parse a type declaration. Returns `None` if the input is malformed.
pub fn parse(input: &str) -> Option<TypeSpec<'_>> {
    let (type_name, mut rest) = identifier(input)?;

    let mut each = None;
    if let Some(after) = rest.strip_prefix('[') {
        let (inner, after) = identifier(after)?;
        rest = after.strip_prefix(']')?;
        each = Some(inner);
    }

    let nullable = match rest.strip_prefix('?') {
        Some(after) => {
            rest = after;
            true
        }
        None => false,
    };

    rest.is_empty().then_some(TypeSpec {
        type_name,
        each,
        nullable,
    })
}

/// Unqualified name: the last `::` segment.
pub fn short_name(name: &str) -> &str {
    name.rsplit_once("::").map_or(name, |(_, short)| short)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split a leading identifier off `input`.
fn identifier(input: &str) -> Option<(&str, &str)> {
    let mut end = 0;
    loop {
        let segment = &input[end..];
        let len = segment
            .char_indices()
            .find(|&(_, c)| !is_word_char(c))
            .map_or(segment.len(), |(i, _)| i);
        if len == 0 {
            return None;
        }
        end += len;

        match input[end..].strip_prefix("::") {
            Some(_) => end += 2,
            None => break,
        }
    }
    Some((&input[..end], &input[end..]))
}
