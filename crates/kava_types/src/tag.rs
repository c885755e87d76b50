//! Value tags identifying the runtime representation of a dispatch value.

use std::fmt;

/// The runtime representation of a single argument or return value.
///
/// Passed by value everywhere; a tag never owns anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    Str,
    Void,
}

impl Tag {
    /// Every tag with a fixed-width native representation.
    pub const SCALARS: [Tag; 8] = [
        Tag::Byte,
        Tag::Short,
        Tag::Int,
        Tag::Long,
        Tag::Float,
        Tag::Double,
        Tag::Boolean,
        Tag::Char,
    ];

    /// The runtime's type code for this tag.
    ///
    /// These are fixed per-tag codes used verbatim when resolving fields;
    /// method descriptors are supplied by the caller and passed through
    /// uninterpreted.
    pub fn descriptor(self) -> &'static str {
        match self {
            Tag::Byte => "B",
            Tag::Short => "S",
            Tag::Int => "I",
            Tag::Long => "J",
            Tag::Float => "F",
            Tag::Double => "D",
            Tag::Boolean => "Z",
            Tag::Char => "C",
            Tag::Str => "Ljava/lang/String;",
            Tag::Void => "V",
        }
    }

    #[inline]
    pub fn is_scalar(self) -> bool {
        !matches!(self, Tag::Str | Tag::Void)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::Byte => "byte",
            Tag::Short => "short",
            Tag::Int => "int",
            Tag::Long => "long",
            Tag::Float => "float",
            Tag::Double => "double",
            Tag::Boolean => "boolean",
            Tag::Char => "char",
            Tag::Str => "string",
            Tag::Void => "void",
        };
        f.write_str(name)
    }
}
