//! Basic type table
//!
//! Maps Go's predeclared scalar types onto a JSON-Schema `(type, format)`
//! pair.

use crate::types::schema::SchemaKind;

/// Lookup name for the timestamp sentinel (`time.Time`)
pub const TIMESTAMP: &str = "time";

const BASIC_TYPES: &[(&str, SchemaKind, Option<&str>)] = &[
    ("bool", SchemaKind::Boolean, None),
    ("uint", SchemaKind::Integer, Some("uint64")),
    ("uint8", SchemaKind::Integer, Some("uint8")),
    ("uint16", SchemaKind::Integer, Some("uint16")),
    ("uint32", SchemaKind::Integer, Some("uint32")),
    ("uint64", SchemaKind::Integer, Some("uint64")),
    ("int", SchemaKind::Integer, Some("int64")),
    ("int8", SchemaKind::Integer, Some("int8")),
    ("int16", SchemaKind::Integer, Some("int16")),
    ("int32", SchemaKind::Integer, Some("int32")),
    ("int64", SchemaKind::Integer, Some("int64")),
    ("uintptr", SchemaKind::Integer, Some("int64")),
    ("float32", SchemaKind::Number, Some("float32")),
    ("float64", SchemaKind::Number, Some("float64")),
    ("string", SchemaKind::String, None),
    ("complex64", SchemaKind::Number, Some("float")),
    ("complex128", SchemaKind::Number, Some("double")),
    ("byte", SchemaKind::String, Some("byte")),
    ("rune", SchemaKind::String, Some("byte")),
    (TIMESTAMP, SchemaKind::String, Some("date-time")),
];

/// Look up a basic type by name
pub fn basic_type(name: &str) -> Option<(SchemaKind, Option<&'static str>)> {
    BASIC_TYPES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, kind, format)| (*kind, *format))
}

/// All names in the table
pub fn basic_type_names() -> impl Iterator<Item = &'static str> {
    BASIC_TYPES.iter().map(|(n, _, _)| *n)
}

/// Map keys must encode as JSON object keys
pub fn is_string_like(name: &str) -> bool {
    name == "string"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_widths_are_64_bit() {
        assert_eq!(basic_type("int"), Some((SchemaKind::Integer, Some("int64"))));
        assert_eq!(basic_type("uintptr"), Some((SchemaKind::Integer, Some("int64"))));
        assert_eq!(basic_type("uint"), Some((SchemaKind::Integer, Some("uint64"))));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(basic_type("string"), Some((SchemaKind::String, None)));
        assert_eq!(basic_type("rune"), Some((SchemaKind::String, Some("byte"))));
        assert_eq!(basic_type("time"), Some((SchemaKind::String, Some("date-time"))));
        assert_eq!(basic_type("complex128"), Some((SchemaKind::Number, Some("double"))));
        assert_eq!(basic_type("error"), None);
        assert_eq!(basic_type_names().count(), 20);
    }
}
