//! JSON-Schema style nodes produced by the resolver

use std::collections::BTreeMap;

use serde::Serialize;

/// Prefix of every `$ref` pointer
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Primitive schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

/// A schema node. Nodes with an `id` are named definitions; nodes without
/// one are inlined into their parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
}

impl Schema {
    /// Empty node carrying only identity; empty strings mean "none"
    pub fn named(id: &str, title: &str) -> Self {
        Self {
            id: Some(id.to_string()).filter(|s| !s.is_empty()),
            title: Some(title.to_string()).filter(|s| !s.is_empty()),
            ..Self::default()
        }
    }

    /// `{"$ref": "#/definitions/<id>"}`
    pub fn reference(id: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", DEFINITIONS_PREFIX, id)),
            ..Self::default()
        }
    }

    pub fn typed(mut self, kind: SchemaKind, format: Option<&str>) -> Self {
        self.kind = Some(kind);
        self.format = format.map(str::to_string);
        self
    }

    /// Insert a property; the first writer of a name wins
    pub fn set_property_if_absent(&mut self, name: &str, schema: Schema) -> bool {
        let properties = self.properties.get_or_insert_with(BTreeMap::new);
        if properties.contains_key(name) {
            return false;
        }
        properties.insert(name.to_string(), schema);
        true
    }

    /// Replace the body with `body`'s, keeping this node's id and title
    pub fn with_body(self, body: &Schema) -> Self {
        Self {
            id: self.id,
            title: self.title,
            ..body.clone()
        }
    }
}

/// Definition id → schema, ordered for stable output
pub type Definitions = BTreeMap<String, Schema>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_serialize_shape() {
        let mut node = Schema::named("samples.F", "F").typed(SchemaKind::Object, None);
        let map = Schema {
            additional_properties: Some(Box::new(Schema::default().typed(SchemaKind::String, None))),
            ..Schema::default().typed(SchemaKind::Object, None)
        };
        node.set_property_if_absent("FMap", map);
        node.set_property_if_absent("Next", Schema::reference("samples.F"));

        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "id": "samples.F",
                "title": "F",
                "type": "object",
                "properties": {
                    "FMap": {"type": "object", "additionalProperties": {"type": "string"}},
                    "Next": {"$ref": "#/definitions/samples.F"}
                }
            })
        );
    }

    #[test]
    fn test_first_property_writer_wins() {
        let mut node = Schema::default().typed(SchemaKind::Object, None);
        assert!(node.set_property_if_absent("X", Schema::default().typed(SchemaKind::String, None)));
        assert!(!node.set_property_if_absent("X", Schema::default().typed(SchemaKind::Integer, None)));
        assert_eq!(node.properties.unwrap()["X"].kind, Some(SchemaKind::String));
    }

    #[test]
    fn test_with_body_keeps_identity() {
        let body = Schema::named("other.B", "B").typed(SchemaKind::Integer, Some("int64"));
        let node = Schema::named("p.A", "A").with_body(&body);
        assert_eq!(node.id.as_deref(), Some("p.A"));
        assert_eq!(node.title.as_deref(), Some("A"));
        assert_eq!(node.format.as_deref(), Some("int64"));
        assert_eq!(Schema::reference("p.A").reference.as_deref(), Some("#/definitions/p.A"));
    }
}
