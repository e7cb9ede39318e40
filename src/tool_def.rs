//! Tool definition types and JSON-Schema-like input schemas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Schema primitive type for a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// `"string"`.
    String,
    /// `"number"` (accepts integers too, per JSON Schema).
    Number,
    /// `"integer"`.
    Integer,
    /// `"boolean"`.
    Boolean,
    /// `"array"`.
    Array,
    /// `"object"`.
    Object,
    /// `"null"`.
    Null,
    /// Unrecognized or absent type declaration; conforms to anything.
    #[serde(other)]
    Unknown,
}

impl SchemaType {
    /// Parses a JSON Schema `type` string, mapping anything unrecognized to
    /// [`SchemaType::Unknown`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            "null" => Self::Null,
            _ => Self::Unknown,
        }
    }

    /// Checks whether a runtime JSON value conforms to this declared type.
    ///
    /// Uses the standard JSON Schema primitive mapping: an `integer` declares
    /// a whole number, a `number` accepts any numeric value. [`Self::Unknown`]
    /// conforms to everything.
    #[must_use]
    pub fn conforms(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
            Self::Unknown => true,
        }
    }
}

/// Declared schema for a single parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Declared JSON Schema type.
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: SchemaType,
    /// Human-readable description of the parameter.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_schema_type() -> SchemaType {
    SchemaType::Unknown
}

impl PropertySchema {
    /// Creates a property schema with the given type and no description.
    #[must_use]
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// A tool's input schema, as a tagged variant over what we can actually
/// validate against.
///
/// An absent or malformed schema degrades to [`InputSchema::Permissive`]:
/// no required fields, any parameter allowed, no type checking possible.
/// Malformed schemas are never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputSchema {
    /// A well-formed object schema with named properties.
    Object {
        /// Property name to declared schema. `BTreeMap` keeps iteration
        /// order deterministic across runs.
        properties: BTreeMap<String, PropertySchema>,
        /// Names of required properties.
        required: Vec<String>,
    },
    /// No usable schema; everything is allowed.
    Permissive,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::Permissive
    }
}

impl InputSchema {
    /// Builds an object schema from properties and required names.
    #[must_use]
    pub fn object(
        properties: BTreeMap<String, PropertySchema>,
        required: impl IntoIterator<Item = String>,
    ) -> Self {
        Self::Object {
            properties,
            required: required.into_iter().collect(),
        }
    }

    /// Parses a raw JSON Schema value into a tagged schema.
    ///
    /// Recognizes the `properties` / `required` shape emitted by MCP servers.
    /// Anything else (non-object, missing `properties`, wrong value shapes)
    /// degrades to [`InputSchema::Permissive`].
    #[must_use]
    pub fn from_json(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::Permissive;
        };
        let Some(props) = obj.get("properties").and_then(Value::as_object) else {
            return Self::Permissive;
        };

        let mut properties = BTreeMap::new();
        for (name, prop) in props {
            let schema_type = prop
                .get("type")
                .and_then(Value::as_str)
                .map_or(SchemaType::Unknown, SchemaType::parse);
            let description = prop
                .get("description")
                .and_then(Value::as_str)
                .map(String::from);
            properties.insert(
                name.clone(),
                PropertySchema {
                    schema_type,
                    description,
                },
            );
        }

        let required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self::Object {
            properties,
            required,
        }
    }

    /// Returns the declared schema for a property, if the schema knows it.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        match self {
            Self::Object { properties, .. } => properties.get(name),
            Self::Permissive => None,
        }
    }

    /// Returns the required property names (empty for permissive schemas).
    #[must_use]
    pub fn required(&self) -> &[String] {
        match self {
            Self::Object { required, .. } => required,
            Self::Permissive => &[],
        }
    }
}

/// Immutable snapshot of a tool definition, ingested once per evaluation run
/// per server and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, unique within a server + run scope.
    pub name: String,
    /// Tool description as published by the server.
    pub description: String,
    /// URL of the MCP server that published this tool.
    pub server_url: String,
    /// Input schema for the tool's parameters.
    #[serde(default)]
    pub input_schema: InputSchema,
    /// Optional output schema (not used for scoring).
    #[serde(default)]
    pub output_schema: Option<Value>,
}

impl ToolDefinition {
    /// Creates a tool definition with a permissive schema.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        server_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            server_url: server_url.into(),
            input_schema: InputSchema::Permissive,
            output_schema: None,
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Identity used in similarity results: `"{server_url}:{name}"`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}:{}", self.server_url, self.name)
    }

    /// Parameter names with their descriptions, in deterministic order.
    ///
    /// Empty for permissive schemas.
    #[must_use]
    pub fn parameters(&self) -> Vec<(&str, Option<&str>)> {
        match &self.input_schema {
            InputSchema::Object { properties, .. } => properties
                .iter()
                .map(|(name, prop)| (name.as_str(), prop.description.as_deref()))
                .collect(),
            InputSchema::Permissive => Vec::new(),
        }
    }
}
