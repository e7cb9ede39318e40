//! Schema matching: validating an extracted parameter set against a tool's
//! declared input schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool_def::{InputSchema, SchemaType};

/// A field whose runtime type does not conform to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMismatch {
    /// Parameter name.
    pub name: String,
    /// Declared JSON Schema type.
    pub expected_type: SchemaType,
    /// Short description of the runtime type actually seen.
    pub actual_type: String,
}

/// Result of checking actual parameters against an input schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Required fields absent from the actual parameters.
    pub missing: Vec<String>,
    /// Fields present in the actual parameters but not in the schema.
    pub hallucinated: Vec<String>,
    /// Fields present in both whose runtime type does not conform.
    pub type_mismatches: Vec<TypeMismatch>,
}

impl SchemaReport {
    /// True when nothing is missing, hallucinated, or mistyped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.hallucinated.is_empty() && self.type_mismatches.is_empty()
    }
}

fn describe_json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Checks actual parameters against a declared input schema.
///
/// Pure and total: a [`InputSchema::Permissive`] schema reports no required
/// fields, allows any parameter, and performs no type checking. Results are
/// ordered deterministically (schema order for `missing`, parameter order
/// for the rest).
#[must_use]
pub fn check_schema(schema: &InputSchema, actual: &BTreeMap<String, Value>) -> SchemaReport {
    let InputSchema::Object {
        properties,
        required,
    } = schema
    else {
        return SchemaReport::default();
    };

    let missing = required
        .iter()
        .filter(|name| !actual.contains_key(*name))
        .cloned()
        .collect();

    let mut hallucinated = Vec::new();
    let mut type_mismatches = Vec::new();
    for (name, value) in actual {
        match properties.get(name) {
            None => hallucinated.push(name.clone()),
            Some(prop) => {
                if !prop.schema_type.conforms(value) {
                    type_mismatches.push(TypeMismatch {
                        name: name.clone(),
                        expected_type: prop.schema_type,
                        actual_type: describe_json_type(value).to_string(),
                    });
                }
            }
        }
    }

    SchemaReport {
        missing,
        hallucinated,
        type_mismatches,
    }
}
