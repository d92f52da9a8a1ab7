//! Declared response shapes and the validator that enforces them.
//!
//! Every agent owns one [`SchemaDescriptor`]. The descriptor is sent to the model as a
//! response schema and then used to check whatever comes back. Mismatches are rejected,
//! never coerced: a string where a list is expected is an error, not a one-item list.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::SchemaValidationError;
use crate::model::{AgentRole, FieldValue, ResearchResult, ResultField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TextList,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => f.write_str("a string"),
            FieldKind::TextList => f.write_str("a list of strings"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required_text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: true,
            description,
        }
    }

    pub const fn optional_text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: false,
            description,
        }
    }

    pub const fn required_list(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::TextList,
            required: true,
            description,
        }
    }

    pub const fn optional_list(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::TextList,
            required: false,
            description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SchemaDescriptor {
    pub const fn new(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.required)
    }

    /// Response schema in the OpenAPI subset accepted by Gemini's `responseSchema`.
    pub fn to_response_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in self.fields {
            let mut property = match spec.kind {
                FieldKind::Text => json!({ "type": "STRING" }),
                FieldKind::TextList => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
            };
            property["description"] = Value::from(spec.description);
            if !spec.required {
                property["nullable"] = Value::Bool(true);
            }
            properties.insert(spec.name.to_string(), property);
        }

        let required: Vec<&str> = self.required_fields().map(|spec| spec.name).collect();
        let ordering: Vec<&str> = self.fields.iter().map(|spec| spec.name).collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
            "propertyOrdering": ordering,
        })
    }

    /// Field list for prompt templates, one line per field.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|spec| {
                let kind = match spec.kind {
                    FieldKind::Text => "string",
                    FieldKind::TextList => "list of strings",
                };
                let presence = if spec.required {
                    "required"
                } else {
                    "optional, null if unknown"
                };
                format!("- \"{}\" ({kind}, {presence}): {}", spec.name, spec.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse a raw completion body and check it against this schema.
    ///
    /// Optional fields that are absent, `null`, or blank are left out of the result.
    /// Keys the schema does not declare are ignored.
    pub fn validate(
        &self,
        source: AgentRole,
        raw: &str,
    ) -> Result<ResearchResult, SchemaValidationError> {
        let body = strip_code_fence(raw);
        let value: Value =
            serde_json::from_str(body).map_err(|err| SchemaValidationError::NotJson {
                message: err.to_string(),
            })?;

        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(SchemaValidationError::NotAnObject {
                    found: json_kind(&other),
                });
            }
        };

        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            let present = match object.get(spec.name) {
                None | Some(Value::Null) => None,
                Some(value) => Some(convert(spec, value)?),
            };

            match present {
                Some(value) if !is_blank(&value) => fields.push(ResultField {
                    name: spec.name.to_string(),
                    value,
                }),
                Some(value) if spec.required => {
                    // Empty lists are a legitimate answer, blank text is not.
                    if matches!(value, FieldValue::List(_)) {
                        fields.push(ResultField {
                            name: spec.name.to_string(),
                            value,
                        });
                    } else {
                        return Err(SchemaValidationError::BlankField {
                            field: spec.name.to_string(),
                        });
                    }
                }
                None if spec.required => {
                    return Err(SchemaValidationError::MissingField {
                        field: spec.name.to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(ResearchResult::new(source, fields))
    }
}

fn convert(spec: &FieldSpec, value: &Value) -> Result<FieldValue, SchemaValidationError> {
    let wrong_type = || SchemaValidationError::WrongType {
        field: spec.name.to_string(),
        expected: spec.kind,
    };

    match (spec.kind, value) {
        (FieldKind::Text, Value::String(text)) => Ok(FieldValue::Text(text.clone())),
        (FieldKind::TextList, Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong_type))
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::List),
        _ => Err(wrong_type()),
    }
}

fn is_blank(value: &FieldValue) -> bool {
    match value {
        FieldValue::Text(text) => text.trim().is_empty(),
        FieldValue::List(items) => items.is_empty(),
    }
}

/// Models sometimes wrap JSON in a markdown fence despite instructions.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
