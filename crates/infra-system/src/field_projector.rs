// Field Projector
//
// Parser spec accepted here:
//   ["id", "name:display_name", {"name": "child_ids", "target": "children", "fields": ["name"]}]
// or the same list wrapped as {"fields": [...]}.
//
// A string entry is `field` or `field:target`. An object entry names the field,
// optionally renames it and optionally projects nested objects (or arrays of
// objects) with its own `fields` list. Missing fields project to null.

use jsonify_core::domain::Record;
use jsonify_core::port::{ProjectionError, Projector};
use serde_json::{Map, Value};

/// One entry of a parsed spec
#[derive(Debug, Clone, PartialEq)]
struct FieldSpec {
    name: String,
    target: String,
    nested: Option<Vec<FieldSpec>>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FieldProjector;

impl FieldProjector {
    pub fn new() -> Self {
        Self
    }
}

fn parse_spec(parser: &Value) -> Result<Vec<FieldSpec>, ProjectionError> {
    let entries = match parser {
        Value::Array(entries) => entries,
        Value::Object(obj) => match obj.get("fields") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(ProjectionError::InvalidParser(
                    "object parser needs a 'fields' array".to_string(),
                ))
            }
        },
        other => {
            return Err(ProjectionError::InvalidParser(format!(
                "expected array or object, got {}",
                other
            )))
        }
    };

    if entries.is_empty() {
        return Err(ProjectionError::InvalidParser(
            "parser selects no fields".to_string(),
        ));
    }

    entries.iter().map(parse_entry).collect()
}

fn parse_entry(entry: &Value) -> Result<FieldSpec, ProjectionError> {
    match entry {
        Value::String(raw) => {
            let (name, target) = match raw.split_once(':') {
                Some((name, target)) => (name.trim(), target.trim()),
                None => (raw.trim(), raw.trim()),
            };
            if name.is_empty() || target.is_empty() {
                return Err(ProjectionError::InvalidParser(format!(
                    "invalid field entry '{}'",
                    raw
                )));
            }
            Ok(FieldSpec {
                name: name.to_string(),
                target: target.to_string(),
                nested: None,
            })
        }
        Value::Object(obj) => {
            let name = match obj.get("name") {
                Some(Value::String(name)) if !name.is_empty() => name.clone(),
                _ => {
                    return Err(ProjectionError::InvalidParser(
                        "field object needs a non-empty 'name'".to_string(),
                    ))
                }
            };
            let target = match obj.get("target") {
                None | Some(Value::Null) => name.clone(),
                Some(Value::String(target)) if !target.is_empty() => target.clone(),
                Some(_) => {
                    return Err(ProjectionError::InvalidParser(format!(
                        "invalid 'target' for field '{}'",
                        name
                    )))
                }
            };
            let nested = match obj.get("fields") {
                None | Some(Value::Null) => None,
                Some(fields) => Some(parse_spec(fields)?),
            };
            Ok(FieldSpec {
                name,
                target,
                nested,
            })
        }
        other => Err(ProjectionError::InvalidParser(format!(
            "unsupported field entry {}",
            other
        ))),
    }
}

fn shape(values: Vec<(String, Value)>, with_field_names: bool) -> Value {
    if with_field_names {
        Value::Object(values.into_iter().collect::<Map<String, Value>>())
    } else {
        Value::Array(values.into_iter().map(|(_, value)| value).collect())
    }
}

fn project_value(
    value: Value,
    spec: &FieldSpec,
    with_field_names: bool,
    record_id: i64,
) -> Result<Value, ProjectionError> {
    let Some(nested) = &spec.nested else {
        return Ok(value);
    };

    match value {
        Value::Null => Ok(Value::Null),
        Value::Object(obj) => Ok(project_object(&obj, nested, with_field_names)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(obj) => Ok(project_object(&obj, nested, with_field_names)),
                Value::Null => Ok(Value::Null),
                other => Err(ProjectionError::Record {
                    record_id,
                    message: format!("field '{}' holds {} where an object was expected", spec.name, other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(ProjectionError::Record {
            record_id,
            message: format!(
                "field '{}' holds {} where an object was expected",
                spec.name, other
            ),
        }),
    }
}

// Below the top level, non-object values pass through unchanged
fn project_object(obj: &Map<String, Value>, specs: &[FieldSpec], with_field_names: bool) -> Value {
    let values = specs
        .iter()
        .map(|spec| {
            let value = obj.get(&spec.name).cloned().unwrap_or(Value::Null);
            let value = match &spec.nested {
                Some(nested) => match value {
                    Value::Object(inner) => project_object(&inner, nested, with_field_names),
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| match item {
                                Value::Object(inner) => {
                                    project_object(&inner, nested, with_field_names)
                                }
                                other => other,
                            })
                            .collect(),
                    ),
                    other => other,
                },
                None => value,
            };
            (spec.target.clone(), value)
        })
        .collect();
    shape(values, with_field_names)
}

impl Projector for FieldProjector {
    fn apply(
        &self,
        records: &[Record],
        parser: &Value,
        with_field_names: bool,
    ) -> Result<Vec<Value>, ProjectionError> {
        let specs = parse_spec(parser)?;

        records
            .iter()
            .map(|record| {
                let values = specs
                    .iter()
                    .map(|spec| {
                        let raw = record.get(&spec.name).unwrap_or(Value::Null);
                        let value = project_value(raw, spec, with_field_names, record.id)?;
                        Ok((spec.target.clone(), value))
                    })
                    .collect::<Result<Vec<_>, ProjectionError>>()?;
                Ok(shape(values, with_field_names))
            })
            .collect()
    }
}
