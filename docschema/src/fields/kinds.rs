use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use super::Field;
use crate::document::Document;
use crate::enumeration::Enumeration;
use crate::errors::{SchemaError, SchemaResult};
use crate::id::ObjectId;
use crate::registry;
use crate::types::DocumentType;
use crate::validators;
use crate::value::{Value, ValueMap};

/// Naive datetime layouts accepted from strings, interpreted as UTC.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default)]
pub struct StringRules {
    pub regex: Option<Regex>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntRules {
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatRules {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

/// Collection a list field produces after validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    #[default]
    Sequence,
    /// Duplicates are dropped, first occurrence wins.
    Set,
}

#[derive(Debug, Clone, Default)]
pub struct ListRules {
    pub element: Option<Box<Field>>,
    pub max_items: Option<usize>,
    pub container: ContainerKind,
}

#[derive(Debug, Clone, Default)]
pub struct DictRules {
    pub key: Option<Box<Field>>,
    pub value: Option<Box<Field>>,
}

/// Where an embedded field finds its document type.
#[derive(Debug, Clone)]
pub enum EmbeddedTarget {
    Type(Arc<DocumentType>),
    /// Resolved lazily so models can embed themselves.
    Model(fn() -> SchemaResult<Arc<DocumentType>>),
    Named(String),
}

impl EmbeddedTarget {
    pub fn resolve(&self) -> SchemaResult<Arc<DocumentType>> {
        match self {
            EmbeddedTarget::Type(target) => Ok(Arc::clone(target)),
            EmbeddedTarget::Model(resolve) => resolve(),
            EmbeddedTarget::Named(name) => registry::lookup(name).ok_or_else(|| {
                SchemaError::definition(name.as_str(), "embedded document type is not registered")
            }),
        }
    }

    pub fn name(&self) -> String {
        match self {
            EmbeddedTarget::Type(target) => target.name().to_owned(),
            EmbeddedTarget::Model(resolve) => resolve().map_or_else(|_| "?".to_owned(), |target| target.name().to_owned()),
            EmbeddedTarget::Named(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Any,
    String(StringRules),
    Email(StringRules),
    Url(StringRules),
    Uuid(StringRules),
    Int(IntRules),
    Float(FloatRules),
    Boolean,
    DateTime,
    Enum(Enumeration),
    ObjectId,
    List(ListRules),
    Dict(DictRules),
    Embedded(EmbeddedTarget),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::String(_) => "string",
            FieldKind::Email(_) => "email",
            FieldKind::Url(_) => "url",
            FieldKind::Uuid(_) => "uuid",
            FieldKind::Int(_) => "int",
            FieldKind::Float(_) => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Enum(_) => "enum",
            FieldKind::ObjectId => "object_id",
            FieldKind::List(_) => "list",
            FieldKind::Dict(_) => "dict",
            FieldKind::Embedded(_) => "embedded",
        }
    }

    /// Type rendering including element, key/value and target types, e.g. `list<int>`.
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Enum(enumeration) => format!("enum<{}>", enumeration.name()),
            FieldKind::List(rules) => {
                let outer = match rules.container {
                    ContainerKind::Sequence => "list",
                    ContainerKind::Set => "set",
                };
                match &rules.element {
                    Some(element) => format!("{outer}<{}>", element.kind.describe()),
                    None => outer.to_owned(),
                }
            }
            FieldKind::Dict(DictRules { key: None, value: None }) => "dict".to_owned(),
            FieldKind::Dict(rules) => {
                let key = rules.key.as_ref().map_or_else(|| "any".to_owned(), |key| key.kind.describe());
                let value = rules
                    .value
                    .as_ref()
                    .map_or_else(|| "any".to_owned(), |value| value.kind.describe());
                format!("dict<{key}, {value}>")
            }
            FieldKind::Embedded(target) => format!("embedded<{}>", target.name()),
            other => other.name().to_owned(),
        }
    }

    pub(super) fn string_rules_mut(&mut self) -> Option<&mut StringRules> {
        match self {
            FieldKind::String(rules) | FieldKind::Email(rules) | FieldKind::Url(rules) | FieldKind::Uuid(rules) => {
                Some(rules)
            }
            _ => None,
        }
    }

    pub(super) fn set_bound(&mut self, bound: Value, lower: bool) -> Result<(), String> {
        let option = if lower { "min_value" } else { "max_value" };
        match self {
            FieldKind::Int(rules) => {
                let bound = match bound {
                    Value::Int(bound) => bound,
                    Value::Float(bound) if integral(bound) => bound as i64,
                    other => return Err(format!("{option} for int fields must be an integer, got {other}")),
                };
                if lower {
                    rules.min_value = Some(bound);
                } else {
                    rules.max_value = Some(bound);
                }
                Ok(())
            }
            FieldKind::Float(rules) => {
                let Some(bound) = bound.as_f64() else {
                    return Err(format!("{option} for float fields must be numeric, got {bound}"));
                };
                if lower {
                    rules.min_value = Some(bound);
                } else {
                    rules.max_value = Some(bound);
                }
                Ok(())
            }
            other => Err(format!("{option} does not apply to {} fields", other.name())),
        }
    }

    pub(super) fn finalize(self, owner: &str, path: &str) -> SchemaResult<Self> {
        match self {
            FieldKind::String(ref rules)
            | FieldKind::Email(ref rules)
            | FieldKind::Url(ref rules)
            | FieldKind::Uuid(ref rules) => {
                if let (Some(min), Some(max)) = (rules.min_length, rules.max_length)
                    && min > max
                {
                    return Err(SchemaError::definition(
                        path,
                        format!("min_length {min} is greater than max_length {max}"),
                    ));
                }
                Ok(self)
            }
            FieldKind::Int(rules) => {
                if let (Some(min), Some(max)) = (rules.min_value, rules.max_value)
                    && min > max
                {
                    return Err(SchemaError::definition(
                        path,
                        format!("min_value {min} is greater than max_value {max}"),
                    ));
                }
                Ok(self)
            }
            FieldKind::Float(rules) => {
                if let (Some(min), Some(max)) = (rules.min_value, rules.max_value)
                    && min > max
                {
                    return Err(SchemaError::definition(
                        path,
                        format!("min_value {min} is greater than max_value {max}"),
                    ));
                }
                Ok(self)
            }
            FieldKind::Enum(ref enumeration) => {
                enumeration.check(path)?;
                Ok(self)
            }
            FieldKind::List(mut rules) => {
                if let Some(element) = rules.element.take() {
                    rules.element = Some(Box::new(element.finalize(owner, &format!("{path}[]"))?));
                }
                Ok(FieldKind::List(rules))
            }
            FieldKind::Dict(mut rules) => {
                if let Some(key) = rules.key.take() {
                    rules.key = Some(Box::new(key.finalize(owner, &format!("{path}{{key}}"))?));
                }
                if let Some(value) = rules.value.take() {
                    rules.value = Some(Box::new(value.finalize(owner, &format!("{path}{{value}}"))?));
                }
                Ok(FieldKind::Dict(rules))
            }
            FieldKind::Embedded(EmbeddedTarget::Named(ref name)) => {
                if name != owner && registry::lookup(name).is_none() {
                    return Err(SchemaError::definition(
                        path,
                        format!("embedded document type {name} is not registered"),
                    ));
                }
                Ok(self)
            }
            other => Ok(other),
        }
    }

    /// Type check/coercion followed by the kind's range and shape checks. Never called with null.
    pub(super) fn coerce(&self, field: &str, value: Value) -> SchemaResult<Value> {
        match self {
            FieldKind::Any => Ok(value),
            FieldKind::String(rules) => coerce_string(field, value, rules),
            FieldKind::Email(rules) => {
                let value = coerce_string(field, value, rules)?;
                check_format(field, value, validators::is_valid_email, "email address")
            }
            FieldKind::Url(rules) => {
                let value = coerce_string(field, value, rules)?;
                check_format(field, value, validators::is_valid_url, "URL")
            }
            FieldKind::Uuid(rules) => {
                let value = coerce_string(field, value, rules)?;
                check_format(field, value, validators::is_valid_uuid, "UUID")
            }
            FieldKind::Int(rules) => coerce_int(field, value, rules),
            FieldKind::Float(rules) => coerce_float(field, value, rules),
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value),
                other => Err(SchemaError::invalid_value(field, other, "value must be a boolean")),
            },
            FieldKind::DateTime => coerce_datetime(field, value),
            FieldKind::Enum(enumeration) => coerce_enum(field, value, enumeration),
            FieldKind::ObjectId => match value {
                Value::ObjectId(_) => Ok(value),
                Value::String(ref raw) => match ObjectId::parse_str(raw) {
                    Ok(id) => Ok(Value::ObjectId(id)),
                    Err(err) => Err(SchemaError::invalid_value(field, value, err.to_string())),
                },
                other => Err(SchemaError::invalid_value(field, other, "value must be an object id")),
            },
            FieldKind::List(rules) => coerce_list(field, value, rules),
            FieldKind::Dict(rules) => coerce_dict(field, value, rules),
            FieldKind::Embedded(target) => coerce_embedded(field, value, target),
        }
    }
}

fn integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64
}

fn coerce_string(field: &str, value: Value, rules: &StringRules) -> SchemaResult<Value> {
    let Value::String(text) = &value else {
        return Err(SchemaError::invalid_value(field, value, "value must be a string"));
    };
    let length = text.chars().count();
    if let Some(min) = rules.min_length
        && length < min
    {
        return Err(SchemaError::invalid_value(
            field,
            value,
            format!("value must be at least {min} characters long"),
        ));
    }
    if let Some(max) = rules.max_length
        && length > max
    {
        return Err(SchemaError::invalid_value(
            field,
            value,
            format!("value must be at most {max} characters long"),
        ));
    }
    if let Some(regex) = &rules.regex
        && !regex.find(text).is_some_and(|found| found.start() == 0)
    {
        return Err(SchemaError::invalid_value(
            field,
            value,
            format!("value does not match pattern {}", regex.as_str()),
        ));
    }
    Ok(value)
}

fn check_format(field: &str, value: Value, valid: fn(&str) -> bool, what: &str) -> SchemaResult<Value> {
    if value.as_str().is_some_and(valid) {
        Ok(value)
    } else {
        Err(SchemaError::invalid_value(field, value, format!("value is not a valid {what}")))
    }
}

fn coerce_int(field: &str, value: Value, rules: &IntRules) -> SchemaResult<Value> {
    let number = match &value {
        Value::Int(number) => *number,
        Value::Float(number) if integral(*number) => *number as i64,
        Value::String(raw) => match raw.trim().parse::<i64>() {
            Ok(number) => number,
            Err(_) => return Err(SchemaError::invalid_value(field, value, "value must be an integer")),
        },
        _ => return Err(SchemaError::invalid_value(field, value, "value must be an integer")),
    };
    if let Some(min) = rules.min_value
        && number < min
    {
        return Err(SchemaError::invalid_value(field, value, format!("value must be at least {min}")));
    }
    if let Some(max) = rules.max_value
        && number > max
    {
        return Err(SchemaError::invalid_value(field, value, format!("value must be at most {max}")));
    }
    Ok(Value::Int(number))
}

fn coerce_float(field: &str, value: Value, rules: &FloatRules) -> SchemaResult<Value> {
    let number = match &value {
        Value::Float(number) => *number,
        Value::Int(number) => *number as f64,
        Value::String(raw) => match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => number,
            _ => return Err(SchemaError::invalid_value(field, value, "value must be a number")),
        },
        _ => return Err(SchemaError::invalid_value(field, value, "value must be a number")),
    };
    if let Some(min) = rules.min_value
        && number < min
    {
        return Err(SchemaError::invalid_value(field, value, format!("value must be at least {min}")));
    }
    if let Some(max) = rules.max_value
        && number > max
    {
        return Err(SchemaError::invalid_value(field, value, format!("value must be at most {max}")));
    }
    Ok(Value::Float(number))
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.and_utc())
}

fn coerce_datetime(field: &str, value: Value) -> SchemaResult<Value> {
    match &value {
        Value::DateTime(_) => Ok(value),
        Value::String(raw) => match parse_datetime(raw) {
            Some(parsed) => Ok(Value::DateTime(parsed)),
            None => Err(SchemaError::invalid_value(field, value, "value is not a recognised datetime")),
        },
        _ => Err(SchemaError::invalid_value(field, value, "value must be a datetime")),
    }
}

fn coerce_enum(field: &str, value: Value, enumeration: &Enumeration) -> SchemaResult<Value> {
    let found = match &value {
        Value::Enum(member) if enumeration.contains(member) => return Ok(value),
        Value::Enum(member) => enumeration.lookup(member.value()),
        Value::String(raw) => enumeration.lookup(raw),
        _ => None,
    };
    match found {
        Some(member) => Ok(Value::Enum(member)),
        None => Err(SchemaError::invalid_value(
            field,
            value,
            format!("value is not a member of {}", enumeration.name()),
        )),
    }
}

fn coerce_list(field: &str, value: Value, rules: &ListRules) -> SchemaResult<Value> {
    let items = match value {
        Value::List(items) | Value::Set(items) => items,
        other => return Err(SchemaError::invalid_value(field, other, "value must be a list")),
    };
    let items = match &rules.element {
        Some(element) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| element.validate_as(&format!("{field}[{index}]"), item))
            .collect::<SchemaResult<Vec<_>>>()?,
        None => items,
    };
    let value = match rules.container {
        ContainerKind::Sequence => Value::List(items),
        ContainerKind::Set => {
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            Value::Set(unique)
        }
    };
    if let Some(max) = rules.max_items
        && value.as_items().is_some_and(|items| items.len() > max)
    {
        return Err(SchemaError::invalid_value(
            field,
            value,
            format!("value must have at most {max} items"),
        ));
    }
    Ok(value)
}

fn key_label(key: &Value) -> String {
    key.as_str().map_or_else(|| key.to_string(), str::to_owned)
}

fn coerce_dict(field: &str, value: Value, rules: &DictRules) -> SchemaResult<Value> {
    let map = match value {
        Value::Map(map) => map,
        other => return Err(SchemaError::invalid_value(field, other, "value must be a mapping")),
    };
    if rules.key.is_none() && rules.value.is_none() {
        return Ok(Value::Map(map));
    }
    let mut validated = ValueMap::with_capacity(map.len());
    for (key, item) in map {
        let label = key_label(&key);
        let key = match &rules.key {
            Some(validator) => validator.validate_as(&format!("{field}{{{label}}}"), key)?,
            None => key,
        };
        let item = match &rules.value {
            Some(validator) => validator.validate_as(&format!("{field}.{label}"), item)?,
            None => item,
        };
        validated.insert(key, item);
    }
    Ok(Value::Map(validated))
}

fn coerce_embedded(field: &str, value: Value, target: &EmbeddedTarget) -> SchemaResult<Value> {
    let target = target.resolve()?;
    match value {
        Value::Document(document) => {
            if document.doc_type().is_subtype_of(&target) {
                Ok(Value::Document(document))
            } else {
                let message = format!("value must be a {} document", target.name());
                Err(SchemaError::invalid_value(field, Value::Document(document), message))
            }
        }
        Value::Map(map) => {
            if map.iter().any(|(key, _)| key.as_str().is_none()) {
                return Err(SchemaError::invalid_value(
                    field,
                    Value::Map(map),
                    "embedded document keys must be strings",
                ));
            }
            let pairs = map
                .into_iter()
                .filter_map(|(key, item)| match key {
                    Value::String(key) => Some((key, item)),
                    _ => None,
                });
            Ok(Value::Document(Box::new(Document::new(&target, pairs)?)))
        }
        other => {
            let message = format!("value must be a {} document or a mapping", target.name());
            Err(SchemaError::invalid_value(field, other, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn int_coercion_accepts_integral_inputs_only() {
        let field = Field::int();
        assert_eq!(field.validate(7).unwrap(), Value::Int(7));
        assert_eq!(field.validate(7.0).unwrap(), Value::Int(7));
        assert_eq!(field.validate(" 42 ").unwrap(), Value::Int(42));
        assert!(field.validate(7.5).is_err());
        assert!(field.validate("seven").is_err());
        assert!(field.validate(true).is_err());
    }

    #[test]
    fn float_coercion_widens_ints_and_rejects_non_finite_strings() {
        let field = Field::float().min_value(0).max_value(1.5);
        assert_eq!(field.validate(1).unwrap(), Value::Float(1.0));
        assert_eq!(field.validate("0.25").unwrap(), Value::Float(0.25));
        assert!(field.validate("inf").is_err());
        assert!(field.validate(2).is_err());
    }

    #[test]
    fn string_length_counts_characters() {
        let field = Field::string().min_length(2).max_length(3);
        assert!(field.validate("héé").is_ok());
        assert!(field.validate("h").is_err());
        assert!(field.validate("héééé").is_err());
    }

    #[test]
    fn regex_must_match_at_start() {
        let field = Field::string().regex("[a-z]+");
        assert!(field.validate("abc123").is_ok());
        assert!(field.validate("123abc").is_err());
    }

    #[test]
    fn datetime_strings_parse_as_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let field = Field::datetime();
        assert_eq!(field.validate("2024-05-01T12:30:00Z").unwrap(), Value::DateTime(expected));
        assert_eq!(field.validate("2024-05-01 12:30:00").unwrap(), Value::DateTime(expected));
        assert_eq!(field.validate("2024-05-01T14:30:00+02:00").unwrap(), Value::DateTime(expected));
        assert!(field.validate("yesterday").is_err());
    }

    #[test]
    fn set_container_deduplicates_in_order() {
        let field = Field::set_of(Field::int());
        let value = field.validate(vec![Value::from(3), Value::from("1"), Value::from(3)]).unwrap();
        assert_eq!(value, Value::Set(vec![Value::Int(3), Value::Int(1)]));
    }

    #[test]
    fn max_items_applies_after_population() {
        let field = Field::set_of(Field::int()).max_items(2);
        assert!(field.validate(vec![1, 1, 2]).is_ok());
        assert!(field.validate(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn list_element_errors_report_index_path() {
        let field = Field::list_of(Field::int()).name("scores");
        let err = field.validate(vec![Value::from(1), Value::from("x")]).unwrap_err();
        assert_eq!(err.field(), Some("scores[1]"));
    }

    #[test]
    fn dict_validators_rebuild_mapping() {
        let field = Field::dict().keys(Field::string().min_length(2)).values(Field::int()).name("counts");
        let input: ValueMap = [("ab", Value::from("4"))].into_iter().collect();
        let output: ValueMap = [("ab", 4)].into_iter().collect();
        assert_eq!(field.validate(input).unwrap(), Value::Map(output));

        let bad_value: ValueMap = [("ab", "four")].into_iter().collect();
        assert_eq!(field.validate(bad_value).unwrap_err().field(), Some("counts.ab"));

        let bad_key: ValueMap = [("a", 1)].into_iter().collect();
        assert_eq!(field.validate(bad_key).unwrap_err().field(), Some("counts{a}"));
    }

    #[test]
    fn describe_renders_nested_types() {
        assert_eq!(Field::list_of(Field::int()).kind().describe(), "list<int>");
        assert_eq!(Field::set_of(Field::email()).kind().describe(), "set<email>");
        assert_eq!(Field::dict().values(Field::float()).kind().describe(), "dict<any, float>");
    }

    #[test]
    fn object_id_accepts_hex_strings() {
        let field = Field::object_id();
        let parsed = field.validate("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(parsed.as_object_id().map(|id| id.to_hex()).as_deref(), Some("507f1f77bcf86cd799439011"));
        assert!(field.validate("nope").is_err());
    }
}
