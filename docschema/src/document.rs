//! Document instances: construction pipeline, attribute access and serialization.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::errors::{SchemaError, SchemaResult};
use crate::fields::Field;
use crate::id::ObjectId;
use crate::serialize::serialize_fallback;
use crate::types::{DocumentType, PRIMARY_KEY, SchemaEntry, slot_name};
use crate::value::Value;

static NULL: Value = Value::Null;

/// A populated instance of a [`DocumentType`].
///
/// Construction runs the type's init hooks, populates every schema slot from the supplied values
/// or the field defaults, handles leftovers according to the type's flexibility and finally runs
/// the validate hook. Values are validated whenever they are set through a declared field.
#[derive(Clone)]
pub struct Document {
    doc_type: Arc<DocumentType>,
    values: HashMap<String, Value>,
    initializing: bool,
}

impl Document {
    pub fn new<I, K, V>(doc_type: &Arc<DocumentType>, values: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut supplied: HashMap<String, Value> = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        let mut document = Self {
            doc_type: Arc::clone(doc_type),
            values: HashMap::new(),
            initializing: true,
        };

        for hook in doc_type.init_hooks() {
            hook(&mut document)?;
        }

        let schema = doc_type.schema();
        for entry in schema.sorted() {
            // null counts as absent for declared slots
            let value = [entry.external_name(), entry.slot.as_str(), entry.attribute.as_str()]
                .into_iter()
                .filter_map(|key| supplied.remove(key))
                .find(|value| !value.is_null());
            let value = match value {
                Some(value) => value,
                None if document.values.contains_key(&entry.attribute) => continue,
                None => match &entry.field {
                    Some(field) => field.default_value()?,
                    None => Value::Null,
                },
            };
            if value.is_null() {
                document.values.insert(entry.attribute.clone(), Value::Null);
                continue;
            }
            document.store(entry, value)?;
        }
        document.initializing = false;

        if !supplied.is_empty() {
            let mut leftovers: Vec<(String, Value)> = supplied.into_iter().collect();
            leftovers.sort_by(|left, right| left.0.cmp(&right.0));
            if !schema.is_flexible() {
                return Err(SchemaError::extra_fields(
                    doc_type.name(),
                    leftovers.into_iter().map(|(key, _)| key),
                ));
            }
            for (key, value) in leftovers {
                document.set_field(&key, value)?;
            }
        }

        if let Some(hook) = doc_type.validate_hook() {
            hook(&document)?;
        }
        log::trace!("constructed {} document", doc_type.name());
        Ok(document)
    }

    /// Document populated from defaults only.
    pub fn with_defaults(doc_type: &Arc<DocumentType>) -> SchemaResult<Self> {
        Self::new(doc_type, std::iter::empty::<(String, Value)>())
    }

    pub fn from_json(doc_type: &Arc<DocumentType>, json: JsonValue) -> SchemaResult<Self> {
        match json {
            JsonValue::Object(object) => Self::new(doc_type, object.into_iter().map(|(key, value)| (key, Value::from(value)))),
            other => Err(SchemaError::invalid_value(
                doc_type.name(),
                Value::from(other),
                "document must be a JSON object",
            )),
        }
    }

    pub fn doc_type(&self) -> &Arc<DocumentType> {
        &self.doc_type
    }

    pub fn type_name(&self) -> &str {
        self.doc_type.name()
    }

    fn store(&mut self, entry: &SchemaEntry, value: Value) -> SchemaResult<()> {
        let value = match &entry.field {
            Some(field) => field.validate_as(entry.external_name(), value)?,
            None => value,
        };
        self.values.insert(entry.attribute.clone(), value);
        Ok(())
    }

    /// Sets an attribute.
    ///
    /// Declared slots validate the value. Unknown names extend the schema while the document is
    /// initialising, are rejected on strict types, and are stored unvalidated on flexible ones.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> SchemaResult<()> {
        let value = value.into();
        if let Some(entry) = self.doc_type.entry(name) {
            return self.store(&entry, value);
        }
        let slot = slot_name(name);
        if self.initializing {
            let entry = self
                .doc_type
                .resolve_or_extend(slot, Some(|| SchemaEntry::placeholder(slot)))
                .ok_or_else(|| SchemaError::not_found(slot))?;
            return self.store(&entry, value);
        }
        if !self.doc_type.is_flexible() {
            return Err(SchemaError::extra_fields(self.doc_type.name(), [slot]));
        }
        self.values.insert(name.to_owned(), value);
        Ok(())
    }

    /// Adds a declared field to the type's schema. Only allowed from init hooks; when the slot
    /// already exists the existing declaration is kept.
    pub fn declare_field(&mut self, attribute: &str, field: Field) -> SchemaResult<()> {
        if !self.initializing {
            return Err(SchemaError::definition(
                attribute,
                "fields can only be declared while the document is initialising",
            ));
        }
        let slot = slot_name(attribute);
        let field = field.finalize(self.doc_type.name(), slot)?;
        field.bind_name(slot);
        self.doc_type
            .resolve_or_extend(slot, Some(|| SchemaEntry::declared(attribute, field)));
        Ok(())
    }

    /// Stored value for `name`, looked up directly and then through the schema.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value);
        }
        let entry = self.doc_type.entry(name)?;
        self.values.get(&entry.attribute)
    }

    /// Like [`Document::get`], but falls back to the field default and reports unknown names.
    pub fn try_get(&self, name: &str) -> SchemaResult<Value> {
        if let Some(value) = self.get(name) {
            return Ok(value.clone());
        }
        match self.doc_type.field(name) {
            Some(field) => field.default_value(),
            None => Err(SchemaError::not_found(name)),
        }
    }

    pub fn get_or(&self, name: &str, fallback: impl Into<Value>) -> Value {
        match self.get(name) {
            Some(value) if !value.is_null() => value.clone(),
            _ => fallback.into(),
        }
    }

    /// True when `name` holds a non-null value.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_null())
    }

    /// Returns the current value and clears the slot when the value was truthy.
    pub fn pop(&mut self, name: &str) -> Option<Value> {
        let key = if self.values.contains_key(name) {
            name.to_owned()
        } else {
            self.doc_type.entry(name)?.attribute
        };
        let value = self.values.get(&key)?.clone();
        if value.is_truthy() {
            self.values.insert(key, Value::Null);
        }
        Some(value)
    }

    /// Sets every pair in order, stopping at the first failure.
    pub fn update<I, K, V>(&mut self, values: I) -> SchemaResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in values {
            self.set_field(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// External names of the non-null values, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.to_dict().keys().cloned().collect()
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.get(PRIMARY_KEY).and_then(Value::as_object_id)
    }

    pub fn set_id(&mut self, id: ObjectId) -> SchemaResult<()> {
        self.set_field(PRIMARY_KEY, id)
    }

    /// Fails with a missing-fields error naming every listed field that is null or absent.
    pub fn require_fields(&self, names: &[&str]) -> SchemaResult<()> {
        let missing: Vec<&str> = names.iter().copied().filter(|name| !self.contains(name)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::missing_fields(self.type_name(), missing))
        }
    }

    /// JSON object keyed by external names; null values are omitted.
    pub fn to_dict(&self) -> Map<String, JsonValue> {
        let schema = self.doc_type.schema();
        let mut dict = Map::new();
        let mut covered = HashSet::new();
        for entry in schema.iter() {
            covered.insert(entry.attribute.as_str());
            if let Some(value) = self.values.get(&entry.attribute)
                && !value.is_null()
            {
                dict.insert(entry.external_name().to_owned(), serialize_value(value));
            }
        }
        for (key, value) in &self.values {
            if !covered.contains(key.as_str()) && !value.is_null() {
                dict.insert(slot_name(key).to_owned(), serialize_value(value));
            }
        }
        dict
    }

    pub fn to_json(&self) -> String {
        JsonValue::Object(self.to_dict()).to_string()
    }

    /// Rebuilds an equal document of the same type from [`Document::to_dict`].
    pub fn copy(&self) -> SchemaResult<Self> {
        self.copy_with(std::iter::empty::<(String, Value)>())
    }

    /// Copy with `overrides` applied on top of the serialized values.
    pub fn copy_with<I, K, V>(&self, overrides: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut values: HashMap<String, Value> = self
            .to_dict()
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();
        for (key, value) in overrides {
            values.insert(key.into(), value.into());
        }
        Self::new(&self.doc_type, values)
    }
}

/// JSON form of any value; documents become their [`Document::to_dict`] object.
pub(crate) fn serialize_value(value: &Value) -> JsonValue {
    match value {
        Value::Document(document) => JsonValue::Object(document.to_dict()),
        other => serialize_fallback(other),
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.to_dict() == other.to_dict()
    }
}

impl Index<&str> for Document {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        self.get(name).unwrap_or(&NULL)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.to_json())
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_dict().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Arc<DocumentType> {
        DocumentType::builder("Person")
            .field("_name", Field::string().required())
            .field("age", Field::int().min_value(0).default(18))
            .field("nickname", Field::string())
            .strict()
            .declare()
            .unwrap()
    }

    #[test]
    fn defaults_fill_missing_slots() {
        let doc = Document::new(&person(), [("name", "Ada")]).unwrap();
        assert_eq!(doc["age"], Value::Int(18));
        assert_eq!(doc["nickname"], Value::Null);
        assert_eq!(doc.to_dict(), json!({"name": "Ada", "age": 18}).as_object().cloned().unwrap());
    }

    #[test]
    fn private_attribute_reachable_by_slot_and_attribute() {
        let doc = Document::new(&person(), [("name", "Ada")]).unwrap();
        assert_eq!(doc.get("name"), Some(&Value::from("Ada")));
        assert_eq!(doc.get("_name"), Some(&Value::from("Ada")));
    }

    #[test]
    fn strict_documents_reject_unknown_keys() {
        let err = Document::new(&person(), [("name", "Ada"), ("zeta", "z"), ("alpha", "a")]).unwrap_err();
        assert_eq!(err.fields(), ["alpha".to_owned(), "zeta".to_owned()]);

        let mut doc = Document::new(&person(), [("name", "Ada")]).unwrap();
        assert!(doc.set_field("unknown", 1).unwrap_err().is_invalid_field());
    }

    #[test]
    fn live_sets_validate_declared_fields() {
        let mut doc = Document::new(&person(), [("name", "Ada")]).unwrap();
        assert!(doc.set_field("age", -1).unwrap_err().is_invalid_value());
        doc.set_field("age", "40").unwrap();
        assert_eq!(doc["age"], Value::Int(40));
    }

    #[test]
    fn try_get_reports_unknown_names() {
        let doc = Document::new(&person(), [("name", "Ada")]).unwrap();
        assert!(doc.try_get("missing").unwrap_err().is_not_found());
        assert_eq!(doc.try_get("nickname").unwrap(), Value::Null);
    }

    #[test]
    fn pop_clears_truthy_values() {
        let mut doc = Document::new(&person(), [("name", "Ada"), ("nickname", "")]).unwrap();
        assert_eq!(doc.pop("nickname"), Some(Value::from("")));
        assert_eq!(doc["nickname"], Value::from(""));
        assert_eq!(doc.pop("age"), Some(Value::Int(18)));
        assert_eq!(doc["age"], Value::Null);
        assert_eq!(doc.pop("missing"), None);
    }

    #[test]
    fn copy_is_equal_and_independent() {
        let original = Document::new(&person(), [("name", "Ada")]).unwrap();
        let mut copy = original.copy().unwrap();
        assert_eq!(copy, original);
        copy.set_field("age", 30).unwrap();
        assert_ne!(copy, original);
        assert_eq!(original["age"], Value::Int(18));
    }

    #[test]
    fn init_hooks_extend_the_schema_and_keep_their_values() {
        let doc_type = DocumentType::builder("Hooked")
            .field("count", Field::int().default(1))
            .on_init(|doc| {
                doc.declare_field("_label", Field::string().default("none"))?;
                doc.set_field("count", 5)?;
                doc.set_field("stamp", "set by hook")
            })
            .strict()
            .declare()
            .unwrap();
        let doc = Document::new(&doc_type, std::iter::empty::<(String, Value)>()).unwrap();
        assert_eq!(doc["count"], Value::Int(5));
        assert_eq!(doc["label"], Value::from("none"));
        assert_eq!(doc["stamp"], Value::from("set by hook"));
        assert!(doc_type.schema().contains("stamp"));

        let mut doc = doc;
        assert!(doc.declare_field("late", Field::int()).unwrap_err().is_invalid_definition());
    }
}
