//! TOML schema definition files.
//!
//! ```toml
//! [[document]]
//! name = "User"
//! extends = "SchemaDocument"
//! flexible = false
//! required_fields = ["email"]
//!
//! [document.fields.email]
//! type = "email"
//!
//! [document.fields.tags]
//! type = "list"
//! container = "set"
//! element = { type = "string", max_length = 16 }
//! ```
//!
//! Types are declared in file order. `extends` and embedded `document` names resolve against types
//! declared earlier in the same file first, then against the process registry. Every declared type
//! is registered under its name.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::enumeration::Enumeration;
use crate::errors::SchemaError;
use crate::fields::{ContainerKind, Field};
use crate::registry;
use crate::types::DocumentType;
use crate::value::Value;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid definition file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("unknown document type {name}")]
    UnknownDocument { name: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionFile {
    #[serde(rename = "document", default)]
    pub documents: Vec<DocumentSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentSpec {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub flexible: Option<bool>,
    /// Checked by the schema-validate hook after construction.
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub kind: FieldKindSpec,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub choices: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKindSpec {
    Any,
    String {
        #[serde(default)]
        regex: Option<String>,
        #[serde(default)]
        min_length: Option<usize>,
        #[serde(default)]
        max_length: Option<usize>,
    },
    Email,
    Url,
    Uuid,
    Int {
        #[serde(default)]
        min_value: Option<i64>,
        #[serde(default)]
        max_value: Option<i64>,
    },
    Float {
        #[serde(default)]
        min_value: Option<f64>,
        #[serde(default)]
        max_value: Option<f64>,
    },
    Boolean,
    Datetime,
    Enum {
        enumeration: String,
        members: Vec<String>,
    },
    ObjectId,
    List {
        #[serde(default)]
        element: Option<Box<FieldSpec>>,
        #[serde(default)]
        max_items: Option<usize>,
        #[serde(default)]
        container: ContainerKind,
    },
    Dict {
        #[serde(default)]
        key: Option<Box<FieldSpec>>,
        #[serde(default)]
        value: Option<Box<FieldSpec>>,
    },
    Embedded {
        document: String,
    },
}

impl DefinitionFile {
    pub fn from_toml_str(source: &str) -> Result<Self, DefinitionError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Declares and registers every document type, in file order.
    pub fn declare(&self) -> Result<Vec<Arc<DocumentType>>, DefinitionError> {
        let mut local: HashMap<&str, Arc<DocumentType>> = HashMap::new();
        let mut declared = Vec::with_capacity(self.documents.len());
        for spec in &self.documents {
            let doc_type = spec.declare(&local)?;
            registry::register(&doc_type);
            local.insert(spec.name.as_str(), Arc::clone(&doc_type));
            declared.push(doc_type);
        }
        Ok(declared)
    }
}

fn resolve_name(name: &str, local: &HashMap<&str, Arc<DocumentType>>) -> Result<Arc<DocumentType>, DefinitionError> {
    local
        .get(name)
        .cloned()
        .or_else(|| registry::lookup(name))
        .ok_or_else(|| DefinitionError::UnknownDocument { name: name.to_owned() })
}

impl DocumentSpec {
    fn declare(&self, local: &HashMap<&str, Arc<DocumentType>>) -> Result<Arc<DocumentType>, DefinitionError> {
        let mut builder = DocumentType::builder(&self.name);
        if let Some(parent) = &self.extends {
            builder = builder.extends(&resolve_name(parent, local)?);
        }
        if let Some(flexible) = self.flexible {
            builder = builder.flexible(flexible);
        }
        for (attribute, spec) in &self.fields {
            builder = builder.field(attribute, spec.to_field(&self.name, local)?);
        }
        if !self.required_fields.is_empty() {
            let required = self.required_fields.clone();
            builder = builder.validate_with(move |document| {
                let names: Vec<&str> = required.iter().map(String::as_str).collect();
                document.require_fields(&names)
            });
        }
        Ok(builder.declare()?)
    }
}

impl FieldSpec {
    pub fn to_field(&self, owner: &str, local: &HashMap<&str, Arc<DocumentType>>) -> Result<Field, DefinitionError> {
        let mut field = match &self.kind {
            FieldKindSpec::Any => Field::any(),
            FieldKindSpec::String {
                regex,
                min_length,
                max_length,
            } => {
                let mut field = Field::string();
                if let Some(pattern) = regex {
                    field = field.regex(pattern);
                }
                if let Some(length) = min_length {
                    field = field.min_length(*length);
                }
                if let Some(length) = max_length {
                    field = field.max_length(*length);
                }
                field
            }
            FieldKindSpec::Email => Field::email(),
            FieldKindSpec::Url => Field::url(),
            FieldKindSpec::Uuid => Field::uuid(),
            FieldKindSpec::Int { min_value, max_value } => {
                let mut field = Field::int();
                if let Some(bound) = min_value {
                    field = field.min_value(*bound);
                }
                if let Some(bound) = max_value {
                    field = field.max_value(*bound);
                }
                field
            }
            FieldKindSpec::Float { min_value, max_value } => {
                let mut field = Field::float();
                if let Some(bound) = min_value {
                    field = field.min_value(*bound);
                }
                if let Some(bound) = max_value {
                    field = field.max_value(*bound);
                }
                field
            }
            FieldKindSpec::Boolean => Field::boolean(),
            FieldKindSpec::Datetime => Field::datetime(),
            FieldKindSpec::Enum { enumeration, members } => {
                Field::enumeration(Enumeration::new(enumeration.as_str(), members.iter().map(String::as_str)))
            }
            FieldKindSpec::ObjectId => Field::object_id(),
            FieldKindSpec::List {
                element,
                max_items,
                container,
            } => {
                let mut field = Field::list().container(*container);
                if let Some(element) = element {
                    field = field.element(element.to_field(owner, local)?);
                }
                if let Some(count) = max_items {
                    field = field.max_items(*count);
                }
                field
            }
            FieldKindSpec::Dict { key, value } => {
                let mut field = Field::dict();
                if let Some(key) = key {
                    field = field.keys(key.to_field(owner, local)?);
                }
                if let Some(value) = value {
                    field = field.values(value.to_field(owner, local)?);
                }
                field
            }
            FieldKindSpec::Embedded { document } if document == owner => Field::embedded_named(document.as_str()),
            FieldKindSpec::Embedded { document } => Field::embedded(&resolve_name(document, local)?),
        };
        if self.required {
            field = field.required();
        }
        if let Some(default) = &self.default {
            field = field.default(Value::from(default.clone()));
        }
        if let Some(choices) = &self.choices {
            field = field.choices(choices.iter().cloned().map(Value::from));
        }
        if let Some(name) = &self.name {
            field = field.name(name.as_str());
        }
        Ok(field)
    }
}
