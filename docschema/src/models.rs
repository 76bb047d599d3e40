//! Built-in base models every schema can extend.
//!
//! | model                  | flexible | primary key |
//! |------------------------|----------|-------------|
//! | `SimpleDocument`       | yes      | no          |
//! | `SimpleSchemaDocument` | no       | no          |
//! | `SchemalessDocument`   | yes      | `_id`       |
//! | `SchemaDocument`       | no       | `_id`       |

use std::sync::Arc;

use crate::errors::SchemaResult;
use crate::fields::Field;
use crate::registry::DocumentModel;
use crate::types::{DocumentType, DocumentTypeBuilder, PRIMARY_KEY};

pub struct SimpleDocument;

impl DocumentModel for SimpleDocument {
    fn declaration() -> DocumentTypeBuilder {
        DocumentType::builder("SimpleDocument")
    }
}

pub struct SimpleSchemaDocument;

impl DocumentModel for SimpleSchemaDocument {
    fn declaration() -> DocumentTypeBuilder {
        DocumentType::builder("SimpleSchemaDocument")
            .extends_model::<SimpleDocument>()
            .strict()
    }
}

pub struct SchemalessDocument;

impl DocumentModel for SchemalessDocument {
    fn declaration() -> DocumentTypeBuilder {
        DocumentType::builder("SchemalessDocument")
            .extends_model::<SimpleDocument>()
            .field(PRIMARY_KEY, Field::object_id())
    }
}

pub struct SchemaDocument;

impl DocumentModel for SchemaDocument {
    fn declaration() -> DocumentTypeBuilder {
        DocumentType::builder("SchemaDocument")
            .extends_model::<SimpleSchemaDocument>()
            .field(PRIMARY_KEY, Field::object_id())
    }
}

/// Resolves a base model by name.
pub fn builtin(name: &str) -> Option<SchemaResult<Arc<DocumentType>>> {
    match name {
        "SimpleDocument" => Some(SimpleDocument::document_type()),
        "SimpleSchemaDocument" => Some(SimpleSchemaDocument::document_type()),
        "SchemalessDocument" => Some(SchemalessDocument::document_type()),
        "SchemaDocument" => Some(SchemaDocument::document_type()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_models_carry_expected_flexibility() {
        assert!(SimpleDocument::document_type().unwrap().is_flexible());
        assert!(!SimpleSchemaDocument::document_type().unwrap().is_flexible());
        assert!(SchemalessDocument::document_type().unwrap().is_flexible());
        assert!(!SchemaDocument::document_type().unwrap().is_flexible());
    }

    #[test]
    fn id_models_declare_primary_key() {
        let schema = SchemaDocument::document_type().unwrap().schema();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("id").unwrap().slot, PRIMARY_KEY);
        assert!(SimpleSchemaDocument::document_type().unwrap().schema().is_empty());
    }
}
