//! docschema core library.
//!
//! Runtime schema validation and document modelling: typed field descriptors, document types with
//! single-inheritance schema merging, documents that validate on every assignment, and JSON
//! serialization.
//!
//! ```
//! use docschema::{Document, DocumentType, Field, Value};
//!
//! let user = DocumentType::builder("User")
//!     .field("name", Field::string().max_length(20).required())
//!     .field("age", Field::int().min_value(0).default(18))
//!     .strict()
//!     .declare()?;
//!
//! let doc = Document::new(&user, [("name", Value::from("Ada"))])?;
//! assert_eq!(doc.to_json(), r#"{"age":18,"name":"Ada"}"#);
//! # Ok::<(), docschema::SchemaError>(())
//! ```

pub mod definition;
pub mod document;
pub mod enumeration;
pub mod errors;
pub mod fields;
pub mod id;
pub mod models;
pub mod registry;
pub mod serialize;
pub mod types;
pub mod validators;
pub mod value;

pub use definition::{DefinitionError, DefinitionFile};
pub use document::Document;
pub use enumeration::{EnumValue, Enumeration, StringEnum};
pub use errors::*;
pub use fields::{ContainerKind, Field, FieldKind};
pub use id::ObjectId;
pub use models::{SchemaDocument, SchemalessDocument, SimpleDocument, SimpleSchemaDocument};
pub use registry::DocumentModel;
pub use types::{DocumentType, DocumentTypeBuilder, PRIMARY_KEY, Schema, SchemaEntry};
pub use value::{Value, ValueMap};
