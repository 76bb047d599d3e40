use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::document::Document;
use crate::errors::SchemaResult;
use crate::models;
use crate::types::{DocumentType, DocumentTypeBuilder};
use crate::value::Value;

/// Statically declared document types.
///
/// The type is declared on first use and cached for the lifetime of the process, so every
/// instance shares one schema (including runtime extensions).
pub trait DocumentModel: 'static {
    fn declaration() -> DocumentTypeBuilder;

    fn document_type() -> SchemaResult<Arc<DocumentType>> {
        resolve::<Self>()
    }

    fn create<I, K, V>(values: I) -> SchemaResult<Document>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Document::new(&Self::document_type()?, values)
    }
}

static BY_TYPE: OnceLock<RwLock<HashMap<TypeId, Arc<DocumentType>>>> = OnceLock::new();
static BY_NAME: OnceLock<RwLock<HashMap<String, Arc<DocumentType>>>> = OnceLock::new();

fn by_type() -> &'static RwLock<HashMap<TypeId, Arc<DocumentType>>> {
    BY_TYPE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn by_name() -> &'static RwLock<HashMap<String, Arc<DocumentType>>> {
    BY_NAME.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the cached type for `T`, declaring it on first use.
///
/// Declaration happens outside the lock (it may resolve parents); if two threads race, the first
/// stored type wins and the other declaration is dropped.
pub fn resolve<T: DocumentModel + ?Sized>() -> SchemaResult<Arc<DocumentType>> {
    let key = TypeId::of::<T>();
    if let Some(found) = by_type().read().unwrap_or_else(PoisonError::into_inner).get(&key) {
        return Ok(Arc::clone(found));
    }
    let declared = T::declaration().declare()?;
    let resolved = {
        let mut types = by_type().write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(types.entry(key).or_insert(declared))
    };
    by_name()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(resolved.name().to_owned())
        .or_insert_with(|| Arc::clone(&resolved));
    Ok(resolved)
}

/// Makes a dynamically declared type available to [`lookup`] and named embedded fields.
pub fn register(doc_type: &Arc<DocumentType>) {
    log::debug!("registering document type {}", doc_type.name());
    by_name()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(doc_type.name().to_owned(), Arc::clone(doc_type));
}

/// Finds a registered type by name, falling back to the built-in base models.
pub fn lookup(name: &str) -> Option<Arc<DocumentType>> {
    if let Some(found) = by_name().read().unwrap_or_else(PoisonError::into_inner).get(name) {
        return Some(Arc::clone(found));
    }
    models::builtin(name).and_then(Result::ok)
}

pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = by_name()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
