//! Document types: merged schemas, flexibility, lifecycle hooks and lazy schema extension.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::document::Document;
use crate::errors::{SchemaError, SchemaResult};
use crate::fields::Field;
use crate::registry::{self, DocumentModel};

/// Slot name of the primary key, the one attribute whose leading underscore is kept.
pub const PRIMARY_KEY: &str = "_id";

/// Maps a declared attribute name to its schema slot: one leading underscore is dropped, except
/// for [`PRIMARY_KEY`].
pub fn slot_name(attribute: &str) -> &str {
    if attribute == PRIMARY_KEY {
        return attribute;
    }
    attribute.strip_prefix('_').unwrap_or(attribute)
}

/// Runs during construction, before declared fields are populated. May set values and extend the
/// schema through [`Document::declare_field`].
pub type InitHook = Arc<dyn Fn(&mut Document) -> SchemaResult<()> + Send + Sync>;
/// Runs after construction; any error aborts it.
pub type ValidateHook = Arc<dyn Fn(&Document) -> SchemaResult<()> + Send + Sync>;

/// One schema slot.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub slot: String,
    /// Key the value is stored under on documents.
    pub attribute: String,
    /// `None` for slots added by lazy extension; those take any value.
    pub field: Option<Arc<Field>>,
}

impl SchemaEntry {
    pub fn declared(attribute: &str, field: Field) -> Self {
        Self {
            slot: slot_name(attribute).to_owned(),
            attribute: attribute.to_owned(),
            field: Some(Arc::new(field)),
        }
    }

    pub fn placeholder(name: &str) -> Self {
        Self {
            slot: name.to_owned(),
            attribute: name.to_owned(),
            field: None,
        }
    }

    /// Key used by `to_dict` and when popping constructor arguments.
    pub fn external_name(&self) -> &str {
        self.field
            .as_ref()
            .and_then(|field| field.canonical_name())
            .unwrap_or(&self.slot)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: HashMap<String, SchemaEntry>,
    flexible: bool,
}

impl Schema {
    /// Looks `name` up as a slot, as a declared attribute, then as an underscore-prefixed slot.
    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(slot_name(name)))
            .or_else(|| self.entries.get(&format!("_{name}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.values()
    }

    /// Entries ordered by slot name.
    pub fn sorted(&self) -> Vec<&SchemaEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|left, right| left.slot.cmp(&right.slot));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_flexible(&self) -> bool {
        self.flexible
    }
}

/// A declared document type. Shared as `Arc<DocumentType>`; the schema sits behind a lock because
/// initialisation hooks may extend it at runtime.
pub struct DocumentType {
    name: String,
    parent: Option<Arc<DocumentType>>,
    schema: RwLock<Schema>,
    init_hooks: Vec<InitHook>,
    validate_hook: Option<ValidateHook>,
}

impl DocumentType {
    pub fn builder(name: impl Into<String>) -> DocumentTypeBuilder {
        DocumentTypeBuilder {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            flexible: None,
            init_hooks: Vec::new(),
            validate_hook: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<DocumentType>> {
        self.parent.as_ref()
    }

    pub fn is_flexible(&self) -> bool {
        self.read_schema().flexible
    }

    /// Snapshot of the current schema.
    pub fn schema(&self) -> Schema {
        self.read_schema().clone()
    }

    pub fn entry(&self, name: &str) -> Option<SchemaEntry> {
        self.read_schema().get(name).cloned()
    }

    pub fn field(&self, name: &str) -> Option<Arc<Field>> {
        self.entry(name).and_then(|entry| entry.field)
    }

    /// True when `ancestor` is this type or one of its parents.
    pub fn is_subtype_of(&self, ancestor: &DocumentType) -> bool {
        let mut current = Some(self);
        while let Some(candidate) = current {
            if std::ptr::eq(candidate, ancestor) {
                return true;
            }
            current = candidate.parent.as_deref();
        }
        false
    }

    pub(crate) fn init_hooks(&self) -> &[InitHook] {
        &self.init_hooks
    }

    pub(crate) fn validate_hook(&self) -> Option<&ValidateHook> {
        self.validate_hook.as_ref()
    }

    /// Returns the entry for `slot`, inserting the one produced by `register` when the slot is
    /// unknown. Concurrent callers racing on the same slot observe a single inserted entry.
    pub(crate) fn resolve_or_extend<F>(&self, slot: &str, register: Option<F>) -> Option<SchemaEntry>
    where
        F: FnOnce() -> SchemaEntry,
    {
        if let Some(entry) = self.read_schema().get(slot) {
            return Some(entry.clone());
        }
        let register = register?;
        let mut schema = self.schema.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = schema.get(slot) {
            return Some(entry.clone());
        }
        let entry = register();
        log::debug!("extending schema of {} with slot {}", self.name, entry.slot);
        schema.entries.insert(entry.slot.clone(), entry.clone());
        Some(entry)
    }

    fn read_schema(&self) -> std::sync::RwLockReadGuard<'_, Schema> {
        self.schema.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.read_schema();
        let mut slots: Vec<&str> = schema.entries.keys().map(String::as_str).collect();
        slots.sort_unstable();
        f.debug_struct("DocumentType")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .field("flexible", &schema.flexible)
            .field("slots", &slots)
            .finish()
    }
}

enum Parent {
    Type(Arc<DocumentType>),
    Model(fn() -> SchemaResult<Arc<DocumentType>>),
}

/// Collects a type's own declarations; [`DocumentTypeBuilder::declare`] merges them with the parent.
pub struct DocumentTypeBuilder {
    name: String,
    parent: Option<Parent>,
    fields: Vec<(String, Field)>,
    flexible: Option<bool>,
    init_hooks: Vec<InitHook>,
    validate_hook: Option<ValidateHook>,
}

impl DocumentTypeBuilder {
    #[must_use]
    pub fn field(mut self, attribute: impl Into<String>, field: Field) -> Self {
        self.fields.push((attribute.into(), field));
        self
    }

    #[must_use]
    pub fn extends(mut self, parent: &Arc<DocumentType>) -> Self {
        self.parent = Some(Parent::Type(Arc::clone(parent)));
        self
    }

    #[must_use]
    pub fn extends_model<P: DocumentModel>(mut self) -> Self {
        self.parent = Some(Parent::Model(registry::resolve::<P>));
        self
    }

    /// Own flexibility flag. The effective flag also requires the parent to be flexible.
    #[must_use]
    pub fn flexible(mut self, flexible: bool) -> Self {
        self.flexible = Some(flexible);
        self
    }

    #[must_use]
    pub fn strict(self) -> Self {
        self.flexible(false)
    }

    #[must_use]
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Document) -> SchemaResult<()> + Send + Sync + 'static,
    {
        self.init_hooks.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn validate_with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Document) -> SchemaResult<()> + Send + Sync + 'static,
    {
        self.validate_hook = Some(Arc::new(hook));
        self
    }

    pub fn declare(self) -> SchemaResult<Arc<DocumentType>> {
        let parent = match self.parent {
            Some(Parent::Type(parent)) => Some(parent),
            Some(Parent::Model(resolve)) => Some(resolve()?),
            None => None,
        };

        let mut entries: HashMap<String, SchemaEntry> = HashMap::new();
        for (attribute, field) in self.fields {
            let slot = slot_name(&attribute).to_owned();
            if slot.is_empty() {
                return Err(SchemaError::definition(attribute, "attribute name is empty"));
            }
            if entries.contains_key(&slot) {
                return Err(SchemaError::definition(slot, "slot is declared more than once"));
            }
            let field = field.finalize(&self.name, &slot)?;
            field.bind_name(slot.as_str());
            entries.insert(slot, SchemaEntry::declared(&attribute, field));
        }

        let mut init_hooks = Vec::new();
        let mut validate_hook = self.validate_hook;
        let parent_flexible = match &parent {
            Some(parent) => {
                for entry in parent.schema().iter() {
                    entries.entry(entry.slot.clone()).or_insert_with(|| entry.clone());
                }
                init_hooks.extend(parent.init_hooks.iter().cloned());
                if validate_hook.is_none() {
                    validate_hook = parent.validate_hook.clone();
                }
                parent.is_flexible()
            }
            None => true,
        };
        init_hooks.extend(self.init_hooks);
        let flexible = parent_flexible && self.flexible.unwrap_or(true);

        log::debug!(
            "declared document type {} ({} slots, flexible: {flexible})",
            self.name,
            entries.len()
        );
        Ok(Arc::new(DocumentType {
            name: self.name,
            parent,
            schema: RwLock::new(Schema { entries, flexible }),
            init_hooks,
            validate_hook,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_name_strips_one_underscore_except_primary_key() {
        assert_eq!(slot_name("_my_field"), "my_field");
        assert_eq!(slot_name("my_field"), "my_field");
        assert_eq!(slot_name("__private"), "_private");
        assert_eq!(slot_name("_id"), "_id");
    }

    #[test]
    fn flexible_flag_is_conjunctive() {
        let strict = DocumentType::builder("Strict").strict().declare().unwrap();
        let child = DocumentType::builder("Child").extends(&strict).flexible(true).declare().unwrap();
        assert!(!child.is_flexible());

        let open = DocumentType::builder("Open").declare().unwrap();
        let child = DocumentType::builder("Child").extends(&open).declare().unwrap();
        assert!(child.is_flexible());
    }

    #[test]
    fn own_declarations_override_parent_slots() {
        let parent = DocumentType::builder("Parent")
            .field("_x", Field::int())
            .field("y", Field::string())
            .declare()
            .unwrap();
        let child = DocumentType::builder("Child")
            .extends(&parent)
            .field("x", Field::string())
            .declare()
            .unwrap();
        assert_eq!(child.field("x").unwrap().kind().name(), "string");
        assert_eq!(child.field("y").unwrap().kind().name(), "string");
        assert_eq!(parent.field("x").unwrap().kind().name(), "int");
        assert!(child.is_subtype_of(&parent));
        assert!(!parent.is_subtype_of(&child));
    }

    #[test]
    fn duplicate_slots_are_rejected() {
        let err = DocumentType::builder("Dup")
            .field("_a", Field::int())
            .field("a", Field::int())
            .declare()
            .unwrap_err();
        assert!(err.is_invalid_definition());
    }

    #[test]
    fn schema_lookup_falls_back_to_primary_key_and_attribute_names() {
        let doc_type = DocumentType::builder("Keyed")
            .field("_id", Field::object_id())
            .field("_name", Field::string())
            .declare()
            .unwrap();
        assert_eq!(doc_type.entry("id").unwrap().slot, "_id");
        assert_eq!(doc_type.entry("_name").unwrap().slot, "name");
        assert_eq!(doc_type.entry("name").unwrap().attribute, "_name");
    }

    #[test]
    fn resolve_or_extend_inserts_once() {
        let doc_type = DocumentType::builder("Open").declare().unwrap();
        let first = doc_type.resolve_or_extend("extra", Some(|| SchemaEntry::placeholder("extra")));
        assert!(first.is_some());
        let missing = doc_type.resolve_or_extend::<fn() -> SchemaEntry>("other", None);
        assert!(missing.is_none());
        assert_eq!(doc_type.schema().len(), 1);
    }
}
