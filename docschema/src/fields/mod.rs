//! Field descriptors: typed validators and default providers attached to schema slots.
//!
//! Every descriptor validates through the same pipeline:
//!
//! 1. type-specific instance check / coercion ([`FieldKind`]),
//! 2. type-specific range / shape check,
//! 3. base check: null is rejected when `required`, values outside `choices` are rejected.
//!
//! Null skips the first two steps. Builder misuse (a bad regex, a bound on the wrong kind of field)
//! is recorded and reported as [`SchemaError::InvalidDefinition`] when the owning document type is
//! declared, or by [`Field::build`] for standalone descriptors.

mod kinds;

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::enumeration::{Enumeration, StringEnum};
use crate::errors::{SchemaError, SchemaResult};
use crate::registry::{self, DocumentModel};
use crate::types::DocumentType;
use crate::value::Value;

pub use kinds::{ContainerKind, DictRules, EmbeddedTarget, FieldKind, FloatRules, IntRules, ListRules, StringRules};

/// Zero-argument default producer, evaluated on every use.
pub type DefaultProducer = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    Empty,
    Value(Value),
    Producer(DefaultProducer),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Empty => f.write_str("Empty"),
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// One schema slot: kind-specific rules plus default, required-ness and allowed choices.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    default: DefaultValue,
    required: bool,
    choices: Option<Vec<Value>>,
    name: OnceLock<String>,
    problems: Vec<String>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            default: DefaultValue::Empty,
            required: false,
            choices: None,
            name: OnceLock::new(),
            problems: Vec::new(),
        }
    }

    /// Untyped slot: only the base checks apply.
    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String(StringRules::default()))
    }

    pub fn email() -> Self {
        Self::new(FieldKind::Email(StringRules::default()))
    }

    pub fn url() -> Self {
        Self::new(FieldKind::Url(StringRules::default()))
    }

    pub fn uuid() -> Self {
        Self::new(FieldKind::Uuid(StringRules::default()))
    }

    pub fn int() -> Self {
        Self::new(FieldKind::Int(IntRules::default()))
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float(FloatRules::default()))
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    pub fn enumeration(enumeration: Enumeration) -> Self {
        Self::new(FieldKind::Enum(enumeration))
    }

    pub fn enum_of<E: StringEnum>() -> Self {
        Self::enumeration(Enumeration::of::<E>())
    }

    pub fn object_id() -> Self {
        Self::new(FieldKind::ObjectId)
    }

    /// Ordered list without per-element validation.
    pub fn list() -> Self {
        Self::new(FieldKind::List(ListRules::default()))
    }

    pub fn list_of(element: Field) -> Self {
        Self::list().element(element)
    }

    pub fn set_of(element: Field) -> Self {
        Self::list().element(element).container(ContainerKind::Set)
    }

    pub fn dict() -> Self {
        Self::new(FieldKind::Dict(DictRules::default()))
    }

    pub fn embedded(target: &Arc<DocumentType>) -> Self {
        Self::new(FieldKind::Embedded(EmbeddedTarget::Type(Arc::clone(target))))
    }

    /// Embeds a [`DocumentModel`], resolved on first use so a model may embed itself.
    pub fn embedded_model<T: DocumentModel>() -> Self {
        Self::new(FieldKind::Embedded(EmbeddedTarget::Model(registry::resolve::<T>)))
    }

    /// Embeds a document type registered under `name`.
    pub fn embedded_named(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Embedded(EmbeddedTarget::Named(name.into())))
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    #[must_use]
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Producer(Arc::new(producer));
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Binds the externally visible name. The first bind wins.
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        self.bind_name(name);
        self
    }

    #[must_use]
    pub fn regex(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => match self.kind.string_rules_mut() {
                Some(rules) => rules.regex = Some(regex),
                None => self.problem(format!("regex does not apply to {} fields", self.kind.name())),
            },
            Err(err) => self.problem(format!("invalid regex {pattern:?}: {err}")),
        }
        self
    }

    #[must_use]
    pub fn min_length(mut self, length: usize) -> Self {
        match self.kind.string_rules_mut() {
            Some(rules) => rules.min_length = Some(length),
            None => self.problem(format!("min_length does not apply to {} fields", self.kind.name())),
        }
        self
    }

    #[must_use]
    pub fn max_length(mut self, length: usize) -> Self {
        match self.kind.string_rules_mut() {
            Some(rules) => rules.max_length = Some(length),
            None => self.problem(format!("max_length does not apply to {} fields", self.kind.name())),
        }
        self
    }

    #[must_use]
    pub fn min_value(mut self, bound: impl Into<Value>) -> Self {
        if let Err(message) = self.kind.set_bound(bound.into(), true) {
            self.problem(message);
        }
        self
    }

    #[must_use]
    pub fn max_value(mut self, bound: impl Into<Value>) -> Self {
        if let Err(message) = self.kind.set_bound(bound.into(), false) {
            self.problem(message);
        }
        self
    }

    #[must_use]
    pub fn element(mut self, element: Field) -> Self {
        match &mut self.kind {
            FieldKind::List(rules) => rules.element = Some(Box::new(element)),
            other => {
                let message = format!("element validator does not apply to {} fields", other.name());
                self.problem(message);
            }
        }
        self
    }

    #[must_use]
    pub fn max_items(mut self, count: usize) -> Self {
        match &mut self.kind {
            FieldKind::List(rules) => rules.max_items = Some(count),
            other => {
                let message = format!("max_items does not apply to {} fields", other.name());
                self.problem(message);
            }
        }
        self
    }

    #[must_use]
    pub fn container(mut self, container: ContainerKind) -> Self {
        match &mut self.kind {
            FieldKind::List(rules) => rules.container = container,
            other => {
                let message = format!("container does not apply to {} fields", other.name());
                self.problem(message);
            }
        }
        self
    }

    #[must_use]
    pub fn keys(mut self, validator: Field) -> Self {
        match &mut self.kind {
            FieldKind::Dict(rules) => rules.key = Some(Box::new(validator)),
            other => {
                let message = format!("key validator does not apply to {} fields", other.name());
                self.problem(message);
            }
        }
        self
    }

    #[must_use]
    pub fn values(mut self, validator: Field) -> Self {
        match &mut self.kind {
            FieldKind::Dict(rules) => rules.value = Some(Box::new(validator)),
            other => {
                let message = format!("value validator does not apply to {} fields", other.name());
                self.problem(message);
            }
        }
        self
    }

    fn problem(&mut self, message: String) {
        self.problems.push(message);
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn choices_list(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    pub fn default_spec(&self) -> &DefaultValue {
        &self.default
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Sets the canonical name unless one is already bound; racing binds converge on the first.
    pub fn bind_name(&self, name: impl Into<String>) {
        let _ = self.name.set(name.into());
    }

    fn label(&self) -> &str {
        self.canonical_name().unwrap_or("value")
    }

    /// Resolves the default, calling the producer if one is configured.
    pub fn default_value(&self) -> SchemaResult<Value> {
        let value = match &self.default {
            DefaultValue::Empty => Value::Null,
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Producer(producer) => producer(),
        };
        if self.required && value.is_null() {
            return Err(SchemaError::invalid_value(
                self.label(),
                value,
                "field is required but no value or default was provided",
            ));
        }
        Ok(value)
    }

    pub fn validate(&self, value: impl Into<Value>) -> SchemaResult<Value> {
        self.validate_as(self.label(), value.into())
    }

    /// Validates `value`, reporting failures under `field` (nested validators use their parent's path).
    pub(crate) fn validate_as(&self, field: &str, value: Value) -> SchemaResult<Value> {
        let value = if value.is_null() {
            value
        } else {
            self.kind.coerce(field, value)?
        };
        if self.required && value.is_null() {
            return Err(SchemaError::invalid_value(field, value, "value cannot be empty"));
        }
        if let Some(choices) = &self.choices
            && !choices.contains(&value)
        {
            return Err(SchemaError::invalid_value(
                field,
                value,
                "value must be one of the permitted values",
            ));
        }
        Ok(value)
    }

    /// Checks a standalone descriptor the way declaring a document type would.
    pub fn build(self) -> SchemaResult<Self> {
        let label = self.label().to_owned();
        self.finalize("", &label)
    }

    /// Reports recorded builder problems, checks bounds and nested validators, and coerces the
    /// choice list through this field's kind. `owner` is the declaring type, which named embedded
    /// targets may refer to before it is registered.
    pub(crate) fn finalize(mut self, owner: &str, path: &str) -> SchemaResult<Self> {
        if let Some(problem) = self.problems.first() {
            return Err(SchemaError::definition(path, problem.clone()));
        }
        self.kind = self.kind.finalize(owner, path)?;
        if let Some(choices) = self.choices.take() {
            let coerced = choices
                .into_iter()
                .map(|choice| {
                    if choice.is_null() {
                        return Ok(choice);
                    }
                    self.kind.coerce(path, choice).map_err(|err| {
                        SchemaError::definition(path, format!("choice does not fit the field: {err}"))
                    })
                })
                .collect::<SchemaResult<Vec<_>>>()?;
            self.choices = Some(coerced);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_field_without_default_fails_to_resolve_default() {
        let field = Field::int().required().name("count");
        let err = field.default_value().expect_err("required with no default");
        assert!(err.is_invalid_value());
        assert_eq!(err.field(), Some("count"));
    }

    #[test]
    fn default_producer_runs_on_every_use() {
        use std::sync::atomic::{AtomicI64, Ordering};
        let counter = Arc::new(AtomicI64::new(0));
        let source = Arc::clone(&counter);
        let field = Field::int().default_with(move || Value::Int(source.fetch_add(1, Ordering::SeqCst)));
        assert_eq!(field.default_value().unwrap(), Value::Int(0));
        assert_eq!(field.default_value().unwrap(), Value::Int(1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn canonical_name_first_writer_wins() {
        let field = Field::string().name("userName");
        field.bind_name("user_name");
        assert_eq!(field.canonical_name(), Some("userName"));
    }

    #[test]
    fn misapplied_builder_options_surface_as_definition_errors() {
        let err = Field::int().max_length(3).build().expect_err("max_length on int");
        assert!(err.is_invalid_definition());

        let err = Field::string().regex("(unclosed").build().expect_err("bad regex");
        assert!(err.is_invalid_definition());

        let err = Field::int().min_value(10).max_value(1).build().expect_err("inverted bounds");
        assert!(err.is_invalid_definition());

        let err = Field::boolean().element(Field::int()).build().expect_err("element on boolean");
        assert!(err.is_invalid_definition());
    }

    #[test]
    fn nested_definition_problems_are_found() {
        let err = Field::list_of(Field::string().min_length(5).max_length(2))
            .build()
            .expect_err("nested inverted lengths");
        assert!(err.is_invalid_definition());
    }

    #[test]
    fn null_passes_optional_fields_untouched() {
        assert_eq!(Field::int().validate(Value::Null).unwrap(), Value::Null);
        assert!(Field::int().required().validate(Value::Null).is_err());
    }

    #[test]
    fn choices_are_enforced_after_coercion() {
        let field = Field::int().choices([1, 2, 3, 5]).build().unwrap();
        assert_eq!(field.validate("2").unwrap(), Value::Int(2));
        assert!(field.validate(4).is_err());
    }
}
