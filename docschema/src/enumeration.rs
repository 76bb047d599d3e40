//! Closed member sets for enum fields.

use std::collections::HashSet;
use std::fmt;

use crate::errors::{SchemaError, SchemaResult};
use crate::value::Value;

/// Rust enums usable as enum field targets.
///
/// `value` is the canonical string stored for a member; `label` optionally overrides the string
/// rendered when the member is serialized. Both are accepted when coercing strings back to members.
pub trait StringEnum: Copy + PartialEq + Send + Sync + 'static {
    const NAME: &'static str;

    fn members() -> &'static [Self];

    fn value(self) -> &'static str;

    fn label(self) -> Option<&'static str> {
        None
    }

    fn from_value(value: &str) -> Option<Self> {
        Self::members().iter().copied().find(|member| member.value() == value)
    }

    fn to_value(self) -> Value {
        Value::Enum(EnumValue::of(self))
    }
}

/// A member of a named enumeration, as stored in documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    enumeration: String,
    value: String,
    label: Option<String>,
}

impl EnumValue {
    pub fn of<E: StringEnum>(member: E) -> Self {
        Self {
            enumeration: E::NAME.to_owned(),
            value: member.value().to_owned(),
            label: member.label().map(str::to_owned),
        }
    }

    pub fn enumeration(&self) -> &str {
        &self.enumeration
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The rendered form: the label when one is set, the canonical value otherwise.
    pub fn as_str(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }

    /// Converts back into the Rust enum it was created from.
    pub fn to_member<E: StringEnum>(&self) -> Option<E> {
        if self.enumeration != E::NAME {
            return None;
        }
        E::from_value(&self.value)
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Member {
    value: String,
    label: Option<String>,
}

/// The member set an enum field validates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    name: String,
    members: Vec<Member>,
}

impl Enumeration {
    /// Dynamically declared enumeration, e.g. from a schema definition file.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: values
                .into_iter()
                .map(|value| Member {
                    value: value.into(),
                    label: None,
                })
                .collect(),
        }
    }

    pub fn of<E: StringEnum>() -> Self {
        Self {
            name: E::NAME.to_owned(),
            members: E::members()
                .iter()
                .map(|member| Member {
                    value: member.value().to_owned(),
                    label: member.label().map(str::to_owned),
                })
                .collect(),
        }
    }

    /// Sets the rendered label of an existing member.
    #[must_use]
    pub fn with_label(mut self, value: &str, label: impl Into<String>) -> Self {
        if let Some(member) = self.members.iter_mut().find(|member| member.value == value) {
            member.label = Some(label.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|member| member.value.as_str())
    }

    pub fn contains(&self, value: &EnumValue) -> bool {
        value.enumeration == self.name && self.members.iter().any(|member| member.value == value.value)
    }

    /// String-to-member lookup: canonical value first, then label.
    pub fn lookup(&self, raw: &str) -> Option<EnumValue> {
        self.members
            .iter()
            .find(|member| member.value == raw)
            .or_else(|| self.members.iter().find(|member| member.label.as_deref() == Some(raw)))
            .map(|member| EnumValue {
                enumeration: self.name.clone(),
                value: member.value.clone(),
                label: member.label.clone(),
            })
    }

    /// Members must exist and map to distinct strings, otherwise strings cannot be converted back.
    pub fn check(&self, field: &str) -> SchemaResult<()> {
        if self.members.is_empty() {
            return Err(SchemaError::definition(
                field,
                format!("enumeration {} has no members", self.name),
            ));
        }
        let mut seen = HashSet::new();
        for member in &self.members {
            let label = member.label.as_deref().filter(|label| *label != member.value);
            for raw in std::iter::once(member.value.as_str()).chain(label) {
                if !seen.insert(raw) {
                    return Err(SchemaError::definition(
                        field,
                        format!("enumeration {} maps '{raw}' to more than one member", self.name),
                    ));
                }
            }
        }
        Ok(())
    }
}
