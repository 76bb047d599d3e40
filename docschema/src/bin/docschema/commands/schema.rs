use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;
use docschema::fields::DefaultValue;
use docschema::{DocumentType, SchemaEntry};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::commands::{definition_paths_or_config, load_definitions};
use crate::context::ProjectContext;
use crate::output::{Report, Reporter};

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// Show the merged schema of every document type in the given definition files
    #[command(after_help = "Examples:\n  docschema schema show schemas/users.toml\n  docschema --output json schema show schemas/")]
    Show {
        /// Definition files or directories (defaults to docschema.toml definitions)
        paths: Vec<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
pub struct FieldSummary {
    pub slot: String,
    pub name: String,
    pub kind: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<JsonValue>>,
}

#[derive(Debug, Serialize)]
pub struct TypeSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub flexible: bool,
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SchemaReport(pub Vec<TypeSummary>);

fn summarize_entry(entry: &SchemaEntry) -> FieldSummary {
    let Some(field) = &entry.field else {
        return FieldSummary {
            slot: entry.slot.clone(),
            name: entry.external_name().to_owned(),
            kind: "any".to_owned(),
            required: false,
            default: None,
            choices: None,
        };
    };
    let default = match field.default_spec() {
        DefaultValue::Empty => None,
        DefaultValue::Value(value) => Some(value.to_json()),
        DefaultValue::Producer(_) => Some(JsonValue::String("<computed>".to_owned())),
    };
    FieldSummary {
        slot: entry.slot.clone(),
        name: entry.external_name().to_owned(),
        kind: field.kind().describe(),
        required: field.is_required(),
        default,
        choices: field
            .choices_list()
            .map(|choices| choices.iter().map(|choice| choice.to_json()).collect()),
    }
}

pub fn summarize(doc_type: &Arc<DocumentType>) -> TypeSummary {
    let schema = doc_type.schema();
    TypeSummary {
        name: doc_type.name().to_owned(),
        parent: doc_type.parent().map(|parent| parent.name().to_owned()),
        flexible: schema.is_flexible(),
        fields: schema.sorted().into_iter().map(summarize_entry).collect(),
    }
}

impl Report for SchemaReport {
    fn headers(&self) -> &'static [&'static str] {
        &["Type", "Slot", "Name", "Kind", "Required", "Default", "Choices"]
    }

    fn rows(&self, reporter: &Reporter) -> Vec<Vec<Cell>> {
        let mut rows = Vec::new();
        for summary in &self.0 {
            let mode = if summary.flexible { "flexible" } else { "strict" };
            let type_label = match &summary.parent {
                Some(parent) => format!("{} ({mode}, extends {parent})", summary.name),
                None => format!("{} ({mode})", summary.name),
            };
            if summary.fields.is_empty() {
                rows.push(vec![Cell::new(&type_label), Cell::new("-")]);
                continue;
            }
            for (index, field) in summary.fields.iter().enumerate() {
                let choices = field.choices.as_ref().map(|choices| JsonValue::Array(choices.clone()).to_string());
                rows.push(vec![
                    Cell::new(if index == 0 { type_label.as_str() } else { "" }),
                    Cell::new(&field.slot),
                    Cell::new(&field.name),
                    Cell::new(&field.kind),
                    reporter.mark(field.required),
                    Cell::new(field.default.as_ref().map(JsonValue::to_string).unwrap_or_default()),
                    Cell::new(choices.unwrap_or_default()),
                ]);
            }
        }
        rows
    }

    fn compact_lines(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|summary| {
                let fields: Vec<String> = summary
                    .fields
                    .iter()
                    .map(|field| {
                        let marker = if field.required { "!" } else { "" };
                        format!("{}:{}{marker}", field.name, field.kind)
                    })
                    .collect();
                format!("{} {}", summary.name, fields.join(" "))
            })
            .collect()
    }
}

pub fn handle_schema_commands(command: SchemaCommands, ctx: &ProjectContext, reporter: &Reporter) -> Result<()> {
    match command {
        SchemaCommands::Show { paths } => handle_show(paths, ctx, reporter),
    }
}

fn handle_show(paths: Vec<PathBuf>, ctx: &ProjectContext, reporter: &Reporter) -> Result<()> {
    let paths = definition_paths_or_config(paths, ctx)?;
    let types = load_definitions(&paths, reporter)?;

    if types.is_empty() {
        reporter.warn("No document types declared in the given definitions");
        return Ok(());
    }
    reporter.print(&SchemaReport(types.iter().map(summarize).collect()))
}
