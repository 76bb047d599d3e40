use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use docschema::{Document, DocumentType, registry};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::commands::{display_path, load_definitions};
use crate::output::{Report, Reporter};

#[derive(Args)]
pub struct ValidateArgs {
    /// Document type to validate against
    #[arg(long = "type", short = 't', value_name = "NAME")]
    pub type_name: String,

    /// Definition file or directory declaring the type
    pub definition: PathBuf,

    /// JSON files holding one document object or an array of them
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ValidationOutcome {
    pub file: String,
    pub index: usize,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ValidationReport(pub Vec<ValidationOutcome>);

impl ValidationReport {
    pub fn failures(&self) -> usize {
        self.0.iter().filter(|outcome| !outcome.valid).count()
    }
}

impl Report for ValidationReport {
    fn headers(&self) -> &'static [&'static str] {
        &["File", "#", "Valid", "Canonical form / error"]
    }

    fn rows(&self, reporter: &Reporter) -> Vec<Vec<Cell>> {
        self.0
            .iter()
            .map(|outcome| {
                let detail = match (&outcome.document, &outcome.error) {
                    (_, Some(error)) => error.clone(),
                    (Some(document), None) => document.to_string(),
                    (None, None) => String::new(),
                };
                vec![
                    Cell::new(&outcome.file),
                    Cell::new(outcome.index),
                    reporter.mark(outcome.valid),
                    Cell::new(detail),
                ]
            })
            .collect()
    }

    fn compact_lines(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|outcome| match &outcome.error {
                Some(error) => format!("{}#{} error: {error}", outcome.file, outcome.index),
                None => format!("{}#{} ok", outcome.file, outcome.index),
            })
            .collect()
    }
}

/// Validates every object in `json` against `doc_type`; arrays yield one outcome per element.
pub fn validate_json(doc_type: &Arc<DocumentType>, file: &str, json: JsonValue) -> Vec<ValidationOutcome> {
    let items = match json {
        JsonValue::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match Document::from_json(doc_type, item) {
            Ok(document) => ValidationOutcome {
                file: file.to_owned(),
                index,
                valid: true,
                document: Some(JsonValue::Object(document.to_dict())),
                error: None,
            },
            Err(err) => ValidationOutcome {
                file: file.to_owned(),
                index,
                valid: false,
                document: None,
                error: Some(err.to_string()),
            },
        })
        .collect()
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read document file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

pub fn handle_validate(args: ValidateArgs, reporter: &Reporter) -> Result<()> {
    let declared = load_definitions(std::slice::from_ref(&args.definition), reporter)?;
    let doc_type = declared
        .iter()
        .find(|doc_type| doc_type.name() == args.type_name)
        .cloned()
        .or_else(|| registry::lookup(&args.type_name))
        .with_context(|| {
            format!(
                "Document type {} is not declared in {}",
                args.type_name,
                args.definition.display()
            )
        })?;

    let mut report = ValidationReport(Vec::new());
    for path in &args.documents {
        let file = display_path(path);
        reporter.trace(&format!("validating {file} as {}", doc_type.name()));
        report.0.extend(validate_json(&doc_type, &file, read_json(path)?));
    }

    let failures = report.failures();
    if failures > 0 {
        // a quiet run still shows which documents failed
        println!("{}", reporter.render(&report)?);
        reporter.verdict(false, &format!("{failures} of {} document(s) failed validation", report.0.len()));
        anyhow::bail!("Validation failed");
    }
    reporter.print(&report)?;
    reporter.verdict(true, &format!("{} document(s) valid against {}", report.0.len(), doc_type.name()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docschema::Field;
    use serde_json::json;

    fn account() -> Arc<DocumentType> {
        DocumentType::builder("CliAccount")
            .field("email", Field::email().required())
            .field("age", Field::int().min_value(0))
            .strict()
            .declare()
            .unwrap()
    }

    #[test]
    fn test_validate_json_reports_each_array_element() {
        let outcomes = validate_json(
            &account(),
            "batch.json",
            json!([{"email": "a@b.co", "age": "7"}, {"email": "nope"}, {"email": "c@d.co", "extra": 1}]),
        );
        let report = ValidationReport(outcomes);
        assert_eq!(report.0.len(), 3);
        assert_eq!(report.failures(), 2);
        assert_eq!(report.0[0].document, Some(json!({"email": "a@b.co", "age": 7})));
        assert!(report.0[2].error.as_deref().unwrap().contains("extra"));
    }

    #[test]
    fn test_non_object_document_is_reported() {
        let outcomes = validate_json(&account(), "scalar.json", json!(3));
        assert!(!outcomes[0].valid);
        assert_eq!(
            ValidationReport(outcomes).compact_lines(),
            ["scalar.json#0 error: CliAccount: document must be a JSON object (got 3)"]
        );
    }
}
