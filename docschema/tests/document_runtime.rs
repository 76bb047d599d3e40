use std::sync::Arc;

use chrono::{TimeZone, Utc};
use docschema::{Document, DocumentType, EnumValue, Field, StringEnum, Value};
use serde_json::{Value as JsonValue, json};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Active,
    Suspended,
}

impl StringEnum for Status {
    const NAME: &'static str = "Status";

    fn members() -> &'static [Self] {
        &[Status::Active, Status::Suspended]
    }

    fn value(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Suspended => "suspended",
        }
    }

    fn label(self) -> Option<&'static str> {
        match self {
            Status::Active => None,
            Status::Suspended => Some("SUSPENDED"),
        }
    }
}

fn account(flexible: bool) -> Arc<DocumentType> {
    DocumentType::builder(if flexible { "FlexibleAccount" } else { "StrictAccount" })
        .field("_id", Field::object_id())
        .field("email", Field::email().required())
        .field("status", Field::enum_of::<Status>().default(Status::Active.to_value()))
        .field("joined", Field::datetime())
        .field("tags", Field::set_of(Field::string()))
        .field("scores", Field::dict().values(Field::float()))
        .flexible(flexible)
        .declare()
        .unwrap()
}

fn sample(doc_type: &Arc<DocumentType>) -> Document {
    Document::from_json(
        doc_type,
        json!({
            "_id": "507f1f77bcf86cd799439011",
            "email": "ada@example.com",
            "status": "SUSPENDED",
            "joined": "2024-03-01T10:00:00Z",
            "tags": ["x", "y", "x"],
            "scores": {"math": 9, "art": "7.5"}
        }),
    )
    .unwrap()
}

#[test]
fn serialization_uses_canonical_forms() {
    let doc = sample(&account(false));
    assert_eq!(
        JsonValue::Object(doc.to_dict()),
        json!({
            "_id": "507f1f77bcf86cd799439011",
            "email": "ada@example.com",
            "status": "SUSPENDED",
            "joined": "2024-03-01T10:00:00Z",
            "tags": ["x", "y"],
            "scores": {"math": 9.0, "art": 7.5}
        })
    );
    assert_eq!(serde_json::to_value(&doc).unwrap(), JsonValue::Object(doc.to_dict()));
    assert_eq!(doc.to_string(), doc.to_json());
}

#[test]
fn typed_values_are_stored_after_coercion() {
    let doc = sample(&account(false));
    assert_eq!(
        doc["joined"],
        Value::DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(doc["status"].as_enum().and_then(EnumValue::to_member::<Status>), Some(Status::Suspended));
    assert_eq!(doc["tags"], Value::Set(vec![Value::from("x"), Value::from("y")]));
}

#[test]
fn reconstruction_from_dict_is_equal() {
    for flexible in [false, true] {
        let doc_type = account(flexible);
        let doc = sample(&doc_type);
        let rebuilt = Document::new(
            &doc_type,
            doc.to_dict().into_iter().map(|(key, value)| (key, Value::from(value))),
        )
        .unwrap();
        assert_eq!(rebuilt, doc);
    }
}

#[test]
fn copy_is_idempotent_and_detached() {
    let doc = sample(&account(true));
    let copy = doc.copy().unwrap();
    assert_eq!(copy.to_dict(), doc.to_dict());
    assert_eq!(copy.copy().unwrap().to_dict(), doc.to_dict());

    let changed = doc.copy_with([("email", "grace@example.com")]).unwrap();
    assert_eq!(changed["email"], Value::from("grace@example.com"));
    assert_eq!(doc["email"], Value::from("ada@example.com"));
    assert_ne!(changed, doc);
}

#[test]
fn flexible_documents_keep_undeclared_keys() {
    let doc_type = account(true);
    let doc = Document::new(&doc_type, [("email", Value::from("a@b.co")), ("nickname", Value::from("ace"))]).unwrap();
    assert_eq!(doc.to_dict()["nickname"], json!("ace"));
    assert!(!doc_type.schema().contains("nickname"));

    let err = Document::new(&account(false), [("email", Value::from("a@b.co")), ("nickname", Value::from("ace"))])
        .unwrap_err();
    assert!(err.is_invalid_field());
}

#[test]
fn live_assignment_on_flexible_documents_is_unvalidated_for_ad_hoc_keys() {
    let mut doc = Document::new(&account(true), [("email", "a@b.co")]).unwrap();
    doc.set_field("anything", vec![1, 2]).unwrap();
    assert_eq!(doc["anything"], Value::from(vec![1, 2]));
    assert!(doc.set_field("email", "broken").unwrap_err().is_invalid_value());
    assert_eq!(doc["email"], Value::from("a@b.co"));
}

#[test]
fn live_assignment_on_strict_documents_rejects_unknown_keys() {
    let mut doc = Document::new(&account(false), [("email", "a@b.co")]).unwrap();
    let err = doc.set_field("anything", 1).unwrap_err();
    assert!(err.is_invalid_field());
    assert_eq!(err.fields(), ["anything".to_owned()]);
}

#[test]
fn dict_style_adapters() {
    let mut doc = Document::new(&account(true), [("email", "a@b.co")]).unwrap();
    assert!(doc.contains("email"));
    assert!(!doc.contains("joined"));
    assert!(!doc.contains("missing"));
    assert_eq!(doc.get("missing"), None);
    assert_eq!(doc["missing"], Value::Null);
    assert_eq!(doc.get_or("joined", "never"), Value::from("never"));
    assert!(doc.try_get("missing").unwrap_err().is_not_found());

    doc.update([("tags", Value::from(vec!["b", "a"])), ("extra", Value::from(true))]).unwrap();
    assert_eq!(doc.keys(), ["email", "extra", "status", "tags"]);

    assert_eq!(doc.pop("extra"), Some(Value::Bool(true)));
    assert!(!doc.contains("extra"));
    assert_eq!(doc.keys(), ["email", "status", "tags"]);
}

#[test]
fn primary_key_accessors() {
    let mut doc = Document::new(&account(false), [("email", "a@b.co")]).unwrap();
    assert_eq!(doc.id(), None);
    let id = docschema::ObjectId::new();
    doc.set_id(id).unwrap();
    assert_eq!(doc.id(), Some(id));
    assert_eq!(doc.to_dict()["_id"], json!(id.to_hex()));
}

#[test]
fn failed_construction_reports_the_first_offending_field() {
    let err = Document::from_json(&account(false), json!({"email": "a@b.co", "scores": {"math": "lots"}})).unwrap_err();
    assert_eq!(err.field(), Some("scores.math"));
    assert!(err.to_string().starts_with("scores.math: value must be a number"));
}

#[test]
fn null_valued_unknown_keys_still_count_as_leftovers() {
    let err = Document::new(&account(false), [("email", Value::from("a@b.co")), ("bogus", Value::Null)])
        .unwrap_err();
    assert!(err.is_invalid_field());
    assert_eq!(err.fields(), ["bogus".to_owned()]);

    let doc = Document::new(&account(true), [("email", Value::from("a@b.co")), ("bogus", Value::Null)]).unwrap();
    assert!(!doc.contains("bogus"));
    assert_eq!(doc.keys(), ["email", "status"]);
}

#[test]
fn ad_hoc_keys_serialize_under_their_external_name() {
    let doc_type = account(true);
    let mut doc = Document::new(&doc_type, [("email", Value::from("a@b.co")), ("_tmp", Value::Int(1))]).unwrap();
    doc.set_field("_scratch", "x").unwrap();

    let dict = doc.to_dict();
    assert_eq!(dict["tmp"], json!(1));
    assert_eq!(dict["scratch"], json!("x"));
    assert!(!dict.contains_key("_tmp"));
    assert!(!dict.contains_key("_scratch"));

    let rebuilt = Document::new(&doc_type, dict.into_iter().map(|(key, value)| (key, Value::from(value)))).unwrap();
    assert_eq!(rebuilt, doc);
}
