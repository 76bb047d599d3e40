use std::sync::{Arc, Barrier};
use std::thread;

use docschema::{Document, DocumentModel, DocumentType, DocumentTypeBuilder, Field, Value};

const THREADS: usize = 8;

#[test]
fn concurrent_init_hooks_extend_the_schema_once() {
    let doc_type = DocumentType::builder("RacingCounter")
        .field("count", Field::int().default(0))
        .on_init(|doc| {
            doc.declare_field("_origin", Field::string().default("hook"))?;
            doc.set_field("visits", 1)
        })
        .strict()
        .declare()
        .unwrap();
    let before = doc_type.schema().len();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let doc_type = Arc::clone(&doc_type);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let index = i64::try_from(index).unwrap();
                Document::new(&doc_type, [("count", index)]).map(|doc| doc.to_dict())
            })
        })
        .collect();

    for handle in handles {
        let dict = handle.join().unwrap().unwrap();
        assert_eq!(dict["origin"], "hook");
        assert_eq!(dict["visits"], 1);
    }

    let schema = doc_type.schema();
    assert_eq!(schema.len(), before + 2);
    assert_eq!(schema.iter().filter(|entry| entry.slot == "origin").count(), 1);
    assert!(schema.get("visits").is_some_and(|entry| entry.field.is_none()));
}

#[test]
fn extended_slots_are_visible_to_later_documents() {
    let doc_type = DocumentType::builder("LateReader")
        .on_init(|doc| doc.set_field("seen", true))
        .strict()
        .declare()
        .unwrap();
    Document::with_defaults(&doc_type).unwrap();

    // a strict type now accepts the slot from callers too, and supplied values win over the hook
    let doc = Document::new(&doc_type, [("seen", Value::Bool(false))]).unwrap();
    assert_eq!(doc["seen"], Value::Bool(false));
}

struct Contended;

impl DocumentModel for Contended {
    fn declaration() -> DocumentTypeBuilder {
        DocumentType::builder("ContendedModel").field("value", Field::int())
    }
}

#[test]
fn model_resolution_yields_one_shared_type() {
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                Contended::document_type().unwrap()
            })
        })
        .collect();

    let resolved: Vec<Arc<DocumentType>> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    for doc_type in &resolved {
        assert!(Arc::ptr_eq(doc_type, &resolved[0]));
    }
    assert!(Arc::ptr_eq(&resolved[0], &docschema::registry::lookup("ContendedModel").unwrap()));
}
