use std::cell::{Cell, RefCell};

use anyhow::{bail, Result};
use chrono::{DateTime, Local, TimeZone};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use search_ingest::{
    BatchOptions, DocumentStore, Embedder, Embedding, IngestError, Ingestor, SourceType,
    StoredRecord,
};

fn started() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
        .single()
        .expect("unambiguous timestamp")
}

/// Embeds text as `[len, call_index]` and records every input.
#[derive(Default)]
struct RecordingEmbedder {
    inputs: RefCell<Vec<String>>,
    fail_on: Option<usize>,
}

impl Embedder for RecordingEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut inputs = self.inputs.borrow_mut();
        let call = inputs.len();
        inputs.push(text.to_string());
        if self.fail_on == Some(call) {
            bail!("embedding service unavailable");
        }
        Ok(vec![text.len() as f32, call as f32])
    }
}

/// Keeps inserted records; optionally rejects the n-th insert.
#[derive(Default)]
struct MemoryStore {
    rows: RefCell<Vec<StoredRecord>>,
    attempts: Cell<usize>,
    fail_on: Option<usize>,
}

impl DocumentStore for MemoryStore {
    fn insert(&self, record: &StoredRecord) -> Result<()> {
        let attempt = self.attempts.get();
        self.attempts.set(attempt + 1);
        if self.fail_on == Some(attempt) {
            bail!("409 Conflict: duplicate key");
        }
        self.rows.borrow_mut().push(record.clone());
        Ok(())
    }

    fn count(&self) -> Result<Option<u64>> {
        Ok(Some(self.rows.borrow().len() as u64))
    }
}

fn three_items() -> String {
    json!({
        "items": [
            {"title": "one", "bloggername": "a"},
            {"title": "two", "bloggername": "b"},
            {"title": "three", "bloggername": "c"}
        ]
    })
    .to_string()
}

#[test]
fn detected_blog_batch_is_stored_in_order() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store).with_clock(started);

    let report = ingestor
        .run(
            r#"{"items":[{"title":"<b>A</b>","description":"d1","bloggername":"bn"}]}"#,
            &BatchOptions::default(),
        )
        .expect("batch");

    assert_eq!(report.documents, 1);
    assert_eq!(report.source_type, Some(SourceType::Blog));
    assert_eq!(report.collection, "blog_20240501_093000");

    let rows = store.rows.borrow();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "A d1");
    assert_eq!(rows[0].embedding, vec![4.0, 0.0]);
    assert_eq!(rows[0].metadata["bloggerName"], json!("bn"));
    assert_eq!(rows[0].metadata["collection"], json!("blog"));
    assert_eq!(*embedder.inputs.borrow(), vec!["A d1".to_string()]);
}

#[test]
fn caller_type_overrides_detection_for_bare_arrays() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store).with_clock(started);
    let options = BatchOptions {
        source_type: Some(SourceType::Shopping),
        collection: Some("spring-sale".into()),
    };

    let report = ingestor
        .run(r#"[{"title":"t","lprice":"500"}]"#, &options)
        .expect("batch");

    assert_eq!(report.collection, "spring-sale");
    assert_eq!(report.source_type, Some(SourceType::Shopping));
    let rows = store.rows.borrow();
    assert_eq!(rows[0].content, "t ");
    assert_eq!(rows[0].metadata["price"], json!(500));
}

#[test]
fn store_failure_on_second_item_aborts_batch() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore {
        fail_on: Some(1),
        ..MemoryStore::default()
    };
    let ingestor = Ingestor::new(&embedder, &store);

    let err = ingestor
        .run(&three_items(), &BatchOptions::default())
        .expect_err("second insert fails");

    match &err {
        IngestError::Store { processed, source } => {
            assert_eq!(*processed, 1);
            assert!(source.to_string().contains("409 Conflict"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.processed(), 1);
    assert_eq!(store.rows.borrow().len(), 1);
    assert_eq!(store.attempts.get(), 2);
    // The third item is never embedded.
    assert_eq!(embedder.inputs.borrow().len(), 2);
}

#[test]
fn embedding_failure_aborts_before_insert() {
    let embedder = RecordingEmbedder {
        fail_on: Some(0),
        ..RecordingEmbedder::default()
    };
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store);

    let err = ingestor
        .run(&three_items(), &BatchOptions::default())
        .expect_err("first embed fails");

    assert!(matches!(err, IngestError::Embedding { processed: 0, .. }));
    assert!(err.to_string().contains("embedding service unavailable"));
    assert_eq!(store.attempts.get(), 0);
}

#[test]
fn embedding_failure_on_second_item_keeps_first_row() {
    let embedder = RecordingEmbedder {
        fail_on: Some(1),
        ..RecordingEmbedder::default()
    };
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store);

    let err = ingestor
        .run(&three_items(), &BatchOptions::default())
        .expect_err("second embed fails");

    assert!(matches!(err, IngestError::Embedding { processed: 1, .. }));
    assert_eq!(err.processed(), 1);
    let rows = store.rows.borrow();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "one ");
    assert_eq!(store.attempts.get(), 1);
    assert_eq!(
        *embedder.inputs.borrow(),
        vec!["one ".to_string(), "two ".to_string()]
    );
}

#[test]
fn malformed_input_never_reaches_collaborators() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store);

    for input in ["not json", r#"{"data": []}"#, "7"] {
        let err = ingestor
            .run(input, &BatchOptions::default())
            .expect_err(input);
        assert!(
            matches!(
                err,
                IngestError::MalformedJson(_) | IngestError::UnsupportedShape { .. }
            ),
            "{input}: {err}"
        );
    }
    assert!(embedder.inputs.borrow().is_empty());
    assert_eq!(store.attempts.get(), 0);
}

#[test]
fn unclassified_bare_array_uses_general_label() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store).with_clock(started);

    let report = ingestor
        .run(
            r#"[{"title":"x","content":"body","link":"https://x"}, 5]"#,
            &BatchOptions::default(),
        )
        .expect("batch");

    assert_eq!(report.documents, 2);
    assert_eq!(report.source_type, None);
    assert_eq!(report.collection, "general_20240501_093000");
    let rows = store.rows.borrow();
    assert_eq!(rows[0].content, "x body");
    assert_eq!(rows[0].metadata["url"], json!("https://x"));
    assert_eq!(rows[1].content, " ");
    assert!(rows[1].metadata.get("url").is_none());
}

#[test]
fn empty_items_store_nothing() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store).with_clock(started);

    let report = ingestor
        .run(r#"{"items": []}"#, &BatchOptions::default())
        .expect("batch");

    assert_eq!(report.documents, 0);
    assert_eq!(report.source_type, Some(SourceType::Generic));
    assert_eq!(report.collection, "unknown_20240501_093000");
    assert_eq!(ingestor.store().count().expect("count"), Some(0));
}

#[test]
fn fixture_files_load_end_to_end() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store).with_clock(started);
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");

    let blog = ingestor
        .run_file(&dir.join("blog.json"), &BatchOptions::default())
        .expect("blog");
    let news = ingestor
        .run_file(&dir.join("news.json"), &BatchOptions::default())
        .expect("news");
    let shopping = ingestor
        .run_file(
            &dir.join("shopping.json"),
            &BatchOptions {
                source_type: Some(SourceType::Shopping),
                collection: None,
            },
        )
        .expect("shopping");

    assert_eq!((blog.documents, news.documents, shopping.documents), (2, 1, 2));
    assert_eq!(news.source_type, Some(SourceType::News));

    let rows = store.rows.borrow();
    let contents: Vec<&str> = rows.iter().map(|row| row.content.as_str()).collect();
    assert_eq!(
        contents,
        [
            "Rust ownership notes Borrowing rules in practice",
            "Async Rust Futures and executors",
            "Compiler release &quot;1.80&quot; ships The release stabilizes LazyLock.",
            "Stainless Kettle Kettles",
            "Glass Teapot ",
        ]
    );
    assert_eq!(rows[2].metadata["url"], json!("https://portal.example.com/n/1"));
    assert_eq!(rows[3].metadata["price"], json!(32900));
    assert_eq!(rows[4].metadata["price"], Value::Null);
}

#[test]
fn missing_file_is_an_io_error() {
    let embedder = RecordingEmbedder::default();
    let store = MemoryStore::default();
    let ingestor = Ingestor::new(&embedder, &store);

    let err = ingestor
        .run_file(
            std::path::Path::new("tests/fixtures/does-not-exist.json"),
            &BatchOptions::default(),
        )
        .expect_err("missing file");
    assert!(matches!(err, IngestError::Io { .. }));
}
