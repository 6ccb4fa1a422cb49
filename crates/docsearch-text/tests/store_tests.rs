use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tantivy::schema::{Schema, STORED, TEXT};
use tantivy::{Index, IndexWriter};
use tempfile::TempDir;

use docsearch_core::{BoolMode, Document, ExtensionFilter, QueryRequest, SortMode};
use docsearch_text::query::query_terms;
use docsearch_text::{IndexStore, QueryEngine, SearchResponse, SearchStatus, StoreOptions, RESULT_LIMIT};

fn doc(path: &str, content: &str, (y, m, d): (i32, u32, u32)) -> Document {
    Document::from_path(Path::new(path), content.to_string(), Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
}

fn index_all(store: &IndexStore, docs: &[Document]) {
    let mut batch = store.begin_batch().expect("writer");
    for d in docs {
        batch.upsert(d).expect("upsert");
    }
    batch.commit().expect("commit");
}

fn paths(resp: &SearchResponse) -> Vec<String> {
    resp.hits.iter().map(|h| h.document.path.clone()).collect()
}

fn path_set(resp: &SearchResponse) -> BTreeSet<String> {
    paths(resp).into_iter().collect()
}

fn scenario_docs() -> Vec<Document> {
    vec![
        doc("/docs/a.pdf", "alpha beta", (2024, 1, 1)),
        doc("/docs/b.doc", "beta gamma", (2024, 6, 1)),
        doc("/docs/c.xlsx", "", (2024, 3, 1)),
    ]
}

#[test]
fn or_and_and_modes_follow_the_basic_scenario() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(&store, &scenario_docs());
    let engine = QueryEngine::new(&store);

    let beta = engine.search(&QueryRequest::new("beta")).unwrap();
    assert!(beta.is_ok());
    assert_eq!(path_set(&beta), ["/docs/a.pdf", "/docs/b.doc"].iter().map(|s| s.to_string()).collect());

    let both = engine.search(&QueryRequest::new("alpha gamma").mode(BoolMode::And)).unwrap();
    assert!(both.hits.is_empty());

    let either = engine.search(&QueryRequest::new("alpha gamma")).unwrap();
    assert_eq!(either.hits.len(), 2);
}

#[test]
fn date_sort_orders_newest_first() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(&store, &[doc("/docs/a.pdf", "report", (2024, 1, 1)), doc("/docs/b.pdf", "report", (2024, 6, 1))]);

    let resp = QueryEngine::new(&store).search(&QueryRequest::new("report").sort(SortMode::Date)).unwrap();
    assert_eq!(paths(&resp), vec!["/docs/b.pdf", "/docs/a.pdf"]);
    assert!(resp.hits.iter().all(|h| h.score.is_none()));
    assert_eq!(resp.hits[0].document.modified, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
}

#[test]
fn relevance_scores_are_non_increasing() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(
        &store,
        &[
            doc("/docs/fuel.pdf", "fuel storage fuel rotation", (2024, 1, 1)),
            doc("/docs/water.pdf", "water and fuel", (2024, 1, 2)),
            doc("/docs/misc.pdf", "fuel", (2024, 1, 3)),
        ],
    );
    let resp = QueryEngine::new(&store).search(&QueryRequest::new("fuel")).unwrap();
    assert_eq!(resp.hits.len(), 3);
    let scores: Vec<f32> = resp.hits.iter().map(|h| h.score.expect("relevance score")).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
    assert_eq!(resp.hits[0].document.path, "/docs/fuel.pdf", "filename plus content match ranks first");
}

#[test]
fn clear_then_search_is_empty_without_error() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(&store, &scenario_docs());
    assert_eq!(store.num_docs(), 3);

    store.clear().unwrap();
    assert_eq!(store.num_docs(), 0);
    let resp = QueryEngine::new(&store).search(&QueryRequest::new("anything")).unwrap();
    assert_eq!(resp.status, SearchStatus::Ok);
    assert!(resp.hits.is_empty());

    drop(store);
    let reopened = IndexStore::open_or_create(tmp.path()).unwrap();
    assert_eq!(reopened.num_docs(), 0, "cleared index stays valid and reopenable");
}

#[test]
fn empty_content_matches_by_filename_only() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(&store, &[doc("/docs/minutes.hwpx", "", (2024, 2, 2))]);
    let engine = QueryEngine::new(&store);

    assert_eq!(paths(&engine.search(&QueryRequest::new("minutes")).unwrap()), vec!["/docs/minutes.hwpx"]);
    assert!(engine.search(&QueryRequest::new("agenda")).unwrap().hits.is_empty());
}

#[test]
fn upserts_keep_one_document_per_path() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    let path = "/docs/plan.pdf";

    let mut batch = store.begin_batch().unwrap();
    batch.upsert(&doc(path, "first draft", (2024, 1, 1))).unwrap();
    batch.upsert(&doc(path, "second draft", (2024, 1, 2))).unwrap();
    assert_eq!(batch.pending(), 2);
    batch.commit().unwrap();
    assert_eq!(store.count_path(path).unwrap(), 1);

    index_all(&store, &[doc(path, "final version", (2024, 1, 3))]);
    assert_eq!(store.count_path(path).unwrap(), 1);
    assert_eq!(store.num_docs(), 1);
    assert_eq!(store.document(path).unwrap().unwrap().content, "final version");
    assert!(store.document("/docs/absent.pdf").unwrap().is_none());
}

#[test]
fn uncommitted_batch_is_invisible() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    {
        let mut batch = store.begin_batch().unwrap();
        batch.upsert(&doc("/docs/a.pdf", "alpha", (2024, 1, 1))).unwrap();
        assert_eq!(store.num_docs(), 0, "readers do not see pending upserts");
    }
    assert_eq!(store.num_docs(), 0, "dropped batch is discarded");
}

#[test]
fn and_hits_are_a_subset_of_or_hits() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(
        &store,
        &[
            doc("/docs/alpha.pdf", "beta", (2024, 1, 1)),
            doc("/docs/b.pdf", "alpha beta gamma", (2024, 1, 2)),
            doc("/docs/c.pdf", "gamma delta", (2024, 1, 3)),
            doc("/docs/delta.hwp", "alpha", (2024, 1, 4)),
        ],
    );
    let engine = QueryEngine::new(&store);
    let terms = ["alpha", "beta", "gamma", "delta", "missing"];
    for t1 in terms {
        for t2 in terms {
            let q = format!("{t1} {t2}");
            let and = path_set(&engine.search(&QueryRequest::new(q.as_str()).mode(BoolMode::And)).unwrap());
            let or = path_set(&engine.search(&QueryRequest::new(q.as_str()).mode(BoolMode::Or)).unwrap());
            assert!(and.is_subset(&or), "{q}: {and:?} not within {or:?}");
        }
    }
    let across_fields = engine.search(&QueryRequest::new("alpha beta").mode(BoolMode::And)).unwrap();
    assert!(path_set(&across_fields).contains("/docs/alpha.pdf"), "terms may match in different fields");
}

fn bulk(store: &IndexStore) {
    let mut docs = Vec::new();
    for i in 0..55u32 {
        docs.push(doc(&format!("/docs/new-{i}.pdf"), "common shared words", (2024, 6, 1 + i % 28)));
    }
    for i in 0..5u32 {
        docs.push(doc(&format!("/docs/old-{i}.hwp"), "common shared words", (2020, 1, 1 + i)));
    }
    index_all(store, &docs);
}

#[test]
fn results_are_capped_at_fifty() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    bulk(&store);
    assert_eq!(store.num_docs(), 60);
    let engine = QueryEngine::new(&store);

    let relevance = engine.search(&QueryRequest::new("common")).unwrap();
    assert_eq!(relevance.hits.len(), RESULT_LIMIT);

    let by_date = engine.search(&QueryRequest::new("common").sort(SortMode::Date)).unwrap();
    assert_eq!(by_date.hits.len(), RESULT_LIMIT);
    let stamps: Vec<_> = by_date.hits.iter().map(|h| h.document.modified).collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]), "date sort must be non-increasing");
    let ranks: Vec<usize> = by_date.hits.iter().map(|h| h.rank).collect();
    assert_eq!(ranks, (1..=RESULT_LIMIT).collect::<Vec<_>>());
}

#[test]
fn extension_filter_applies_after_the_cap() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    bulk(&store);
    let engine = QueryEngine::new(&store);

    let hwp_only = engine
        .search(&QueryRequest::new("common").sort(SortMode::Date).extensions(ExtensionFilter::only(["hwp"])))
        .unwrap();
    assert_eq!(hwp_only.window, RESULT_LIMIT);
    assert!(hwp_only.hits.is_empty(), "older .hwp documents fall outside the capped window");

    let pdf_only = engine
        .search(&QueryRequest::new("common").sort(SortMode::Date).extensions(ExtensionFilter::only([".pdf"])))
        .unwrap();
    assert_eq!(pdf_only.hits.len(), RESULT_LIMIT);
}

#[test]
fn filtered_hits_keep_their_window_rank() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(
        &store,
        &[
            doc("/docs/a.pdf", "notice", (2024, 3, 1)),
            doc("/docs/b.hwp", "notice", (2024, 2, 1)),
            doc("/docs/c.pdf", "notice", (2024, 1, 1)),
        ],
    );
    let resp = QueryEngine::new(&store)
        .search(&QueryRequest::new("notice").sort(SortMode::Date).extensions(ExtensionFilter::only(["hwp"])))
        .unwrap();
    assert_eq!(resp.window, 3);
    assert_eq!(resp.hits.len(), 1);
    assert_eq!(resp.hits[0].rank, 2);
}

#[test]
fn queries_without_words_report_status_instead_of_failing() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(&store, &scenario_docs());
    let engine = QueryEngine::new(&store);

    for query in ["   ", "+++ ::", "\"()\""] {
        let resp = engine.search(&QueryRequest::new(query)).unwrap();
        assert!(matches!(resp.status, SearchStatus::InvalidQuery(_)), "{query:?}: {:?}", resp.status);
        assert!(resp.hits.is_empty());
        assert_eq!(resp.window, 0);
    }
}

#[test]
fn punctuation_in_queries_is_treated_as_separators() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(
        &store,
        &[
            doc("/docs/plan.hwp", "budget for 2024 approved", (2024, 1, 1)),
            doc("/docs/report.pdf", "report draft two", (2024, 1, 2)),
            doc("/docs/books.txt", "C++ primer on the shelf", (2024, 1, 3)),
        ],
    );
    let engine = QueryEngine::new(&store);

    let colon = engine.search(&QueryRequest::new("budget: 2024").mode(BoolMode::And)).unwrap();
    assert!(colon.is_ok());
    assert_eq!(paths(&colon), vec!["/docs/plan.hwp"]);

    let paren = engine.search(&QueryRequest::new("report (draft").mode(BoolMode::And)).unwrap();
    assert!(paren.is_ok());
    assert_eq!(paths(&paren), vec!["/docs/report.pdf"]);

    let quote = engine.search(&QueryRequest::new("\"draft")).unwrap();
    assert_eq!(paths(&quote), vec!["/docs/report.pdf"]);

    let field_like = engine.search(&QueryRequest::new("nosuchfield:approved")).unwrap();
    assert!(field_like.is_ok());
    assert_eq!(paths(&field_like), vec!["/docs/plan.hwp"]);

    let cpp = engine.search(&QueryRequest::new("C++ primer").mode(BoolMode::And)).unwrap();
    assert_eq!(paths(&cpp), vec!["/docs/books.txt"]);
}

#[test]
fn common_words_are_searchable_and_required_in_and_mode() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(
        &store,
        &[doc("/d/a.txt", "alpha only here", (2024, 1, 1)), doc("/d/will.pdf", "last will testament", (2024, 1, 2))],
    );
    let engine = QueryEngine::new(&store);

    let and = engine.search(&QueryRequest::new("alpha with").mode(BoolMode::And)).unwrap();
    assert!(and.is_ok());
    assert!(and.hits.is_empty(), "every AND term is required: {:?}", paths(&and));

    let or = engine.search(&QueryRequest::new("will")).unwrap();
    assert_eq!(paths(&or), vec!["/d/will.pdf"]);

    let plain = engine.search(&QueryRequest::new("only here").mode(BoolMode::And)).unwrap();
    assert_eq!(paths(&plain), vec!["/d/a.txt"]);
}

#[test]
fn index_with_a_different_schema_is_recreated_empty() {
    let tmp = TempDir::new().unwrap();
    {
        let mut builder = Schema::builder();
        let title = builder.add_text_field("title", TEXT | STORED);
        let index = Index::create_in_dir(tmp.path(), builder.build()).unwrap();
        let mut writer: IndexWriter = index.writer(50_000_000).unwrap();
        writer.add_document(tantivy::doc!(title => "legacy entry")).unwrap();
        writer.commit().unwrap();
    }

    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    assert_eq!(store.num_docs(), 0);
    let schema = store.index().schema();
    for field in ["path", "filename", "extension", "content", "modified"] {
        assert!(schema.get_field(field).is_ok(), "missing field {field}");
    }
    assert!(schema.get_field("title").is_err());

    index_all(&store, &[doc("/docs/fresh.pdf", "rebuilt index", (2024, 5, 5))]);
    drop(store);
    let reopened = IndexStore::open_or_create(tmp.path()).unwrap();
    assert_eq!(reopened.num_docs(), 1, "recreated index is kept on the next open");
}

#[test]
fn reindexing_the_same_documents_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    let engine = QueryEngine::new(&store);
    let queries = ["beta", "alpha gamma", "pdf"];

    index_all(&store, &scenario_docs());
    let first: Vec<Vec<String>> = queries.iter().map(|q| paths(&engine.search(&QueryRequest::new(*q)).unwrap())).collect();
    store.clear().unwrap();
    index_all(&store, &scenario_docs());
    let second: Vec<Vec<String>> = queries.iter().map(|q| paths(&engine.search(&QueryRequest::new(*q)).unwrap())).collect();
    assert_eq!(first, second);
}

#[test]
fn index_persists_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    index_all(&store, &scenario_docs());
    store.close();

    let store = IndexStore::open_or_create(tmp.path()).unwrap();
    assert_eq!(store.num_docs(), 3);
    let hit = store.document("/docs/a.pdf").unwrap().expect("persisted");
    assert_eq!(hit.filename, "a.pdf");
    assert_eq!(hit.extension, ".pdf");
    assert_eq!(hit.modified, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
}

#[test]
fn open_creates_missing_directories() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("state/index");
    let store = IndexStore::open_or_create(&nested).unwrap();
    assert!(nested.is_dir());
    assert_eq!(store.dir(), nested.as_path());
    assert_eq!(store.num_docs(), 0);
}

#[test]
fn clear_retries_once_while_the_writer_lock_is_held() {
    let tmp = TempDir::new().unwrap();
    let options = StoreOptions { clear_retry_delay: Duration::from_millis(400), ..StoreOptions::default() };
    let store = IndexStore::open_with(tmp.path(), options).unwrap();
    index_all(&store, &scenario_docs());

    let result = std::thread::scope(|s| {
        let batch = store.begin_batch().unwrap();
        s.spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            drop(batch);
        });
        store.clear()
    });
    result.expect("second attempt succeeds once the writer is released");
    assert_eq!(store.num_docs(), 0);
}

#[test]
fn clear_surfaces_a_lock_error_after_the_retry() {
    let tmp = TempDir::new().unwrap();
    let options = StoreOptions { clear_retry_delay: Duration::from_millis(20), ..StoreOptions::default() };
    let store = IndexStore::open_with(tmp.path(), options).unwrap();
    let _held = store.begin_batch().unwrap();
    let err = store.clear().unwrap_err();
    assert!(err.is_lock(), "{err}");
}

#[test]
fn query_terms_are_lowercased_and_distinct() {
    assert_eq!(query_terms("Budget: 2024 budget (draft"), vec!["budget", "2024", "draft"]);
    assert!(query_terms("+++").is_empty());
}
