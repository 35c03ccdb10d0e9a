use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bm25_core::persist::SledStore;
use bm25_core::pipeline::{index_lines, PipelineOptions};
use bm25_core::store::MemoryStore;
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app_with_store, ServerConfig};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

const CORPUS: &str = "whole_corpus";

fn config(admin_token: Option<&str>) -> ServerConfig {
    ServerConfig { corpus: CORPUS.into(), admin_token: admin_token.map(String::from) }
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path()).unwrap();
    let lines = ["0\tDoc 0\trust is great rust systems programming", "1\tDoc 1\tlearning rust from the very first chapter onwards today", "2\tDoc 2\tgardening"];
    index_lines(&store, CORPUS, &lines, PipelineOptions::default()).unwrap();
    let app = build_app_with_store(Arc::new(store), config(None));

    let (status, json) = call(app.clone(), get("/search?q=rust")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"].as_u64().unwrap(), 0);
    assert_eq!(arr[1]["doc_id"].as_u64().unwrap(), 1);
    assert_eq!(arr[0]["doc_title"], "Doc 0");

    let (status, json) = call(app.clone(), get("/search?q=zebra")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());

    let (status, json) = call(app.clone(), get("/doc/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["doc_length"], 9);

    let (status, _) = call(app.clone(), get("/doc/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = call(app, get("/corpus")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["doc_count"], 3);
    assert_eq!(json["total_length"], 16);
}

#[tokio::test]
async fn batch_indexing_requires_token() {
    let app = build_app_with_store(Arc::new(MemoryStore::new()), config(Some("secret")));
    let body = "1\tFirst\tapples and pears\n2\tSecond\tpears\nnot a record\n";

    let req = Request::post("/index/batch").body(Body::from(body)).unwrap();
    let (status, _) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/index/batch").header("X-ADMIN-TOKEN", "secret").body(Body::from(body)).unwrap();
    let (status, json) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["records"], 2);
    assert_eq!(json["dropped_lines"], 1);
    assert_eq!(json["postings"]["corpus_stats"]["doc_count"], 2);

    let (_, json) = call(app, get("/search?q=apples")).await;
    assert_eq!(json["results"][0]["doc_title"], "First");
}
