//! Embedding index behavior: idempotent upserts, policy isolation,
//! persistence, and model mismatch detection

mod common;

use std::sync::Arc;

use common::{make_chunk, MockEmbedder};
use policy_rag::error::Error;
use policy_rag::index::EmbeddingIndex;

fn open_index(dir: &std::path::Path, model: &str) -> EmbeddingIndex {
    EmbeddingIndex::open(dir, Arc::new(MockEmbedder::with_model(model)), 8).unwrap()
}

#[tokio::test]
async fn upsert_twice_with_same_ids_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let index = open_index(dir.path(), "mock-embedder");

    let chunks = vec![
        make_chunk("Gold Plan", 0, "Medical expenses are covered up to USD 50,000."),
        make_chunk("Gold Plan", 1, "Baggage loss is covered up to USD 3,000."),
    ];

    index.upsert("Gold Plan", &chunks).await.unwrap();
    index.upsert("Gold Plan", &chunks).await.unwrap();

    assert_eq!(index.chunk_count("Gold Plan"), 2);
    let stats = index.list_policies();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].policy_name, "Gold Plan");
    assert_eq!(stats[0].chunk_count, 2);
}

#[tokio::test]
async fn query_scoped_to_one_policy_never_leaks_another() {
    let dir = tempfile::tempdir().unwrap();
    let index = open_index(dir.path(), "mock-embedder");

    index
        .upsert("Gold Plan", &[make_chunk("Gold Plan", 0, "Gold medical coverage in Singapore.")])
        .await
        .unwrap();
    index
        .upsert("Silver Plan", &[make_chunk("Silver Plan", 0, "Silver medical coverage in Singapore.")])
        .await
        .unwrap();

    let scope = vec!["Gold Plan".to_string()];
    let results = index.query("medical coverage Singapore", Some(&scope), 10).await.unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.chunk.policy_name == "Gold Plan"));
}

#[tokio::test]
async fn empty_or_unknown_scope_returns_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let index = open_index(dir.path(), "mock-embedder");

    let results = index.query("anything at all", None, 5).await.unwrap();
    assert!(results.is_empty());

    index
        .upsert("Gold Plan", &[make_chunk("Gold Plan", 0, "Some coverage text.")])
        .await
        .unwrap();
    let scope = vec!["No Such Policy".to_string()];
    let results = index.query("coverage", Some(&scope), 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn results_are_ranked_and_bounded_by_top_k() {
    let dir = tempfile::tempdir().unwrap();
    let index = open_index(dir.path(), "mock-embedder");

    let chunks: Vec<_> = (0..6)
        .map(|i| make_chunk("Gold Plan", i, &format!("Clause {} about trip delay benefits.", i)))
        .collect();
    index.upsert("Gold Plan", &chunks).await.unwrap();

    let results = index.query("trip delay benefits", None, 3).await.unwrap();
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }

    // Deterministic for a fixed index state
    let again = index.query("trip delay benefits", None, 3).await.unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.chunk.id.clone()).collect();
    let ids_again: Vec<_> = again.iter().map(|r| r.chunk.id.clone()).collect();
    assert_eq!(ids, ids_again);
}

#[tokio::test]
async fn collections_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let index = open_index(dir.path(), "mock-embedder");
        index
            .upsert("Gold Plan", &[make_chunk("Gold Plan", 0, "Persistent medical coverage clause.")])
            .await
            .unwrap();
    }

    let reopened = open_index(dir.path(), "mock-embedder");
    assert_eq!(reopened.chunk_count("Gold Plan"), 1);

    let results = reopened.query("medical coverage", None, 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, "gold-plan_0");
}

#[tokio::test]
async fn embedding_model_mismatch_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    {
        let index = open_index(dir.path(), "mock-embedder");
        index
            .upsert("Gold Plan", &[make_chunk("Gold Plan", 0, "Some clause.")])
            .await
            .unwrap();
    }

    let reopened = open_index(dir.path(), "other-embedder");
    let query_err = reopened.query("some clause", None, 5).await.unwrap_err();
    assert!(matches!(query_err, Error::Retrieval(_)));

    let upsert_err = reopened
        .upsert("Gold Plan", &[make_chunk("Gold Plan", 1, "Another clause.")])
        .await
        .unwrap_err();
    assert!(matches!(upsert_err, Error::Indexing(_)));
}

#[tokio::test]
async fn delete_policy_removes_collection() {
    let dir = tempfile::tempdir().unwrap();
    let index = open_index(dir.path(), "mock-embedder");

    index
        .upsert("Gold Plan", &[make_chunk("Gold Plan", 0, "Some clause.")])
        .await
        .unwrap();
    assert!(index.delete_policy("Gold Plan").await.unwrap());
    assert_eq!(index.chunk_count("Gold Plan"), 0);
    assert!(!index.delete_policy("Gold Plan").await.unwrap());

    let reopened = open_index(dir.path(), "mock-embedder");
    assert_eq!(reopened.chunk_count("Gold Plan"), 0);
}
